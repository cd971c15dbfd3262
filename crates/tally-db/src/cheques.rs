use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::json;
use sqlx::{PgPool, Row};
use tally_ledger::{Cents, Cheque, ChequeDue, ChequeStatus, LedgerError};
use tracing::info;

use crate::events::{insert_event, LedgerEventType, NewLedgerEvent};
use crate::rows::{entry_owner, lock_customer, lock_entry};

/// Move a cheque through its lifecycle. Never touches balances.
pub async fn set_cheque_status(pool: &PgPool, entry_id: i64, status: ChequeStatus) -> Result<Cheque> {
    let mut tx = pool.begin().await.context("begin tx failed")?;

    let customer_id = entry_owner(&mut tx, entry_id).await?;
    let customer = lock_customer(&mut tx, customer_id).await?;
    let entry = lock_entry(&mut tx, entry_id).await?;

    if entry.is_deleted() {
        return Err(LedgerError::EntryDeleted { entry_id }.into());
    }
    let mut cheque = entry.cheque.ok_or(LedgerError::ChequeNotFound { entry_id })?;
    let from = cheque.status;
    cheque.status = from.transition(entry_id, status)?;

    sqlx::query("update cheques set status = $2 where entry_id = $1")
        .bind(entry_id)
        .bind(cheque.status.as_str())
        .execute(&mut *tx)
        .await
        .context("update cheque status failed")?;

    insert_event(
        &mut tx,
        &NewLedgerEvent {
            customer_id,
            entry_id: Some(entry_id),
            event_type: LedgerEventType::ChequeStatusChanged,
            delta: Cents::ZERO,
            balance_after: customer.current_balance,
            payload: json!({ "from": from.as_str(), "to": cheque.status.as_str() }),
        },
    )
    .await?;

    tx.commit().await.context("commit tx failed")?;

    info!(
        customer_id,
        entry_id,
        from = from.as_str(),
        to = cheque.status.as_str(),
        "cheque/status"
    );
    Ok(cheque)
}

/// Pending cheques of live entries due on or before `on_or_before`,
/// ordered by due date then entry id.
pub async fn cheques_due(pool: &PgPool, on_or_before: NaiveDate) -> Result<Vec<ChequeDue>> {
    let rows = sqlx::query(
        r#"
        select e.customer_id, c.entry_id, c.number, c.bank, c.drawer_name,
               c.amount, c.due_date, c.status
        from cheques c
        join ledger_entries e on e.entry_id = c.entry_id
        where c.status = 'pending'
          and c.due_date <= $1
          and e.deleted_at is null
        order by c.due_date asc, c.entry_id asc
        "#,
    )
    .bind(on_or_before)
    .fetch_all(pool)
    .await
    .context("cheques_due failed")?;

    rows.iter()
        .map(|row| {
            Ok(ChequeDue {
                customer_id: row.try_get("customer_id")?,
                cheque: Cheque {
                    entry_id: row.try_get("entry_id")?,
                    number: row.try_get("number")?,
                    bank: row.try_get("bank")?,
                    drawer_name: row.try_get("drawer_name")?,
                    amount: Cents::new(row.try_get("amount")?),
                    due_date: row.try_get("due_date")?,
                    status: ChequeStatus::parse(&row.try_get::<String, _>("status")?)?,
                },
            })
        })
        .collect()
}
