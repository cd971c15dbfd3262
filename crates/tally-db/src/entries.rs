//! Ledger mutation engine over Postgres.
//!
//! Lock order is always customer row, then entry row. Record, edit and
//! delete therefore serialize per customer, and a record racing an edit of
//! the same customer cannot deadlock.

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use tally_ledger::{
    history_view, plan_amount_change, plan_delete, plan_record, verify_entries, Cents,
    DeletePlan, DescriptionHistory, DriftReport, EntryEdit, EntryKind, EntryView, LedgerEntry,
    LedgerError, NewEntry, PaymentMethod, Propagation,
};
use tracing::{debug, info};

use crate::customers::fetch_customer;
use crate::events::{insert_event, LedgerEventType, NewLedgerEvent};
use crate::rows::{entry_from_row, entry_owner, lock_customer, lock_entry, ENTRY_COLUMNS};

/// Record a purchase or payment as the customer's newest entry.
pub async fn record_entry(pool: &PgPool, req: &NewEntry) -> Result<LedgerEntry> {
    let cheque_due = req.validate()?;

    let mut tx = pool.begin().await.context("begin tx failed")?;

    let customer = lock_customer(&mut tx, req.customer_id).await?;
    if customer.is_deleted() {
        return Err(LedgerError::CustomerDeleted {
            customer_id: req.customer_id,
        }
        .into());
    }
    let plan = plan_record(customer.current_balance, req.kind, req.amount)?;
    let entry_date = req.entry_date.unwrap_or_else(|| Utc::now().date_naive());

    let (entry_id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        insert into ledger_entries (
          customer_id, kind, amount, balance_snapshot, method,
          document_number, description, entry_date
        ) values (
          $1, $2, $3, $4, $5, $6, $7, $8
        )
        returning entry_id
        "#,
    )
    .bind(req.customer_id)
    .bind(req.kind.as_str())
    .bind(plan.net_amount.raw())
    .bind(plan.new_balance.raw())
    .bind(req.method.as_str())
    .bind(&req.document_number)
    .bind(&req.description)
    .bind(entry_date)
    .fetch_one(&mut *tx)
    .await
    .context("insert ledger entry failed")?;

    if let (Some(details), Some(due_date)) = (&req.cheque, cheque_due) {
        sqlx::query(
            r#"
            insert into cheques (entry_id, number, bank, drawer_name, amount, due_date, status)
            values ($1, $2, $3, $4, $5, $6, 'pending')
            "#,
        )
        .bind(entry_id)
        .bind(details.number.trim())
        .bind(details.bank.trim())
        .bind(details.drawer_name.trim())
        .bind(details.amount.unwrap_or(req.amount).raw())
        .bind(due_date)
        .execute(&mut *tx)
        .await
        .context("insert cheque failed")?;
    }

    sqlx::query(
        r#"
        update customers
        set current_balance = $2,
            last_purchase_at = case when $3 then now() else last_purchase_at end
        where customer_id = $1
        "#,
    )
    .bind(req.customer_id)
    .bind(plan.new_balance.raw())
    .bind(req.kind == EntryKind::Purchase)
    .execute(&mut *tx)
    .await
    .context("update customer balance failed")?;

    insert_event(
        &mut tx,
        &NewLedgerEvent {
            customer_id: req.customer_id,
            entry_id: Some(entry_id),
            event_type: LedgerEventType::EntryRecorded,
            delta: plan.net_amount,
            balance_after: plan.new_balance,
            payload: json!({
                "kind": req.kind.as_str(),
                "method": req.method.as_str(),
                "document_number": req.document_number,
            }),
        },
    )
    .await?;

    let entry = lock_entry(&mut tx, entry_id).await?;
    tx.commit().await.context("commit tx failed")?;

    info!(
        customer_id = req.customer_id,
        entry_id,
        kind = req.kind.as_str(),
        amount = %plan.net_amount,
        balance = %plan.new_balance,
        "ledger/record"
    );
    Ok(entry)
}

/// Edit a live entry. An amount change keeps the entry's kind and shifts
/// the customer balance and every later live snapshot by the same delta.
pub async fn edit_entry(pool: &PgPool, entry_id: i64, edit: &EntryEdit) -> Result<LedgerEntry> {
    edit.validate()?;

    let mut tx = pool.begin().await.context("begin tx failed")?;

    let customer_id = entry_owner(&mut tx, entry_id).await?;
    lock_customer(&mut tx, customer_id).await?;
    let entry = lock_entry(&mut tx, entry_id).await?;

    if entry.is_deleted() {
        return Err(LedgerError::EntryDeleted { entry_id }.into());
    }
    if edit.method == Some(PaymentMethod::Cheque) && entry.cheque.is_none() {
        return Err(LedgerError::ChequeMethodWithoutCheque { entry_id }.into());
    }
    let change = edit
        .amount
        .map(|abs| plan_amount_change(entry.kind, entry.amount, entry.balance_snapshot, abs))
        .transpose()?;
    let document = edit.document_update();

    sqlx::query(
        r#"
        update ledger_entries
        set description = coalesce($2, description),
            entry_date = coalesce($3, entry_date),
            method = coalesce($4, method),
            document_number = case when $5 then $6 else document_number end,
            amount = coalesce($7, amount),
            balance_snapshot = coalesce($8, balance_snapshot)
        where entry_id = $1
        "#,
    )
    .bind(entry_id)
    .bind(&edit.description)
    .bind(edit.entry_date)
    .bind(edit.method.map(|m| m.as_str()))
    .bind(document.is_some())
    .bind(document.flatten())
    .bind(change.map(|c| c.new_amount.raw()))
    .bind(change.map(|c| c.new_snapshot.raw()))
    .execute(&mut *tx)
    .await
    .context("update ledger entry failed")?;

    let mut delta = Cents::ZERO;
    if let Some(change) = change {
        delta = change.delta;
        // a cheque that mirrored the entry amount keeps mirroring it
        sqlx::query("update cheques set amount = $2 where entry_id = $1 and amount = $3")
            .bind(entry_id)
            .bind(change.new_amount.abs().raw())
            .bind(entry.amount.abs().raw())
            .execute(&mut *tx)
            .await
            .context("update cheque amount failed")?;
    }

    let balance_after = match change.and_then(|c| c.propagation(entry_id)) {
        Some(p) => propagate_delta(&mut tx, customer_id, p).await?,
        None => lock_customer(&mut tx, customer_id).await?.current_balance,
    };

    insert_event(
        &mut tx,
        &NewLedgerEvent {
            customer_id,
            entry_id: Some(entry_id),
            event_type: LedgerEventType::EntryEdited,
            delta,
            balance_after,
            payload: json!({
                "description": edit.description,
                "entry_date": edit.entry_date,
                "method": edit.method.map(|m| m.as_str()),
                "document_number": edit.document_number,
                "old_amount": entry.amount,
                "new_amount": change.map(|c| c.new_amount),
            }),
        },
    )
    .await?;

    let updated = lock_entry(&mut tx, entry_id).await?;
    tx.commit().await.context("commit tx failed")?;

    info!(customer_id, entry_id, delta = %delta, balance = %balance_after, "ledger/edit");
    Ok(updated)
}

/// Soft delete an entry and reverse its contribution. A second delete of
/// the same entry succeeds without writing anything.
pub async fn delete_entry(pool: &PgPool, entry_id: i64) -> Result<DeletePlan> {
    let mut tx = pool.begin().await.context("begin tx failed")?;

    let customer_id = entry_owner(&mut tx, entry_id).await?;
    lock_customer(&mut tx, customer_id).await?;
    let entry = lock_entry(&mut tx, entry_id).await?;

    let plan = plan_delete(entry.amount, entry.is_deleted());
    let reversal_delta = match plan {
        DeletePlan::AlreadyDeleted => {
            tx.commit().await.context("commit tx failed")?;
            debug!(customer_id, entry_id, "ledger/delete already deleted");
            return Ok(plan);
        }
        DeletePlan::Reverse { reversal_delta } => reversal_delta,
    };

    sqlx::query("update ledger_entries set deleted_at = now() where entry_id = $1")
        .bind(entry_id)
        .execute(&mut *tx)
        .await
        .context("soft delete ledger entry failed")?;

    let balance_after = match Propagation::after(entry_id, reversal_delta) {
        Some(p) => propagate_delta(&mut tx, customer_id, p).await?,
        None => lock_customer(&mut tx, customer_id).await?.current_balance,
    };

    insert_event(
        &mut tx,
        &NewLedgerEvent {
            customer_id,
            entry_id: Some(entry_id),
            event_type: LedgerEventType::EntryDeleted,
            delta: reversal_delta,
            balance_after,
            payload: json!({ "kind": entry.kind.as_str(), "amount": entry.amount }),
        },
    )
    .await?;

    tx.commit().await.context("commit tx failed")?;

    info!(
        customer_id,
        entry_id,
        delta = %reversal_delta,
        balance = %balance_after,
        "ledger/delete"
    );
    Ok(plan)
}

/// The single propagation routine behind edit and delete: every later live
/// snapshot of the customer and the customer aggregate absorb `p.delta`.
/// Returns the new customer balance. Caller holds the customer lock.
async fn propagate_delta(conn: &mut PgConnection, customer_id: i64, p: Propagation) -> Result<Cents> {
    let shifted = sqlx::query(
        r#"
        update ledger_entries
        set balance_snapshot = balance_snapshot + $3
        where customer_id = $1
          and entry_id > $2
          and deleted_at is null
        "#,
    )
    .bind(customer_id)
    .bind(p.after_entry_id)
    .bind(p.delta.raw())
    .execute(&mut *conn)
    .await
    .map_err(|e| out_of_range_or(e, &p, "propagate snapshots failed"))?
    .rows_affected();

    let (balance,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        update customers
        set current_balance = current_balance + $2
        where customer_id = $1
        returning current_balance
        "#,
    )
    .bind(customer_id)
    .bind(p.delta.raw())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| out_of_range_or(e, &p, "propagate customer balance failed"))?;

    debug!(customer_id, after_entry_id = p.after_entry_id, delta = %p.delta, shifted, "ledger/propagate");
    Ok(Cents::new(balance))
}

// SQLSTATE 22003 numeric_value_out_of_range: a shifted bigint left the i64
// range. Surfaced as the same validation error the in-memory engine returns.
fn out_of_range_or(err: sqlx::Error, p: &Propagation, context: &'static str) -> anyhow::Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("22003") {
            return LedgerError::AmountOutOfRange { amount: p.delta }.into();
        }
    }
    anyhow::Error::new(err).context(context)
}

/// Any entry by id, including soft-deleted ones.
pub async fn fetch_entry(pool: &PgPool, entry_id: i64) -> Result<LedgerEntry> {
    let sql = format!(
        r#"
        select {ENTRY_COLUMNS}
        from ledger_entries e
        left join cheques c on c.entry_id = e.entry_id
        where e.entry_id = $1
        "#
    );
    let row = sqlx::query(&sql)
        .bind(entry_id)
        .fetch_optional(pool)
        .await
        .context("fetch_entry failed")?
        .ok_or(LedgerError::EntryNotFound { entry_id })?;
    entry_from_row(&row)
}

/// Live entries of a customer, newest first, cheques attached.
pub async fn list_entries(pool: &PgPool, customer_id: i64) -> Result<Vec<LedgerEntry>> {
    fetch_customer(pool, customer_id).await?;
    load_entries(pool, customer_id, false).await
}

/// Statement rows with derived debit and credit columns.
pub async fn account_history(pool: &PgPool, customer_id: i64) -> Result<Vec<EntryView>> {
    let entries = list_entries(pool, customer_id).await?;
    Ok(history_view(&entries))
}

/// Recompute snapshots and the aggregate from amounts and report drift.
pub async fn verify_customer(pool: &PgPool, customer_id: i64) -> Result<DriftReport> {
    let customer = fetch_customer(pool, customer_id).await?;
    let entries = load_entries(pool, customer_id, true).await?;
    Ok(verify_entries(customer_id, customer.current_balance, &entries))
}

/// Seed an autocomplete history from descriptions of live entries.
pub async fn load_description_history(pool: &PgPool) -> Result<DescriptionHistory> {
    let rows: Vec<(String,)> = sqlx::query_as::<_, (String,)>(
        "select distinct description from ledger_entries where deleted_at is null",
    )
    .fetch_all(pool)
    .await
    .context("load_description_history failed")?;

    let mut history = DescriptionHistory::new();
    history.merge(rows.iter().map(|(d,)| d.as_str()));
    Ok(history)
}

async fn load_entries(pool: &PgPool, customer_id: i64, include_deleted: bool) -> Result<Vec<LedgerEntry>> {
    let sql = format!(
        r#"
        select {ENTRY_COLUMNS}
        from ledger_entries e
        left join cheques c on c.entry_id = e.entry_id
        where e.customer_id = $1
          and ($2 or e.deleted_at is null)
        order by e.entry_id desc
        "#
    );
    let rows = sqlx::query(&sql)
        .bind(customer_id)
        .bind(include_deleted)
        .fetch_all(pool)
        .await
        .context("load_entries failed")?;

    rows.iter().map(entry_from_row).collect()
}
