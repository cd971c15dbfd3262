//! Row decoding and the shared lock helpers.

use anyhow::{Context, Result};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, Row};
use tally_ledger::{
    Cents, Cheque, ChequeStatus, Customer, EntryKind, LedgerEntry, LedgerError, PaymentMethod,
};

pub(crate) const CUSTOMER_COLUMNS: &str = r#"
    customer_id, name, tax_id, current_balance, last_purchase_at, created_at, deleted_at
"#;

/// Entry columns aliased `e`, cheque columns aliased `c` (left join).
pub(crate) const ENTRY_COLUMNS: &str = r#"
    e.entry_id, e.customer_id, e.kind, e.amount, e.balance_snapshot, e.method,
    e.document_number, e.description, e.entry_date, e.created_at, e.deleted_at,
    c.number as cheque_number, c.bank as cheque_bank, c.drawer_name as cheque_drawer,
    c.amount as cheque_amount, c.due_date as cheque_due_date, c.status as cheque_status
"#;

pub(crate) fn customer_from_row(row: &PgRow) -> Result<Customer> {
    Ok(Customer {
        customer_id: row.try_get("customer_id")?,
        name: row.try_get("name")?,
        tax_id: row.try_get("tax_id")?,
        current_balance: Cents::new(row.try_get("current_balance")?),
        last_purchase_at: row.try_get("last_purchase_at")?,
        created_at: row.try_get("created_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

pub(crate) fn entry_from_row(row: &PgRow) -> Result<LedgerEntry> {
    let entry_id: i64 = row.try_get("entry_id")?;

    let cheque = match row.try_get::<Option<String>, _>("cheque_number")? {
        Some(number) => Some(Cheque {
            entry_id,
            number,
            bank: row.try_get("cheque_bank")?,
            drawer_name: row.try_get("cheque_drawer")?,
            amount: Cents::new(row.try_get("cheque_amount")?),
            due_date: row.try_get("cheque_due_date")?,
            status: ChequeStatus::parse(&row.try_get::<String, _>("cheque_status")?)?,
        }),
        None => None,
    };

    Ok(LedgerEntry {
        entry_id,
        customer_id: row.try_get("customer_id")?,
        kind: EntryKind::parse(&row.try_get::<String, _>("kind")?)?,
        amount: Cents::new(row.try_get("amount")?),
        balance_snapshot: Cents::new(row.try_get("balance_snapshot")?),
        method: PaymentMethod::parse(&row.try_get::<String, _>("method")?)?,
        document_number: row.try_get("document_number")?,
        description: row.try_get("description")?,
        entry_date: row.try_get("entry_date")?,
        created_at: row.try_get("created_at")?,
        deleted_at: row.try_get("deleted_at")?,
        cheque,
    })
}

/// Lock the customer row for the rest of the transaction.
///
/// Always the first lock a mutation takes.
pub(crate) async fn lock_customer(conn: &mut PgConnection, customer_id: i64) -> Result<Customer> {
    let sql = format!("select {CUSTOMER_COLUMNS} from customers where customer_id = $1 for update");
    let row = sqlx::query(&sql)
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await
        .context("lock_customer failed")?
        .ok_or(LedgerError::CustomerNotFound { customer_id })?;
    customer_from_row(&row)
}

/// Owner of an entry, read without a lock so the customer lock can be taken
/// first. `customer_id` never changes, so the unlocked read is stable.
pub(crate) async fn entry_owner(conn: &mut PgConnection, entry_id: i64) -> Result<i64> {
    let owner: Option<(i64,)> =
        sqlx::query_as::<_, (i64,)>("select customer_id from ledger_entries where entry_id = $1")
            .bind(entry_id)
            .fetch_optional(&mut *conn)
            .await
            .context("entry_owner failed")?;
    let (customer_id,) = owner.ok_or(LedgerError::EntryNotFound { entry_id })?;
    Ok(customer_id)
}

/// Re-read an entry under the customer lock and lock its row too.
pub(crate) async fn lock_entry(conn: &mut PgConnection, entry_id: i64) -> Result<LedgerEntry> {
    let sql = format!(
        r#"
        select {ENTRY_COLUMNS}
        from ledger_entries e
        left join cheques c on c.entry_id = e.entry_id
        where e.entry_id = $1
        for update of e
        "#
    );
    let row = sqlx::query(&sql)
        .bind(entry_id)
        .fetch_optional(&mut *conn)
        .await
        .context("lock_entry failed")?
        .ok_or(LedgerError::EntryNotFound { entry_id })?;
    entry_from_row(&row)
}
