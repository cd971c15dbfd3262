use anyhow::{Context, Result};
use serde_json::json;
use sqlx::PgPool;
use tally_ledger::{Cents, Customer, LedgerError};
use tracing::info;

use crate::events::{insert_event, LedgerEventType, NewLedgerEvent};
use crate::rows::{customer_from_row, lock_customer, CUSTOMER_COLUMNS};

/// Insert a new customer with a zero balance.
pub async fn insert_customer(pool: &PgPool, name: &str, tax_id: Option<&str>) -> Result<Customer> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::EmptyField { field: "customer name" }.into());
    }
    let tax_id = tax_id.map(str::trim).filter(|t| !t.is_empty());

    let sql = format!(
        "insert into customers (name, tax_id) values ($1, $2) returning {CUSTOMER_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(name)
        .bind(tax_id)
        .fetch_one(pool)
        .await
        .context("insert_customer failed")?;

    let customer = customer_from_row(&row)?;
    info!(customer_id = customer.customer_id, "customer/create");
    Ok(customer)
}

pub async fn fetch_customer(pool: &PgPool, customer_id: i64) -> Result<Customer> {
    let sql = format!("select {CUSTOMER_COLUMNS} from customers where customer_id = $1");
    let row = sqlx::query(&sql)
        .bind(customer_id)
        .fetch_optional(pool)
        .await
        .context("fetch_customer failed")?
        .ok_or(LedgerError::CustomerNotFound { customer_id })?;
    customer_from_row(&row)
}

/// Soft delete. Idempotent; the ledger stays untouched.
pub async fn delete_customer(pool: &PgPool, customer_id: i64) -> Result<Customer> {
    set_deleted(pool, customer_id, true).await
}

/// Undo a soft delete. Idempotent.
pub async fn restore_customer(pool: &PgPool, customer_id: i64) -> Result<Customer> {
    set_deleted(pool, customer_id, false).await
}

async fn set_deleted(pool: &PgPool, customer_id: i64, deleted: bool) -> Result<Customer> {
    let mut tx = pool.begin().await.context("begin tx failed")?;

    let current = lock_customer(&mut tx, customer_id).await?;
    if current.is_deleted() == deleted {
        tx.commit().await.context("commit tx failed")?;
        return Ok(current);
    }

    let sql = format!(
        r#"
        update customers
        set deleted_at = case when $2 then now() else null end
        where customer_id = $1
        returning {CUSTOMER_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(customer_id)
        .bind(deleted)
        .fetch_one(&mut *tx)
        .await
        .context("set_deleted update failed")?;
    let customer = customer_from_row(&row)?;

    let event_type = if deleted {
        LedgerEventType::CustomerDeleted
    } else {
        LedgerEventType::CustomerRestored
    };
    insert_event(
        &mut tx,
        &NewLedgerEvent {
            customer_id,
            entry_id: None,
            event_type,
            delta: Cents::ZERO,
            balance_after: customer.current_balance,
            payload: json!({ "name": customer.name }),
        },
    )
    .await?;

    tx.commit().await.context("commit tx failed")?;
    info!(customer_id, event = event_type.as_str(), "customer/soft-delete");
    Ok(customer)
}
