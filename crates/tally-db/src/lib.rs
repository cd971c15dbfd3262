//! tally-db
//!
//! Postgres-backed ledger engine. Every mutation is one transaction that
//! locks the customer row first (`select ... for update`), plans through
//! `tally_ledger::mutation` and writes entry, propagation, aggregate and
//! event rows before committing. Dropping the transaction rolls back.
//!
//! Domain failures travel as `anyhow::Error` wrapping a
//! [`tally_ledger::LedgerError`]; use [`error_kind`] to classify them.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tally_ledger::{ErrorKind, LedgerError};

mod cheques;
mod customers;
mod entries;
mod events;
mod rows;

pub use cheques::{cheques_due, set_cheque_status};
pub use customers::{delete_customer, fetch_customer, insert_customer, restore_customer};
pub use entries::{
    account_history, delete_entry, edit_entry, fetch_entry, list_entries, load_description_history,
    record_entry, verify_customer,
};
pub use events::{list_events, LedgerEventRow, LedgerEventType};

pub const ENV_DB_URL: &str = "TALLY_DATABASE_URL";

/// Connect using the url stored in env var `var`.
pub async fn connect_from_env_var(var: &str, max_connections: u32) -> Result<PgPool> {
    let url = std::env::var(var).with_context(|| format!("missing env var {var}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='ledger_entries'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_ledger_tables: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_ledger_tables: bool,
}

/// Recover the domain class of an error returned by this crate.
///
/// `None` means a storage or infrastructure failure.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain()
        .find_map(|e| e.downcast_ref::<LedgerError>())
        .map(LedgerError::kind)
}
