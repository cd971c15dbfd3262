//! Command handler modules for the `tally` binary.
//!
//! Input is parsed and validated before any database connection is opened,
//! so malformed arguments fail fast with the validation exit code.

pub mod cheque;
pub mod customer;
pub mod entry;

use anyhow::Result;
use chrono::NaiveDate;
use sqlx::PgPool;
use tally_config::LedgerSettings;
use tally_ledger::{Cents, LedgerError};

pub async fn connect(settings: &LedgerSettings) -> Result<PgPool> {
    tally_db::connect_from_env_var(&settings.database_url_env, settings.max_connections).await
}

/// Decimal text to exact cents; more than two fractional digits is an error.
pub fn parse_amount(raw: &str) -> Result<Cents> {
    Ok(Cents::parse_decimal(raw).map_err(LedgerError::from)?)
}

/// `YYYY-MM-DD`.
pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        LedgerError::UnknownValue {
            field,
            value: raw.to_string(),
        }
        .into()
    })
}

pub fn opt_str(v: &Option<String>) -> &str {
    v.as_deref().unwrap_or("")
}
