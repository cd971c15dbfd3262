//! Typed view over the merged config.
//!
//! ```yaml
//! database:
//!   url_env: TALLY_DATABASE_URL   # env var NAME, never the url itself
//!   max_connections: 10
//! ledger:
//!   currency_code: ARS
//! logging:
//!   filter: info
//! ```

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::Value;

pub const DEFAULT_URL_ENV: &str = "TALLY_DATABASE_URL";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_CURRENCY_CODE: &str = "ARS";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSettings {
    /// Name of the env var holding the Postgres url.
    pub database_url_env: String,
    pub max_connections: u32,
    /// ISO 4217 code shown next to amounts. Amounts are always 2-decimal.
    pub currency_code: String,
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    pub log_filter: String,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            database_url_env: DEFAULT_URL_ENV.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            currency_code: DEFAULT_CURRENCY_CODE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl LedgerSettings {
    pub fn from_config_json(config: &Value) -> Result<Self> {
        let defaults = Self::default();

        let database_url_env = read_str(config, "/database/url_env")?
            .unwrap_or(defaults.database_url_env);
        if !is_env_var_name(&database_url_env) {
            bail!(
                "CONFIG_INVALID leaf=/database/url_env: must be an env var name (A-Z, 0-9, _), got {:?}",
                database_url_env
            );
        }

        let max_connections = match config.pointer("/database/max_connections") {
            None | Some(Value::Null) => defaults.max_connections,
            Some(v) => match v.as_u64().and_then(|n| u32::try_from(n).ok()) {
                Some(n) if n > 0 => n,
                _ => bail!(
                    "CONFIG_INVALID leaf=/database/max_connections: expected integer 1..={}, got {}",
                    u32::MAX,
                    v
                ),
            },
        };

        let currency_code = read_str(config, "/ledger/currency_code")?
            .unwrap_or(defaults.currency_code);
        if currency_code.len() != 3 || !currency_code.chars().all(|c| c.is_ascii_uppercase()) {
            bail!(
                "CONFIG_INVALID leaf=/ledger/currency_code: expected 3 uppercase letters, got {:?}",
                currency_code
            );
        }

        let log_filter = read_str(config, "/logging/filter")?.unwrap_or(defaults.log_filter);

        Ok(Self {
            database_url_env,
            max_connections,
            currency_code,
            log_filter,
        })
    }
}

fn read_str(config: &Value, pointer: &str) -> Result<Option<String>> {
    match config.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => bail!("CONFIG_INVALID leaf={pointer}: expected string, got {other}"),
    }
}

fn is_env_var_name(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_config_yields_defaults() {
        let s = LedgerSettings::from_config_json(&json!({})).unwrap();
        assert_eq!(s, LedgerSettings::default());
        assert_eq!(s.database_url_env, "TALLY_DATABASE_URL");
    }

    #[test]
    fn explicit_values_are_read() {
        let s = LedgerSettings::from_config_json(&json!({
            "database": {"url_env": "TALLY_TEST_DB", "max_connections": 3},
            "ledger": {"currency_code": "USD"},
            "logging": {"filter": "tally_db=debug"}
        }))
        .unwrap();
        assert_eq!(s.database_url_env, "TALLY_TEST_DB");
        assert_eq!(s.max_connections, 3);
        assert_eq!(s.currency_code, "USD");
        assert_eq!(s.log_filter, "tally_db=debug");
    }

    #[test]
    fn invalid_values_are_rejected() {
        for bad in [
            json!({"database": {"url_env": "tally-db-url"}}),
            json!({"database": {"max_connections": 0}}),
            json!({"database": {"max_connections": "ten"}}),
            json!({"ledger": {"currency_code": "pesos"}}),
            json!({"logging": {"filter": 5}}),
        ] {
            let err = LedgerSettings::from_config_json(&bad).unwrap_err();
            assert!(err.to_string().starts_with("CONFIG_INVALID"), "{err}");
        }
    }
}
