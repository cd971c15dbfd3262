//! Config hash stability: same layers give the same hash, key order inside a
//! document does not matter, different values give different hashes.

use tally_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
database:
  url_env: "TALLY_DATABASE_URL"
  max_connections: 10
ledger:
  currency_code: "ARS"
logging:
  filter: "info"
"#;

const BASE_YAML_REORDERED: &str = r#"
logging:
  filter: "info"
ledger:
  currency_code: "ARS"
database:
  max_connections: 10
  url_env: "TALLY_DATABASE_URL"
"#;

const OVERLAY_YAML: &str = r#"
database:
  max_connections: 2
logging:
  filter: "tally_db=debug,info"
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
}

#[test]
fn reordered_keys_produce_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_changes_values_and_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);

    let settings = merged.ledger_settings().unwrap();
    assert_eq!(settings.max_connections, 2);
    assert_eq!(settings.log_filter, "tally_db=debug,info");
    // untouched by the overlay
    assert_eq!(settings.database_url_env, "TALLY_DATABASE_URL");
    assert_eq!(settings.currency_code, "ARS");
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn repo_config_files_load_cleanly() {
    let base = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/tally.yaml");
    let loaded = tally_config::load_layered_yaml(&[base]).unwrap();
    let report =
        tally_config::report_unused_keys(&loaded.config_json, tally_config::UnusedKeyPolicy::Fail)
            .unwrap();
    assert!(report.is_clean());
    assert_eq!(loaded.ledger_settings().unwrap(), tally_config::LedgerSettings::default());
}
