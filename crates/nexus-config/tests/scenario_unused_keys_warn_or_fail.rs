//! Unused-key guard.
//!
//! 1) Unused keys are reported in WARN mode without error.
//! 2) Unused keys fail in FAIL mode.
//! 3) Keys under consumed prefixes are never flagged.

use nexus_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

const YAML_WITH_TYPO: &str = r#"
audit:
  system_user: "system"
  hash_chian: false
legacy:
  port: 5000
"#;

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML_WITH_TYPO]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn).unwrap();

    assert!(!report.is_clean());
    assert_eq!(
        report.unused_leaf_pointers,
        vec!["/audit/hash_chian".to_string(), "/legacy/port".to_string()],
        "unused pointers must be sorted and exact"
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML_WITH_TYPO]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(format!("{err:?}").contains("CONFIG_UNUSED_KEYS"));
}

#[test]
fn consumed_prefix_covers_nested_seed_entries() {
    let yaml = r#"
seed:
  tools:
    - id: "tool-1"
      name: "Diagnostic Scanner A"
      master_id: "master-1"
daemon:
  cors_origins: ["http://localhost:5173"]
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean(), "{:?}", report.unused_leaf_pointers);
}
