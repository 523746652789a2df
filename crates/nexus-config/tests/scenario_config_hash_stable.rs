//! Config hash stability.
//!
//! GREEN when:
//! - Loading the same YAML twice yields the same config_hash.
//! - Reordering keys within YAML doesn't change the hash.
//! - Different values produce different hashes.
//! - Overlays override base values and still hash deterministically.

use nexus_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
daemon:
  bind_addr: "127.0.0.1:5000"
audit:
  system_user: "system"
  hash_chain: true
tickets:
  number_prefix: "TKT"
  number_width: 5
"#;

const BASE_YAML_REORDERED: &str = r#"
tickets:
  number_width: 5
  number_prefix: "TKT"
audit:
  hash_chain: true
  system_user: "system"
daemon:
  bind_addr: "127.0.0.1:5000"
"#;

const OVERLAY_YAML: &str = r#"
audit:
  system_user: "ops-bot"
tickets:
  number_width: 6
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
    let original = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let reordered = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();

    assert_eq!(
        original.config_hash, reordered.config_hash,
        "reordering keys in YAML must not change the hash"
    );
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_base_and_keeps_siblings() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    let settings = loaded.settings().unwrap();
    assert_eq!(settings.audit.system_user, "ops-bot");
    assert!(settings.audit.hash_chain, "sibling key must survive the overlay");
    assert_eq!(settings.tickets.format(7), "TKT-000007");
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();

    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}
