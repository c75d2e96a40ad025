//! Config hash stability: same input -> same hash, reordered keys -> same
//! hash, different values -> different hash.

use drain_config::load_layered_yaml_from_strings;

const BASE_YAML: &str = r#"
batch_size: 500
lock_timeout_seconds: 300
poll_interval_seconds: 5
max_concurrent_masters: 4
output_directory: "/var/drain/out"
business_center_priorities:
  NYC: 1
  LDN: 2
"#;

const BASE_YAML_REORDERED: &str = r#"
business_center_priorities:
  LDN: 2
  NYC: 1
output_directory: "/var/drain/out"
max_concurrent_masters: 4
poll_interval_seconds: 5
lock_timeout_seconds: 300
batch_size: 500
"#;

const OVERLAY_YAML: &str = r#"
max_concurrent_masters: 8
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

    assert_eq!(original.config_hash, reordered.config_hash);
}

#[test]
fn different_values_produce_different_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();

    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_overrides_base_value() {
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    let max_concurrent = merged
        .config_json
        .pointer("/max_concurrent_masters")
        .and_then(|v| v.as_u64())
        .unwrap();
    assert_eq!(max_concurrent, 8);

    // untouched key survives the overlay
    let batch_size = merged
        .config_json
        .pointer("/batch_size")
        .and_then(|v| v.as_u64())
        .unwrap();
    assert_eq!(batch_size, 500);
}

#[test]
fn hash_is_64_hex_chars() {
    let loaded = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(loaded.config_hash.len(), 64);
    assert!(loaded.config_hash.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn empty_config_produces_stable_hash() {
    let a = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let b = load_layered_yaml_from_strings(&["{}"]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}
