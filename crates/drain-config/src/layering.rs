use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Load + merge YAML files in order, then canonicalize to JSON and hash.
/// Later files override earlier files via deep-merge. Missing files are
/// skipped silently — the base layer is the only one required to exist.
pub fn load_layered_yaml(paths: &[&Path]) -> Result<Value> {
    let mut merged = Value::Object(Default::default());
    let mut any_loaded = false;

    for p in paths {
        if !p.exists() {
            continue;
        }
        any_loaded = true;
        let s = fs::read_to_string(p).with_context(|| format!("read config: {}", p.display()))?;
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {}", p.display()))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    if !any_loaded {
        anyhow::bail!(
            "no configuration layer found among: {}",
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(merged)
}

/// Deep-merge: objects merge recursively; arrays and scalars from `src`
/// overwrite `dst`.
pub fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

/// A merged configuration tree together with its canonical serialization and
/// hash, for tests that merge raw YAML strings without touching the
/// filesystem.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

/// Merge a sequence of YAML documents given as strings, in precedence order.
/// Exists so layering/hashing behavior can be exercised without writing
/// temp files to disk.
pub fn load_layered_yaml_from_strings(docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());
    for doc in docs {
        let yaml_val: serde_yaml::Value =
            serde_yaml::from_str(doc).context("parse yaml string")?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }
    let (canonical_json, config_hash) = canonical_hash(&merged);
    let config_json: Value =
        serde_json::from_str(&canonical_json).context("canonical json parse failed")?;
    Ok(LoadedConfig {
        config_json,
        canonical_json,
        config_hash,
    })
}

/// Canonicalize JSON by sorting all object keys recursively and emitting
/// compact JSON, then SHA-256 hash the result. Purely a provenance value for
/// log correlation across restarts — never consulted for a runtime branch.
pub fn canonical_hash(v: &Value) -> (String, String) {
    let sorted = sort_keys(v);
    let canonical =
        serde_json::to_string(&sorted).expect("canonicalized config must serialize");
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let hash = hex::encode(hasher.finalize());
    (canonical, hash)
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}
