use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::env;

use crate::layering::{canonical_hash, deep_merge, load_layered_yaml};

const ENV_PREFIX: &str = "DRAIN_";
const DEFAULT_ERROR_BACKOFF_SECONDS: u64 = 5;

/// A validated, immutable snapshot of every configuration input the worker
/// loop needs, plus a `config_hash` for log correlation across restarts.
#[derive(Debug, Clone)]
pub struct Settings {
    pub business_center_priorities: HashMap<String, i64>,
    pub batch_size: u32,
    pub lock_timeout_seconds: u32,
    pub poll_interval_seconds: u32,
    pub error_backoff_seconds: u32,
    pub max_concurrent_masters: u32,
    pub output_directory: String,
    pub database_url: String,
    pub config_hash: String,
}

/// Mirror of the YAML/env-merged shape before validation and before
/// `database_url` is spliced in from its own dedicated env var.
#[derive(Debug, Deserialize, Default)]
struct RawSettings {
    #[serde(default)]
    business_center_priorities: HashMap<String, i64>,
    batch_size: Option<u32>,
    lock_timeout_seconds: Option<u32>,
    poll_interval_seconds: Option<u32>,
    error_backoff_seconds: Option<u32>,
    max_concurrent_masters: Option<u32>,
    output_directory: Option<String>,
}

impl Settings {
    /// Load the base YAML layer, an optional environment-named overlay, then
    /// apply `DRAIN_`-prefixed environment overrides, in that precedence
    /// order. `env_name` picks the overlay file, e.g. "production" loads
    /// `config/production.yaml` over `config/base.yaml`.
    pub fn load(config_dir: &std::path::Path, env_name: Option<&str>) -> Result<Settings> {
        let base = config_dir.join("base.yaml");
        let overlay = env_name.map(|name| config_dir.join(format!("{name}.yaml")));
        let paths: Vec<&std::path::Path> = match &overlay {
            Some(p) => vec![base.as_path(), p.as_path()],
            None => vec![base.as_path()],
        };

        let mut merged = load_layered_yaml(&paths)?;
        apply_env_overrides(&mut merged)?;

        let (_, config_hash) = canonical_hash(&merged);

        let raw: RawSettings =
            serde_json::from_value(merged).context("configuration did not match expected shape")?;

        let database_url = env::var("DRAIN_DATABASE_URL")
            .context("DRAIN_DATABASE_URL must be set; database_url is never read from YAML")?;

        let settings = Settings {
            business_center_priorities: raw.business_center_priorities,
            batch_size: raw.batch_size.context("missing key: batch_size")?,
            lock_timeout_seconds: raw
                .lock_timeout_seconds
                .context("missing key: lock_timeout_seconds")?,
            poll_interval_seconds: raw
                .poll_interval_seconds
                .context("missing key: poll_interval_seconds")?,
            error_backoff_seconds: raw
                .error_backoff_seconds
                .unwrap_or(DEFAULT_ERROR_BACKOFF_SECONDS as u32),
            max_concurrent_masters: raw
                .max_concurrent_masters
                .context("missing key: max_concurrent_masters")?,
            output_directory: raw
                .output_directory
                .context("missing key: output_directory")?,
            database_url,
            config_hash,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("invalid configuration: batch_size must be positive");
        }
        if self.lock_timeout_seconds == 0 {
            bail!("invalid configuration: lock_timeout_seconds must be positive");
        }
        if self.poll_interval_seconds == 0 {
            bail!("invalid configuration: poll_interval_seconds must be positive");
        }
        if self.max_concurrent_masters == 0 {
            bail!("invalid configuration: max_concurrent_masters must be positive");
        }
        if (self.error_backoff_seconds as u64) < DEFAULT_ERROR_BACKOFF_SECONDS {
            bail!("invalid configuration: error_backoff_seconds must be at least 5");
        }
        if self.output_directory.trim().is_empty() {
            bail!("invalid configuration: output_directory must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        Settings {
            business_center_priorities: HashMap::new(),
            batch_size: 500,
            lock_timeout_seconds: 300,
            poll_interval_seconds: 5,
            error_backoff_seconds: 5,
            max_concurrent_masters: 4,
            output_directory: "/var/drain/out".to_string(),
            database_url: "postgres://localhost/drain".to_string(),
            config_hash: "deadbeef".to_string(),
        }
    }

    #[test]
    fn valid_settings_pass_validation() {
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut s = valid_settings();
        s.batch_size = 0;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn zero_lock_timeout_is_rejected() {
        let mut s = valid_settings();
        s.lock_timeout_seconds = 0;
        assert!(s.validate().unwrap_err().to_string().contains("lock_timeout_seconds"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let mut s = valid_settings();
        s.poll_interval_seconds = 0;
        assert!(s
            .validate()
            .unwrap_err()
            .to_string()
            .contains("poll_interval_seconds"));
    }

    #[test]
    fn zero_max_concurrent_masters_is_rejected() {
        let mut s = valid_settings();
        s.max_concurrent_masters = 0;
        assert!(s
            .validate()
            .unwrap_err()
            .to_string()
            .contains("max_concurrent_masters"));
    }

    #[test]
    fn empty_output_directory_is_rejected() {
        let mut s = valid_settings();
        s.output_directory = "   ".to_string();
        assert!(s
            .validate()
            .unwrap_err()
            .to_string()
            .contains("output_directory"));
    }

    #[test]
    fn sub_minimum_error_backoff_is_rejected() {
        let mut s = valid_settings();
        s.error_backoff_seconds = 1;
        assert!(s
            .validate()
            .unwrap_err()
            .to_string()
            .contains("error_backoff_seconds"));
    }
}

/// Overlay every `DRAIN_<UPPER_SNAKE_KEY>` environment variable onto the
/// merged config tree, parsing as JSON first so numeric/bool overrides keep
/// their type, falling back to a plain string.
fn apply_env_overrides(merged: &mut Value) -> Result<()> {
    let mut overrides = serde_json::Map::new();
    for (key, val) in env::vars() {
        let Some(field) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        // database_url is sourced exclusively via DRAIN_DATABASE_URL, spliced
        // in directly by the caller — never merged into the YAML tree.
        if field == "DATABASE_URL" {
            continue;
        }
        let field = field.to_lowercase();
        let parsed = serde_json::from_str::<Value>(&val).unwrap_or(Value::String(val));
        overrides.insert(field, parsed);
    }
    if !overrides.is_empty() {
        deep_merge(merged, Value::Object(overrides));
    }
    Ok(())
}
