//! Layered YAML + environment-variable configuration loading: base file,
//! optional named overlay, then `DRAIN_`-prefixed process environment, merged
//! in that order of precedence and hashed for restart-to-restart provenance.

mod layering;
mod settings;

pub use layering::{
    canonical_hash, deep_merge, load_layered_yaml, load_layered_yaml_from_strings, LoadedConfig,
};
pub use settings::Settings;
