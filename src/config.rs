//! Matching tolerances.
//!
//! [`MatchConfig`] can be loaded from `config/config.toml` (section
//! `[index_matching]`) or from `PG_INDEXDEF__INDEX_MATCHING__*` environment
//! variables using `MatchConfig::load()`.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

const CONFIG_FILE: &str = "config/config.toml";
const ENV_PREFIX: &str = "PG_INDEXDEF";
const SECTION: &str = "index_matching";

/// How forgiving index matching is about differences PostgreSQL introduces
/// when it echoes a definition back
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MatchConfig {
    /// Drop `::type` casts before comparing expressions and predicates
    #[serde(default = "default_true")]
    pub strip_casts: bool,
    /// Compare tablespaces when the desired definition names one
    #[serde(default = "default_true")]
    pub compare_table_space: bool,
    /// Require the observed index to carry the desired name
    #[serde(default = "default_true")]
    pub compare_names: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            strip_casts: default_true(),
            compare_table_space: default_true(),
            compare_names: default_true(),
        }
    }
}

impl MatchConfig {
    /// Load from `config/config.toml`, falling back to env vars.
    ///
    /// A missing `[index_matching]` section yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(environment());

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if Path::new(CONFIG_FILE).exists() {
                    log::warn!(
                        "Failed to load {}, falling back to environment: {}",
                        CONFIG_FILE,
                        err
                    );
                }
                Config::builder()
                    .add_source(environment())
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {}, then env-only error: {}",
                            err, env_err
                        ))
                    })?
            }
        };

        Self::from_settings(&settings)
    }

    /// Load from an explicit file, with environment overrides on top.
    ///
    /// Unlike [`MatchConfig::load`], the file must exist and parse.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        Self::from_settings(&settings)
    }

    fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<MatchConfig>(SECTION) {
            Ok(cfg) => Ok(cfg),
            Err(ConfigError::NotFound(_)) => {
                log::debug!("No [{}] configuration found, using defaults", SECTION);
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Message(format!(
                "Index matching configuration is invalid: {}",
                e
            ))),
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_tolerant() {
        let cfg = MatchConfig::default();
        assert!(cfg.strip_casts);
        assert!(cfg.compare_table_space);
        assert!(cfg.compare_names);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let cfg: MatchConfig = serde_json::from_str(r#"{ "compare_names": false }"#).unwrap();
        assert!(!cfg.compare_names);
        assert!(cfg.strip_casts);
        assert!(cfg.compare_table_space);
    }
}
