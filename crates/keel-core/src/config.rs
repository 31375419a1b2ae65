//! Runtime configuration.
//!
//! Loaded from TOML. Every section and key is optional:
//!
//! ```toml
//! [unit_of_work]
//! prune_on_pause = true
//! verify_loaded_versions = false
//!
//! [query]
//! default_max_results = 500
//! ```

use serde::{Deserialize, Serialize};
use std::{fs, io, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

///
/// RuntimeConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub unit_of_work: UnitOfWorkConfig,
    pub query: QueryConfig,
}

impl RuntimeConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&text)
    }
}

///
/// UnitOfWorkConfig
///
/// Behaviour of every unit of work opened by a factory, unless the
/// usecase supplies its own.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitOfWorkConfig {
    /// Drop cached, unmodified entities when the unit of work is paused.
    pub prune_on_pause: bool,

    /// Version-check every state loaded with a version at completion,
    /// not only the ones being written.
    pub verify_loaded_versions: bool,
}

impl Default for UnitOfWorkConfig {
    fn default() -> Self {
        Self {
            prune_on_pause: false,
            verify_loaded_versions: true,
        }
    }
}

///
/// QueryConfig
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    /// Applied when a query sets no explicit `max_results`.
    pub default_max_results: Option<usize>,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RuntimeConfig::from_toml_str("").unwrap();

        assert_eq!(config, RuntimeConfig::default());
        assert!(config.unit_of_work.verify_loaded_versions);
        assert!(!config.unit_of_work.prune_on_pause);
        assert_eq!(config.query.default_max_results, None);
    }

    #[test]
    fn sections_override_individual_keys() {
        let config = RuntimeConfig::from_toml_str(
            r"
            [unit_of_work]
            prune_on_pause = true

            [query]
            default_max_results = 25
            ",
        )
        .unwrap();

        assert!(config.unit_of_work.prune_on_pause);
        assert!(config.unit_of_work.verify_loaded_versions);
        assert_eq!(config.query.default_max_results, Some(25));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = RuntimeConfig::from_toml_str("[unit_of_work]\nprune = true\n").unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = RuntimeConfig::load("/definitely/not/here/keel.toml").unwrap_err();

        let ConfigError::Io { path, .. } = err else {
            panic!("expected io error");
        };
        assert!(path.ends_with("keel.toml"));
    }
}
