//! Configuration management for the CLI

use anyhow::{Context, Result};
use scrubber_lib::expiry::DEFAULT_EXPIRY_DAYS;
use scrubber_lib::{ClassifierConfig, Provider};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable prefix for configuration keys
const ENV_PREFIX: &str = "SCRUBBER";

/// Tuning knobs layered from an optional JSON file and `SCRUBBER_*` variables
#[derive(Debug, Clone, Deserialize)]
pub struct ScrubberConfig {
    /// Days added when a resource is first marked
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,

    /// Days added by `extend` when none are given on the command line
    #[serde(default = "default_extend_days")]
    pub extend_days: i64,

    /// Inventory snapshot read and written by the store
    #[serde(default = "default_inventory_path")]
    pub inventory_path: PathBuf,

    /// Name substrings appended to the provider's ignore-list
    #[serde(default)]
    pub extra_ignore: Vec<String>,

    /// Override for the provider's marker key
    #[serde(default)]
    pub marker_key: Option<String>,
}

fn default_expiry_days() -> i64 {
    DEFAULT_EXPIRY_DAYS
}

fn default_extend_days() -> i64 {
    DEFAULT_EXPIRY_DAYS
}

fn default_inventory_path() -> PathBuf {
    PathBuf::from("inventory.json")
}

impl Default for ScrubberConfig {
    fn default() -> Self {
        Self {
            expiry_days: default_expiry_days(),
            extend_days: default_extend_days(),
            inventory_path: default_inventory_path(),
            extra_ignore: Vec::new(),
            marker_key: None,
        }
    }
}

impl ScrubberConfig {
    /// Load configuration from an optional file and the environment.
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(default_path) = default_config_path() {
                    builder = builder.add_source(config::File::from(default_path).required(false));
                }
            }
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("extra_ignore"),
            )
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Provider preset with this configuration's overrides applied
    pub fn classifier_config(&self, provider: Provider) -> ClassifierConfig {
        let classifier = ClassifierConfig::for_provider(provider)
            .with_extra_ignores(self.extra_ignore.iter().cloned());

        match &self.marker_key {
            Some(key) => classifier.with_marker_key(key.clone()),
            None => classifier,
        }
    }
}

/// Default configuration file path
fn default_config_path() -> Option<PathBuf> {
    let home = dirs_next::home_dir()?;
    Some(home.join(".config").join("scrubber").join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "expiry_days": 7, "extra_ignore": ["sandbox"], "marker_key": "expires-on" }"#,
        )
        .unwrap();

        let config = ScrubberConfig::load(Some(&path)).unwrap();
        assert_eq!(config.expiry_days, 7);
        assert_eq!(config.extend_days, DEFAULT_EXPIRY_DAYS);
        assert_eq!(config.inventory_path, PathBuf::from("inventory.json"));

        let classifier = config.classifier_config(Provider::Azure);
        assert_eq!(classifier.marker_key, "expires-on");
        assert!(classifier.ignore_list.iter().any(|e| e == "sandbox"));
        assert!(classifier.ignore_list.iter().any(|e| e == "NetworkWatcherRG"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ScrubberConfig::load(Some(&temp_dir.path().join("nope.json"))).is_err());
    }

    #[test]
    fn test_default_keeps_provider_marker_key() {
        let config = ScrubberConfig::default();
        assert_eq!(config.classifier_config(Provider::Aws).marker_key, "expiryTag");
        assert_eq!(config.classifier_config(Provider::Gcp).marker_key, "expirytag");
    }
}
