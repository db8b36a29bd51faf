//! Runtime configuration.

use std::path::PathBuf;

use serde::Deserialize;

/// Environment variable prefix, e.g. `LIBRARY__DATA_DIR`
pub const ENV_PREFIX: &str = "LIBRARY";

/// Settings for the lending CLI
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LibraryConfig {
    /// Directory holding the JSON collection files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// `tracing` filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

/// Current directory, matching where the files were always kept
fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Info-level events from this crate only
fn default_log_filter() -> String {
    "library_lending=info".to_string()
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir(), log_filter: default_log_filter() }
    }
}

impl LibraryConfig {
    /// Load from an optional `library.toml` in the working directory, then
    /// `LIBRARY__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a source exists but cannot be parsed.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("library")
    }

    /// Same as [`LibraryConfig::load`] with an explicit file stem
    ///
    /// # Errors
    ///
    /// Returns an error if a source exists but cannot be parsed.
    pub fn load_from(file_stem: &str) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_any_source() {
        let loaded = LibraryConfig::load_from("definitely/not/a/config/file").unwrap();
        assert_eq!(loaded.log_filter, "library_lending=info");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("library");
        std::fs::write(stem.with_extension("toml"), "data_dir = \"/var/lib/library\"\n").unwrap();

        let loaded = LibraryConfig::load_from(stem.to_str().unwrap()).unwrap();

        assert_eq!(loaded.data_dir, PathBuf::from("/var/lib/library"));
        assert_eq!(loaded.log_filter, default_log_filter());
    }

    #[test]
    fn default_matches_serde_defaults() {
        let config = LibraryConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("."));
        assert_eq!(config.log_filter, default_log_filter());
    }
}
