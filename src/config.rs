//! Engine configuration, loaded from a JSON file.
//!
//! Every field has a default, so an empty object (or no file at all) yields a
//! working configuration.
use crate::clause::id::DEFAULT_MAX_TOP_SEGMENT;
use crate::compute::Limits;
use crate::display::trace::{DEFAULT_DIGITS, MAX_DISPLAY_DIGITS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse config '{path}': {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub limits: Limits,
    pub max_top_segment: u32,
    pub display_digits: u32,
    /// How long a scope's compiled custom formulas are reused, in seconds.
    pub cache_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            max_top_segment: DEFAULT_MAX_TOP_SEGMENT,
            display_digits: DEFAULT_DIGITS,
            cache_ttl_secs: 300,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((name, value, max)) = self.limits.out_of_range() {
            return Err(ConfigError::Invalid(format!(
                "limits.{} must be between 1 and {}, got {}",
                name, max, value
            )));
        }
        if self.max_top_segment == 0 {
            return Err(ConfigError::Invalid("maxTopSegment must be at least 1".into()));
        }
        if self.display_digits > MAX_DISPLAY_DIGITS {
            return Err(ConfigError::Invalid(format!(
                "displayDigits must be at most {}, got {}",
                MAX_DISPLAY_DIGITS, self.display_digits
            )));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write(r#"{ "maxTopSegment": 99, "limits": { "maxSteps": 500 } }"#);
        let config = EngineConfig::load(file.path()).unwrap();

        assert_eq!(config.max_top_segment, 99);
        assert_eq!(config.limits.max_steps, 500);
        assert_eq!(config.limits.max_depth, Limits::default().max_depth);
        assert_eq!(config.display_digits, DEFAULT_DIGITS);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_load_errors() {
        let missing = std::env::temp_dir().join("clausecalc-config-that-does-not-exist.json");
        assert!(matches!(EngineConfig::load(&missing), Err(ConfigError::Io { .. })));

        let garbage = write("{ maxTopSegment: ");
        assert!(matches!(EngineConfig::load(garbage.path()), Err(ConfigError::Parse { .. })));

        let zero = write(r#"{ "limits": { "maxSteps": 0 } }"#);
        assert!(matches!(EngineConfig::load(zero.path()), Err(ConfigError::Invalid(_))));

        let digits = write(r#"{ "displayDigits": 40 }"#);
        assert!(matches!(EngineConfig::load(digits.path()), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_limits_are_capped() {
        let mut config = EngineConfig::default();
        assert!(config.validate().is_ok());

        config.limits.max_nodes = 10_000_000;
        match config.validate() {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("limits.maxNodes")),
            other => panic!("unexpected {:?}", other),
        }

        config.limits = Limits::CEILING;
        assert!(config.validate().is_ok());
        config.limits.max_depth = Limits::CEILING.max_depth + 1;
        assert!(config.validate().is_err());
    }
}
