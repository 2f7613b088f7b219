//! Engine configuration structures.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{DEFAULT_BUCKET_COUNT, DEFAULT_CHARSET, DEFAULT_COLLATION, MAX_SAMPLE_COUNT};
use crate::error::{QuarryError, QuarryResult};

/// Main engine configuration.
///
/// # Example
///
/// ```rust
/// use quarry_common::config::QuarryConfig;
///
/// let config = QuarryConfig::default();
/// assert_eq!(config.analyze.max_sample_count, 10_000);
/// assert_eq!(config.analyze.bucket_count, 256);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarryConfig {
    /// Identifier of this engine instance, reported in logs.
    #[serde(default = "default_node_id")]
    pub node_id: u64,

    /// `ANALYZE TABLE` parameters.
    #[serde(default)]
    pub analyze: AnalyzeConfig,

    /// Defaults applied to new sessions and databases.
    #[serde(default)]
    pub session: SessionDefaults,
}

fn default_node_id() -> u64 {
    1
}

impl Default for QuarryConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            analyze: AnalyzeConfig::default(),
            session: SessionDefaults::default(),
        }
    }
}

impl QuarryConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> QuarryResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| QuarryError::InvalidConfig {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> QuarryResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> QuarryResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| QuarryError::InvalidConfig {
            message: e.to_string(),
        })?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> QuarryResult<()> {
        self.analyze.validate()?;
        if self.session.default_charset.is_empty() {
            return Err(QuarryError::InvalidConfig {
                message: "session.default_charset must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Parameters for statistics collection.
///
/// Both values are engine-wide; an `ANALYZE TABLE` statement cannot
/// override them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeConfig {
    /// Capacity of the row sample reservoir.
    /// Default: 10000
    #[serde(default = "default_max_sample_count")]
    pub max_sample_count: usize,

    /// Number of histogram buckets per column.
    /// Default: 256
    #[serde(default = "default_bucket_count")]
    pub bucket_count: usize,
}

fn default_max_sample_count() -> usize {
    MAX_SAMPLE_COUNT
}

fn default_bucket_count() -> usize {
    DEFAULT_BUCKET_COUNT
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            max_sample_count: default_max_sample_count(),
            bucket_count: default_bucket_count(),
        }
    }
}

impl AnalyzeConfig {
    /// Validates the analyze parameters.
    pub fn validate(&self) -> QuarryResult<()> {
        if self.max_sample_count == 0 {
            return Err(QuarryError::InvalidConfig {
                message: "analyze.max_sample_count must be greater than 0".to_string(),
            });
        }
        if self.bucket_count == 0 {
            return Err(QuarryError::InvalidConfig {
                message: "analyze.bucket_count must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Session-level defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDefaults {
    /// Character set for databases created without one.
    #[serde(default = "default_charset")]
    pub default_charset: String,

    /// Collation for databases created without one.
    #[serde(default = "default_collation")]
    pub default_collation: String,
}

fn default_charset() -> String {
    DEFAULT_CHARSET.to_string()
}

fn default_collation() -> String {
    DEFAULT_COLLATION.to_string()
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            default_charset: default_charset(),
            default_collation: default_collation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = QuarryConfig::default();
        assert_eq!(config.node_id, 1);
        assert_eq!(config.analyze.max_sample_count, 10_000);
        assert_eq!(config.analyze.bucket_count, 256);
        assert_eq!(config.session.default_charset, "utf8");
        assert_eq!(config.session.default_collation, "utf8_bin");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = QuarryConfig::default();
        config.analyze.bucket_count = 0;
        assert!(config.validate().is_err());

        config.analyze.bucket_count = 256;
        config.analyze.max_sample_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
            node_id = 7

            [analyze]
            bucket_count = 64
        "#;

        let config = QuarryConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.node_id, 7);
        assert_eq!(config.analyze.bucket_count, 64);
        assert_eq!(config.analyze.max_sample_count, 10_000);
        assert_eq!(config.session, SessionDefaults::default());
    }

    #[test]
    fn test_parse_rejects_invalid() {
        let toml = r#"
            [analyze]
            max_sample_count = 0
        "#;
        assert!(QuarryConfig::from_toml_str(toml).is_err());
        assert!(QuarryConfig::from_toml_str("node_id = \"x\"").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("conf").join("quarry.toml");

        let mut config = QuarryConfig::default();
        config.analyze.max_sample_count = 500;
        config.session.default_collation = "utf8mb4_bin".to_string();
        config.save(&path).unwrap();

        let loaded = QuarryConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
