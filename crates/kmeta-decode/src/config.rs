//! Decoder configuration
//!
//! Loaded from a TOML table, e.g.
//!
//! ```toml
//! min_version = "1.1.0"
//! max_version = "2.1.0"
//! allow_pre_release = false
//! ```

use crate::header::MetadataVersion;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("Failed to parse decoder config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Semantically invalid configuration
    #[error("Invalid decoder config: {0}")]
    ValidationError(String),
}

/// Decoder settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderConfig {
    /// Oldest metadata version accepted
    pub min_version: MetadataVersion,

    /// Newest metadata version accepted (unbounded when absent)
    pub max_version: Option<MetadataVersion>,

    /// Accept metadata produced by pre-release compilers
    pub allow_pre_release: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            min_version: MetadataVersion::MINIMUM_SUPPORTED,
            max_version: None,
            allow_pre_release: true,
        }
    }
}

impl DecoderConfig {
    /// Parse a configuration from TOML
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: DecoderConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the version range is not empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max) = self.max_version {
            if max < self.min_version {
                return Err(ConfigError::ValidationError(format!(
                    "max_version {max} is older than min_version {}",
                    self.min_version
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DecoderConfig::from_toml_str("").unwrap();
        assert_eq!(config, DecoderConfig::default());
        assert_eq!(config.min_version, MetadataVersion::new(1, 1, 0));
        assert!(config.allow_pre_release);
    }

    #[test]
    fn test_full_config() {
        let config = DecoderConfig::from_toml_str(
            r#"
            min_version = "1.4.0"
            max_version = "2.1.0"
            allow_pre_release = false
            "#,
        )
        .unwrap();
        assert_eq!(config.min_version, MetadataVersion::new(1, 4, 0));
        assert_eq!(config.max_version, Some(MetadataVersion::new(2, 1, 0)));
        assert!(!config.allow_pre_release);
    }

    #[test]
    fn test_invalid_version_string() {
        let err = DecoderConfig::from_toml_str(r#"min_version = "one""#).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = DecoderConfig::from_toml_str("strict = true").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_empty_range_rejected() {
        let err = DecoderConfig::from_toml_str(
            r#"
            min_version = "1.5.0"
            max_version = "1.4.0"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
