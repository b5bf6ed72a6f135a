//! # Configuration
//!
//! Optional TOML configuration for the binary.
//!
//! ```toml
//! [codec]
//! pretty = true
//!
//! [limits]
//! max_file_size = 1048576
//! ```
//!
//! Lookup order: `--config <path>`, then the `GRAPHCODEC_CONFIG` environment
//! variable, then built-in defaults. Missing keys fall back to defaults.

use graphcodec_core::primitives::MAX_DOCUMENT_SIZE;
use graphcodec_core::{CodecError, CodecOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV_VAR: &str = "GRAPHCODEC_CONFIG";

/// Largest accepted configuration file (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

// =============================================================================
// TYPES
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Output options handed to the codecs.
    pub codec: CodecOptions,
    /// Input limits.
    pub limits: Limits,
}

/// Input limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Largest input file the CLI will read, in bytes.
    pub max_file_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_size: MAX_DOCUMENT_SIZE as u64,
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, CodecError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| CodecError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, CodecError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            CodecError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(CodecError::Config(format!(
                "Config file {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            CodecError::Io(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Self::from_toml(&text)
    }

    /// Resolve the configuration from an explicit path or the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, CodecError> {
        let from_env = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), CodecError> {
        if self.limits.max_file_size == 0 {
            return Err(CodecError::Config(
                "limits.max_file_size must be positive".to_string(),
            ));
        }
        if self.limits.max_file_size > MAX_DOCUMENT_SIZE as u64 {
            return Err(CodecError::Config(format!(
                "limits.max_file_size {} exceeds the decoder limit {}",
                self.limits.max_file_size, MAX_DOCUMENT_SIZE
            )));
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_gives_defaults() {
        let config = AppConfig::from_toml("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert!(!config.codec.pretty);
        assert_eq!(config.limits.max_file_size, MAX_DOCUMENT_SIZE as u64);
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = AppConfig::from_toml("[codec]\npretty = true\n").expect("parse");
        assert!(config.codec.pretty);
        assert_eq!(config.limits, Limits::default());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(matches!(
            AppConfig::from_toml("[limits]\nmax_size = 3\n"),
            Err(CodecError::Config(_))
        ));
        assert!(matches!(
            AppConfig::from_toml("[codec]\nprety = true\n"),
            Err(CodecError::Config(_))
        ));
    }

    #[test]
    fn zero_limit_rejected() {
        assert!(matches!(
            AppConfig::from_toml("[limits]\nmax_file_size = 0\n"),
            Err(CodecError::Config(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = AppConfig::from_file(Path::new("/nonexistent/graphcodec.toml"));
        assert!(matches!(result, Err(CodecError::Io(_))));
    }
}
