//! Configuration for lineage-runtime.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use lineage_core::AssemblyOptions;

/// Errors that can occur when loading a runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Engine options
    #[serde(default)]
    pub assembly: AssemblyConfig,

    /// Fan-out across independent families
    #[serde(default)]
    pub parallelism: ParallelismConfig,

    /// Diagnostic logging
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from disk. `.json` files are read as JSON, everything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_yaml(&contents)
        }
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Options handed to the core engine.
    pub fn assembly_options(&self) -> AssemblyOptions {
        AssemblyOptions {
            strategic_threshold: self.assembly.strategic_threshold,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.assembly.strategic_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "assembly.strategic_threshold must be a non-negative number, got {}",
                threshold
            )));
        }
        if self.parallelism.max_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "parallelism.max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Engine options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssemblyConfig {
    /// Family value above which the relationship is a strategic partnership
    #[serde(default = "default_strategic_threshold")]
    pub strategic_threshold: f64,
}

fn default_strategic_threshold() -> f64 {
    AssemblyOptions::DEFAULT_STRATEGIC_THRESHOLD
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            strategic_threshold: default_strategic_threshold(),
        }
    }
}

/// Parallelism configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParallelismConfig {
    /// Assemble families on blocking worker tasks
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum families assembled at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsConfig {
    /// Log informational diagnostics (defaulted fields) at debug level
    #[serde(default)]
    pub log_informational: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RuntimeConfig::default();
        assert_eq!(config.assembly.strategic_threshold, 2_000_000.0);
        assert!(config.parallelism.enabled);
        assert_eq!(config.parallelism.max_concurrency, 4);
        assert!(!config.diagnostics.log_informational);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = RuntimeConfig::from_yaml(
            r#"
assembly:
  strategic_threshold: 750000
parallelism:
  enabled: false
"#,
        )
        .unwrap();

        assert_eq!(config.assembly.strategic_threshold, 750_000.0);
        assert!(!config.parallelism.enabled);
        assert_eq!(config.parallelism.max_concurrency, 4);
        assert_eq!(config.assembly_options().strategic_threshold, 750_000.0);
    }

    #[test]
    fn test_json_config() {
        let config =
            RuntimeConfig::from_json(r#"{"diagnostics": {"log_informational": true}}"#).unwrap();
        assert!(config.diagnostics.log_informational);
        assert!(config.parallelism.enabled);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let result = RuntimeConfig::from_yaml("parallelism:\n  max_concurrency: 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let result = RuntimeConfig::from_json(r#"{"assembly": {"strategic_threshold": -1}}"#);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_yaml_round_trip_through_file() {
        let mut config = RuntimeConfig::default();
        config.parallelism.max_concurrency = 8;

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(config.to_yaml().unwrap().as_bytes()).unwrap();

        let loaded = RuntimeConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_file_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"parallelism": {"max_concurrency": 2}}"#).unwrap();

        let loaded = RuntimeConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.parallelism.max_concurrency, 2);
    }
}
