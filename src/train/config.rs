//! Training configuration

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Training configuration
///
/// # Example
///
/// ```
/// use medidor::train::TrainConfig;
///
/// let config = TrainConfig::from_yaml_str("epochs: 5\nlogging_frequency: 20\n").unwrap();
/// assert_eq!(config.epochs, 5);
/// assert!(config.validate);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Number of epochs to train
    pub epochs: usize,

    /// Fire a log event every N training steps
    pub logging_frequency: usize,

    /// Run a validation pass at the end of each epoch when validation
    /// batches are provided
    pub validate: bool,

    /// Export stats to a CSV file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<CsvExportConfig>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 1,
            logging_frequency: 10,
            validate: true,
            export: None,
        }
    }
}

impl TrainConfig {
    /// Create a new training configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set number of epochs
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set logging frequency, clamped to at least one step
    pub fn with_logging_frequency(mut self, steps: usize) -> Self {
        self.logging_frequency = steps.max(1);
        self
    }

    /// Skip validation passes
    pub fn without_validation(mut self) -> Self {
        self.validate = false;
        self
    }

    /// Export stats to CSV
    pub fn with_export(mut self, export: CsvExportConfig) -> Self {
        self.export = Some(export);
        self
    }

    /// Parse a YAML configuration
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse YAML config: {e}")))?;
        config.logging_frequency = config.logging_frequency.max(1);
        Ok(config)
    }

    /// Load a YAML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&yaml)
    }
}

/// CSV export settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CsvExportConfig {
    /// Output file
    pub output: PathBuf,

    /// Append to an existing file instead of truncating it
    #[serde(default)]
    pub append: bool,

    /// Columns to export; defaults to `epoch`, `step` and every stat name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
}

impl CsvExportConfig {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            append: false,
            columns: None,
        }
    }
}
