//! Pipeline configuration loaded from TOML
//!
//! Every section falls back to its defaults, so an empty file is a valid
//! configuration:
//!
//! ```toml
//! [features]
//! target_column = "saudi_production"
//! lags = [1, 2, 3, 6, 12]
//!
//! [evaluation]
//! folds = 5
//!
//! [[models]]
//! model = "elastic_net"
//! alpha = 0.1
//!
//! [registry]
//! root = "models"
//! stage = "production"
//! ```

use crate::artifact::DEFAULT_NAME_PREFIX;
use crate::error::{ForecastError, Result};
use crate::evaluation::EvaluationParams;
use crate::features::FeatureParams;
use crate::models::ModelSpec;
use crate::registry::Stage;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where and how winning models are stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Root directory of the file store
    pub root: PathBuf,
    /// Stage winners are stored under
    pub stage: Stage,
    /// Prefix of registered model names
    pub name_prefix: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("models"),
            stage: Stage::Production,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub features: FeatureParams,
    pub evaluation: EvaluationParams,
    /// Candidate models, in tie-break order
    pub models: Vec<ModelSpec>,
    pub registry: RegistryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            features: FeatureParams::default(),
            evaluation: EvaluationParams::default(),
            models: ModelSpec::default_candidates(),
            registry: RegistryConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Read and parse a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            ForecastError::ConfigError(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.features.validate()?;
        self.evaluation.validate()?;
        if self.models.is_empty() {
            return Err(ForecastError::ConfigError(
                "At least one candidate model must be configured".to_string(),
            ));
        }
        for model in &self.models {
            model.validate()?;
        }
        if self.registry.name_prefix.is_empty() {
            return Err(ForecastError::ConfigError(
                "Registry name prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
