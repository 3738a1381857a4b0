use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::config_defaults::{
    clamp_dataset_size, clamp_max_iterations, default_data_path, default_grouping,
    default_max_iterations, default_regenerate_size, default_synthetic_size, default_tolerance,
    sanitize_tolerance,
};
use crate::survival::FitOptions;

/// Settings that live in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub view: ViewSettings,
}

impl AppSettings {
    /// Clamp out-of-range values to something the pipeline can run with.
    pub fn normalized(mut self) -> Self {
        self.data.synthetic_size = clamp_dataset_size(self.data.synthetic_size);
        self.data.regenerate_size = clamp_dataset_size(self.data.regenerate_size);
        self.model.max_iterations = clamp_max_iterations(self.model.max_iterations);
        self.model.tolerance = sanitize_tolerance(self.model.tolerance);
        if self.view.default_grouping.trim().is_empty() {
            self.view.default_grouping = default_grouping();
        }
        self
    }
}

/// Where records come from and how much fallback data to generate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSettings {
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
    #[serde(default = "default_synthetic_size")]
    pub synthetic_size: usize,
    #[serde(default = "default_regenerate_size")]
    pub regenerate_size: usize,
    /// Fixed seed for generated data; fresh entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            synthetic_size: default_synthetic_size(),
            regenerate_size: default_regenerate_size(),
            seed: None,
        }
    }
}

/// Newton-Raphson controls for the proportional-hazards fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
        }
    }
}

impl ModelSettings {
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            ..FitOptions::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    /// Column used for the grouped survival tab at startup.
    #[serde(default = "default_grouping")]
    pub default_grouping: String,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            default_grouping: default_grouping(),
        }
    }
}

/// Errors that can occur while loading or saving settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to create config directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config to TOML at {path}: {source}")]
    SerializeToml {
        path: PathBuf,
        source: toml::ser::Error,
    },
    #[error("No suitable config directory found")]
    NoConfigDir,
}
