use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::dataset::CellOverrides;
use super::error::ConfigError;
use super::step::StepBoundaryPolicy;

/// Structure representing the application configuration. Contains the files of one test
/// unit and how to analyze them.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub file_paths: Vec<PathBuf>,
    pub active_mass_g: Option<f64>,
    pub design_capacity_ah: Option<f64>,
    pub rated_capacity_ah: Option<f64>,
    pub voltage_upper_limit: Option<f64>,
    pub voltage_lower_limit: Option<f64>,
    pub merge: bool,
    pub add_cycle_to_records: bool,
    pub step_boundary: StepBoundaryPolicy,
    pub summary_path: Option<PathBuf>,
    pub n_threads: i32,
}

impl Default for Config {
    /// Generate a new Config object. There are no files to read and no overrides
    fn default() -> Self {
        Self {
            file_paths: Vec::new(),
            active_mass_g: None,
            design_capacity_ah: None,
            rated_capacity_ah: None,
            voltage_upper_limit: None,
            voltage_lower_limit: None,
            merge: false,
            add_cycle_to_records: true,
            step_boundary: StepBoundaryPolicy::MergeAcrossFiles,
            summary_path: None,
            n_threads: 1,
        }
    }
}

impl Config {
    /// Read the configuration in a YAML file
    /// Returns a Config if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// The user supplied cell parameters
    pub fn overrides(&self) -> CellOverrides {
        CellOverrides {
            active_mass_g: self.active_mass_g,
            design_capacity_ah: self.design_capacity_ah,
            rated_capacity_ah: self.rated_capacity_ah,
            voltage_upper_limit: self.voltage_upper_limit,
            voltage_lower_limit: self.voltage_lower_limit,
        }
    }

    /// Files listed in the config that do not exist
    pub fn missing_files(&self) -> Vec<&Path> {
        self.file_paths
            .iter()
            .filter(|path| !path.exists())
            .map(|path| path.as_path())
            .collect()
    }

    pub fn is_n_threads_valid(&self) -> bool {
        self.n_threads >= 1
    }
}
