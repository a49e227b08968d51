use crate::coordinator::Execution;
use crate::forest::ForestConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which pair of data files a run reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// The small development sample.
    Sample,
    /// The complete training and test files.
    Full,
}

impl RunMode {
    pub fn from_full_flag(full: bool) -> Self {
        if full { Self::Full } else { Self::Sample }
    }
}

/// Files and forest size used by one run mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSettings {
    pub train_file: PathBuf,
    pub test_file: PathBuf,
    pub n_trees: usize,
}

/// Everything the driver needs to know beyond the run mode.
///
/// Every field has a default, so a TOML file only needs the values it
/// overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub key_column: String,
    pub label_column: String,
    pub output: PathBuf,
    pub execution: Execution,
    pub sample: ModeSettings,
    pub full: ModeSettings,
    /// Forest hyperparameters; `n_trees` is taken from the active mode.
    pub forest: ForestConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            key_column: "PdDistrict".to_string(),
            label_column: "Category".to_string(),
            output: PathBuf::from("submission.csv"),
            execution: Execution::Parallel,
            sample: ModeSettings {
                train_file: PathBuf::from("train.small.csv"),
                test_file: PathBuf::from("test.small.csv"),
                n_trees: 1,
            },
            full: ModeSettings {
                train_file: PathBuf::from("train.csv"),
                test_file: PathBuf::from("test.csv"),
                n_trees: 60,
            },
            forest: ForestConfig::default(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Mode '{0:?}' is configured with zero trees.")]
    NoTrees(RunMode),
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded run configuration from {}", path.display());
        Ok(config)
    }

    pub fn mode(&self, mode: RunMode) -> &ModeSettings {
        match mode {
            RunMode::Sample => &self.sample,
            RunMode::Full => &self.full,
        }
    }

    pub fn train_path(&self, mode: RunMode) -> PathBuf {
        self.data_dir.join(&self.mode(mode).train_file)
    }

    pub fn test_path(&self, mode: RunMode) -> PathBuf {
        self.data_dir.join(&self.mode(mode).test_file)
    }

    /// The forest configuration for `mode`, shared by every partition.
    pub fn forest_for(&self, mode: RunMode) -> Result<ForestConfig, ConfigError> {
        match self.mode(mode).n_trees {
            0 => Err(ConfigError::NoTrees(mode)),
            n_trees => Ok(self.forest.clone().with_trees(n_trees)),
        }
    }
}
