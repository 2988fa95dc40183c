//! User configuration, loaded from an optional ~/.lanefx/config.yaml.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interp::Options;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Settings read from the config file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Cap on iterations of one `while` loop; `null` disables the cap.
    #[serde(default = "default_max_loop_iterations")]
    pub max_loop_iterations: Option<u64>,
    /// Log `//comment` chart annotations while processing.
    #[serde(default = "default_true")]
    pub echo_chart_comments: bool,
    /// Script used when none is given on the command line.
    #[serde(default)]
    pub default_script: Option<PathBuf>,
}

fn default_max_loop_iterations() -> Option<u64> {
    Some(100_000)
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_loop_iterations: default_max_loop_iterations(),
            echo_chart_comments: true,
            default_script: None,
        }
    }
}

impl Config {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(".lanefx");
        path.push("config.yaml");
        path
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        Self::load(&Self::default_path())
    }

    /// Interpreter options derived from this config.
    pub fn options(&self) -> Options {
        Options {
            max_loop_iterations: self.max_loop_iterations,
            echo_chart_comments: self.echo_chart_comments,
        }
    }
}
