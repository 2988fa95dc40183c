//! Top-level error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::chart::{ChartError, Tick};
use crate::config::ConfigError;
use crate::interp::EvalError;
use crate::script::LoadError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("chart: {0}")]
    Chart(#[from] ChartError),

    #[error("script: {0}")]
    Load(#[from] LoadError),

    #[error("{command} at t={tick}: {source}")]
    Eval {
        command: String,
        tick: Tick,
        #[source]
        source: EvalError,
    },

    #[error("t={tick}: malformed invocation `{text}`")]
    MalformedInvocation { tick: Tick, text: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("export: {0}")]
    Export(#[from] serde_yaml::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_failures_are_export_errors() {
        let yaml = serde_yaml::from_str::<Vec<u32>>("[1, 2").unwrap_err();
        let err = Error::from(yaml);
        assert!(matches!(err, Error::Export(_)));
        assert!(err.to_string().starts_with("export: "));
    }
}
