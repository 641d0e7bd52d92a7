//! Error types for the failclose gate
//!
//! A denied handler is not an error. Everything here is an operator
//! defect that has to be fixed in configuration.

use std::path::PathBuf;
use thiserror::Error;

pub type FailCloseResult<T> = Result<T, FailCloseError>;

#[derive(Debug, Error)]
pub enum FailCloseError {
    #[error("Improperly configured: {0}")]
    Configuration(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl FailCloseError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}
