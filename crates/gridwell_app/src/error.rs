//! Error types for gridwell_app

use std::io;
use std::path::PathBuf;

use gridwell_bridge::CallError;
use thiserror::Error;

/// Errors that stop the host from starting or saving.
#[derive(Error, Debug)]
pub enum HostError {
    /// Nothing to display without the base plugin.
    #[error("base plugin '{0}' is not registered")]
    MissingBasePlugin(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to bind the remote plugin listener.
    #[error("listener on {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("plugin '{plugin}': {source}")]
    Call {
        plugin: String,
        #[source]
        source: CallError,
    },
}

impl HostError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HostError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        HostError::Json {
            path: path.into(),
            source,
        }
    }
}

/// Result type for gridwell_app operations.
pub type Result<T> = std::result::Result<T, HostError>;
