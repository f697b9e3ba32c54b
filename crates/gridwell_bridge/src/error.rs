//! Error types for the call bridge
//!
//! Three tiers, matching how far a failure reaches:
//!
//! - [`ProtocolError`]: the opcode stream itself is broken. Fatal to a remote
//!   connection.
//! - [`CallError`]: one export call could not complete.
//! - [`StorageError`] / [`AssetError`]: a single operation failed. The plugin
//!   gets a sentinel reply and a log entry; nothing unwinds.

use std::io;

use gridwell_core::{ValueError, WireError};
use thiserror::Error;

use crate::opcode::Opcode;

/// Malformed request from a plugin.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    #[error("unknown opcode {0}")]
    UnknownOpcode(u64),

    #[error("{op}: expected {expected} argument(s), got {actual}")]
    ArgCount {
        op: Opcode,
        expected: usize,
        actual: usize,
    },

    #[error("{op}: argument {index}: {source}")]
    ArgType {
        op: Opcode,
        index: usize,
        #[source]
        source: ValueError,
    },
}

impl ProtocolError {
    /// True when the peer simply went away.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, ProtocolError::Wire(e) if e.is_disconnect())
    }
}

/// Failure of a single export call.
#[derive(Error, Debug)]
pub enum CallError {
    /// Remote plugin is not (or no longer) connected.
    #[error("no connection")]
    NoConnection,

    /// No in-process module is loaded for this plugin.
    #[error("no module loaded")]
    NoModule,

    #[error("plugin has no export '{0}'")]
    UnknownExport(String),

    #[error("argument {index} of '{function}': {source}")]
    Argument {
        function: String,
        index: usize,
        #[source]
        source: ValueError,
    },

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The export ran and reported failure.
    #[error("export '{function}' failed: {message}")]
    Export { function: String, message: String },

    /// A plugin tried to sub-render itself.
    #[error("plugin '{0}' is already rendering")]
    Reentrant(String),
}

impl CallError {
    /// Errors after which the connection must be dropped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CallError::NoConnection | CallError::Protocol(_))
    }
}

impl From<WireError> for CallError {
    fn from(e: WireError) -> Self {
        CallError::Protocol(ProtocolError::Wire(e))
    }
}

/// Relational storage failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage is not available")]
    Unavailable,

    #[error("query failed: {0}")]
    Query(String),
}

/// Asset lookup failure.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("no asset directory configured")]
    NotConfigured,

    #[error("invalid asset path '{0}'")]
    InvalidPath(String),

    #[error("asset '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for export calls.
pub type CallResult<T> = std::result::Result<T, CallError>;
