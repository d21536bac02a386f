//! Error types for the editor
//!
//! The overlay runtime itself swallows and logs most failures (a missing
//! fixed node, a failed highlight, a failed gallery read). These types
//! cover the surfaces that do report to the host: construction, storage
//! and file reads.

use std::path::PathBuf;
use thiserror::Error;

pub type EditorResult<T> = Result<T, EditorError>;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Document has no <body> element")]
    MissingBody,

    #[error("Required overlay node `#{0}` is missing")]
    MissingNode(&'static str),

    #[error("DOM error: {0}")]
    Dom(#[from] livepage_dom::DomError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed storage file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Host storage refused the operation (quota, privacy mode, ...)
    #[error("Storage backend rejected `{key}`: {message}")]
    Backend { key: String, message: String },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Malformed {
            path: path.into(),
            source,
        }
    }

    pub fn encode(key: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encode {
            key: key.into(),
            source,
        }
    }

    pub fn backend(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            key: key.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadError {
    #[error("File `{0}` not found")]
    NotFound(String),

    #[error("Failed to read `{name}`: {message}")]
    Io { name: String, message: String },

    #[error("Read of `{0}` could not be scheduled")]
    Spawn(String),
}

impl ReadError {
    pub fn io(name: impl Into<String>, err: &std::io::Error) -> Self {
        Self::Io {
            name: name.into(),
            message: err.to_string(),
        }
    }
}
