//! Error types for the block store client

use blackhole_reduce::ReduceError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to the block store or processing files
#[derive(Debug, Error)]
pub enum ClientError {
    /// Request could not be sent or the response body could not be read
    #[error("request to {url} failed: {msg}")]
    Network {
        /// Endpoint that was called
        url: String,
        /// Underlying error text
        msg: String,
    },

    /// Store answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status {
        /// Endpoint that was called
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// A block or request failed local validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Configuration is missing, unreadable or invalid
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Image reduction failed
    #[error(transparent)]
    Reduce(#[from] ReduceError),

    /// The input directory cannot be listed
    #[error("cannot read directory {path}: {source}")]
    DirectoryUnreadable {
        /// Directory that was requested
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
