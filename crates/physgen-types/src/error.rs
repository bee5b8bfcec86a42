//! Error types for physgen.
//!
//! All crates return `PhysgenResult<T>` from fallible operations.

use thiserror::Error;

/// Unified error type for physgen.
#[derive(Debug, Error)]
pub enum PhysgenError {
    /// Configuration value or CLI argument is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A model name is not present in the allowed library.
    #[error("Unknown model '{name}' (library: {library})")]
    UnknownModel { name: String, library: String },

    /// The Simulation Host sent something we cannot decode.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A response batch lacks a record kind the trial expects.
    /// Recoverable: the runner retries the same frame.
    #[error("Response batch is missing a '{0}' record")]
    MissingRecord(&'static str),

    /// Archive file is malformed or a dataset is inconsistent.
    #[error("Archive error: {0}")]
    Archive(String),

    /// Dataset writer was used out of order.
    #[error("Writer error: {0}")]
    Writer(String),

    /// The Simulation Host connection failed.
    #[error("Simulation host error: {0}")]
    Host(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PhysgenError {
    /// True for errors the trial runner recovers from by retrying a frame.
    pub fn is_transient(&self) -> bool {
        matches!(self, PhysgenError::MissingRecord(_))
    }
}

/// Convenience alias for `Result<T, PhysgenError>`.
pub type PhysgenResult<T> = Result<T, PhysgenError>;
