//! Error types for request loading, catalog validation and generation jobs

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for all generation operations
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Failed to decode a generation request
    #[error("Failed to load request '{}': {source}", .path.display())]
    RequestLoad {
        /// Path of the request file
        path: PathBuf,
        /// Underlying decoding error
        #[source]
        source: serde_json::Error,
    },

    /// Catalog data doesn't meet generation requirements
    ///
    /// Raised for duplicate layer or piece identifiers, which would make
    /// emitted attribute lists ambiguous.
    #[error("Invalid catalog: {reason}")]
    InvalidCatalog {
        /// Description of what's wrong with the catalog
        reason: String,
    },

    /// Parameter validation failed
    #[error("Invalid parameter '{parameter}' = '{value}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// General file system operation failure
    #[error("File system error during {operation} on '{}': {source}", .path.display())]
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize generated output
    #[error("Failed to export collection to '{}': {source}", .path.display())]
    Export {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying encoding error
        #[source]
        source: serde_json::Error,
    },

    /// The generation worker panicked or could not be started
    #[error("Generation job {job} failed: {reason}")]
    JobFailed {
        /// Sequence number of the failed job
        job: u64,
        /// Description of the failure
        reason: String,
    },

    /// The generation worker stopped without sending a finish message
    #[error("Generation job {job} disconnected after {received} images")]
    JobDisconnected {
        /// Sequence number of the job
        job: u64,
        /// Images received before the channel closed
        received: usize,
    },
}

/// Convenience type alias for generation results
pub type Result<T> = std::result::Result<T, GenerationError>;

impl From<std::io::Error> for GenerationError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> GenerationError {
    GenerationError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create an invalid catalog error
pub fn invalid_catalog(reason: &impl ToString) -> GenerationError {
    GenerationError::InvalidCatalog {
        reason: reason.to_string(),
    }
}

/// Attach the offending path to a file system error
pub fn file_system(
    path: impl Into<PathBuf>,
    operation: &'static str,
) -> impl FnOnce(std::io::Error) -> GenerationError {
    let path = path.into();
    move |source| GenerationError::FileSystem {
        path,
        operation,
        source,
    }
}
