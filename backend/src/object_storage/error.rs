//! Error types for object storage operations

use thiserror::Error;

use crate::credentials::CredentialError;

/// Result type for object storage operations
pub type ObjectStorageResult<T> = Result<T, ObjectStorageError>;

/// Errors that can occur during object storage operations
#[derive(Error, Debug)]
pub enum ObjectStorageError {
    /// Caller input was missing or unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The storage session could not be authorized
    #[error(transparent)]
    Auth(#[from] CredentialError),

    /// Upload authorization or the upload itself failed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// No stored file matches the requested key
    #[error("File not found: {0}")]
    NotFound(String),

    /// Any other storage-side failure
    #[error("Upstream storage error: {0}")]
    Upstream(String),
}
