//! Error types for upstream credential acquisition

use thiserror::Error;

/// Result type for credential operations
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Errors raised while authorizing against an upstream platform
#[derive(Error, Debug, Clone)]
pub enum CredentialError {
    /// The platform answered the authorization call with a non-success status
    #[error("{platform} rejected the authorization request with HTTP {status}: {message}")]
    Rejected {
        /// Upstream platform name
        platform: &'static str,
        /// HTTP status returned by the platform
        status: u16,
        /// Upstream error body, if any
        message: String,
    },

    /// The authorization call never produced a response
    #[error("{platform} authorization request failed: {message}")]
    Transport {
        /// Upstream platform name
        platform: &'static str,
        /// Transport error description
        message: String,
    },

    /// The platform answered with a body we could not interpret
    #[error("{platform} returned an invalid authorization response: {message}")]
    InvalidResponse {
        /// Upstream platform name
        platform: &'static str,
        /// Decoding error description
        message: String,
    },
}

impl CredentialError {
    /// HTTP status reported by the upstream platform, when there was one
    #[must_use]
    pub const fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Transport { .. } | Self::InvalidResponse { .. } => None,
        }
    }
}
