//! Error types for catalog operations

use thiserror::Error;

use super::graphql::{GraphqlError, UserError};
use crate::credentials::CredentialError;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while talking to the catalog Admin API
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The access token could not be obtained
    #[error(transparent)]
    Auth(#[from] CredentialError),

    /// The request never produced a response
    #[error("Catalog request failed: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status
    #[error("Catalog returned HTTP {status}: {body}")]
    Status {
        /// HTTP status
        status: u16,
        /// Raw response body
        body: String,
    },

    /// The GraphQL document was rejected as a whole
    #[error("Catalog GraphQL errors: {}", join_messages(.0.iter().map(|e| e.message.as_str())))]
    Graphql(Vec<GraphqlError>),

    /// The mutation ran but the input was rejected
    #[error("Catalog rejected the input: {}", join_messages(.0.iter().map(|e| e.message.as_str())))]
    UserErrors(Vec<UserError>),

    /// The response lacked the expected payload
    #[error("Catalog response is missing {0}")]
    MissingPayload(&'static str),

    /// The response body could not be decoded
    #[error("Catalog response could not be decoded: {0}")]
    Decode(String),
}

fn join_messages<'a>(messages: impl Iterator<Item = &'a str>) -> String {
    messages.collect::<Vec<_>>().join("; ")
}
