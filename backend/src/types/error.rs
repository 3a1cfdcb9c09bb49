//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    extract::rejection::{BytesRejection, FormRejection, JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;
use serde_json::Value;

use crate::{
    catalog::CatalogError, credentials::CredentialError, object_storage::ObjectStorageError,
    submission::SubmissionError,
};

const INTERNAL_ERROR: &str = "Internal server error";

/// Error body returned by every endpoint
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Structured context, e.g. missing field names or upstream validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            inner: ErrorResponse {
                error: message.into(),
                details: None,
            },
        }
    }

    /// Attaches structured details to the response body
    #[must_use]
    pub fn with_details(mut self, details: impl Serialize) -> Self {
        self.inner.details = serde_json::to_value(details).ok();
        self
    }

    /// 400 for bad caller input
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 404
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 500 with a generic message
    #[must_use]
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
    }

    /// Maps a catalog failure on a mutation. Top-level GraphQL errors there are caused by
    /// the caller's field values, so they are a 400 instead of a 500.
    #[must_use]
    pub fn from_catalog_write(err: CatalogError) -> Self {
        match err {
            CatalogError::Graphql(errors) => {
                tracing::warn!("Catalog rejected mutation: {errors:?}");
                Self::validation("Catalog rejected the request").with_details(errors)
            }
            other => other.into(),
        }
    }

    /// HTTP status of the response
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!("Client error: {} - {}", self.status, self.inner.error),
            500..=599 => tracing::error!("Server error: {} - {}", self.status, self.inner.error),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        tracing::error!("Upstream credential exchange failed: {err}");
        let platform = match &err {
            CredentialError::Rejected { platform, .. }
            | CredentialError::Transport { platform, .. }
            | CredentialError::InvalidResponse { platform, .. } => *platform,
        };
        Self::new(
            StatusCode::BAD_GATEWAY,
            format!("Failed to authenticate with {platform}"),
        )
    }
}

impl From<ObjectStorageError> for AppError {
    fn from(err: ObjectStorageError) -> Self {
        match err {
            ObjectStorageError::InvalidInput(msg) => Self::validation(msg),
            ObjectStorageError::Auth(err) => err.into(),
            ObjectStorageError::NotFound(key) => {
                Self::not_found("File not found").with_details(serde_json::json!({ "key": key }))
            }
            ObjectStorageError::Upload(msg) => {
                tracing::error!("Object upload failed: {msg}");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
            }
            ObjectStorageError::Upstream(msg) => {
                tracing::error!("Object storage error: {msg}");
                Self::internal()
            }
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Auth(err) => err.into(),
            CatalogError::UserErrors(errors) => {
                Self::validation("Catalog rejected the request").with_details(errors)
            }
            other => {
                tracing::error!("Catalog error: {other}");
                Self::internal()
            }
        }
    }
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        let message = err.to_string();
        match err {
            SubmissionError::MissingFields(fields) => {
                Self::validation(message).with_details(serde_json::json!({ "missing": fields }))
            }
            SubmissionError::InvalidField { key, .. } => {
                Self::validation(message).with_details(serde_json::json!({ "field": key }))
            }
            SubmissionError::EmptyUpdate => Self::validation(message),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::MissingJsonContentType(_) => {
                Self::validation("Missing Content-Type: application/json header")
            }
            other => Self::new(other.status(), "Invalid JSON payload")
                .with_details(other.body_text()),
        }
    }
}

impl From<FormRejection> for AppError {
    fn from(rejection: FormRejection) -> Self {
        Self::new(rejection.status(), "Invalid form payload").with_details(rejection.body_text())
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::new(StatusCode::PAYLOAD_TOO_LARGE, "File too large");
        }
        Self::new(rejection.status(), "Failed to read request body")
    }
}

impl OperationOutput for AppError {
    type Inner = ErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ErrorResponse>::operation_response(ctx, operation)
    }
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;
    use crate::catalog::{GraphqlError, UserError};

    async fn body(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_missing_fields_are_listed() {
        let (status, json) =
            body(SubmissionError::MissingFields(vec!["video_url"]).into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Missing required fields: video_url");
        assert_eq!(json["details"]["missing"][0], "video_url");
    }

    #[tokio::test]
    async fn test_user_errors_are_client_errors() {
        let err = CatalogError::UserErrors(vec![UserError {
            field: Some(vec!["fields".to_string()]),
            message: "Value is invalid".to_string(),
            code: Some("INVALID".to_string()),
        }]);

        let (status, json) = body(err.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"][0]["message"], "Value is invalid");
    }

    #[tokio::test]
    async fn test_graphql_errors_depend_on_operation() {
        let errors = || {
            CatalogError::Graphql(vec![GraphqlError {
                message: "Field 'x' doesn't exist".to_string(),
            }])
        };

        let (read_status, read_json) = body(errors().into()).await;
        let (write_status, _) = body(AppError::from_catalog_write(errors())).await;

        assert_eq!(read_status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json["error"], INTERNAL_ERROR);
        assert!(read_json.get("details").is_none());
        assert_eq!(write_status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_credential_failure_is_bad_gateway() {
        let err = CredentialError::Rejected {
            platform: "Backblaze B2",
            status: 401,
            message: "bad_auth_token".to_string(),
        };

        let (status, json) = body(ObjectStorageError::Auth(err).into()).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], "Failed to authenticate with Backblaze B2");
    }

    #[tokio::test]
    async fn test_upstream_failures_hide_internal_state() {
        let (status, json) =
            body(ObjectStorageError::Upstream("secret-token rejected".to_string()).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!json.to_string().contains("secret-token"));
    }
}
