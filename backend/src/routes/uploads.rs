use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path},
    http::{header, HeaderMap},
    Extension, Json,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::{
    object_storage::ObjectStorage,
    types::{AppError, RequestOrigin, ValidatedJson},
};

/// Largest video accepted by the upload proxy
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Configured public origin of this service, if any
#[derive(Debug, Clone, Default)]
pub struct PublicBaseUrl(pub Option<String>);

#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlRequest {
    /// Original file name; characters outside `[A-Za-z0-9._-]` are replaced
    #[serde(default)]
    #[validate(length(min = 1, message = "filename"))]
    pub filename: String,
    /// MIME type of the video
    #[serde(default)]
    #[validate(length(min = 1, message = "contentType"))]
    pub content_type: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlResponse {
    /// URL to `PUT` the raw bytes to
    pub upload_url: String,
    /// URL the video will be downloadable from once uploaded
    pub public_url: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    /// Download URL of the stored video
    pub public_url: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Allocates a storage key for a video and returns where to upload it
///
/// The upload URL points at this service's `/upload/{key}` proxy, so the browser never
/// needs storage credentials.
///
/// # Errors
///
/// - 400 if `filename` or `contentType` is missing or empty
/// - 502 if the storage account cannot be authorized
#[instrument(skip_all, fields(filename = %payload.filename))]
pub async fn issue_upload_url(
    Extension(storage): Extension<Arc<dyn ObjectStorage>>,
    Extension(PublicBaseUrl(configured_base)): Extension<PublicBaseUrl>,
    RequestOrigin(request_origin): RequestOrigin,
    ValidatedJson(payload): ValidatedJson<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    let public_base = configured_base
        .or(request_origin)
        .ok_or_else(|| AppError::validation("Missing Host header"))?;

    let target = storage
        .issue_upload_target(&payload.filename, &payload.content_type, &public_base)
        .await?;

    tracing::info!(key = %target.key, "Issued upload target");

    Ok(Json(UploadUrlResponse {
        upload_url: target.upload_url,
        public_url: target.public_url,
    }))
}

/// Streams the request body into storage under `key`
///
/// # Errors
///
/// - 413 if the body exceeds the upload limit
/// - 500 if storage rejects the upload
#[instrument(skip(storage, headers, body))]
pub async fn upload_file(
    Extension(storage): Extension<Arc<dyn ObjectStorage>>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let body = body?;
    if key.trim().is_empty() {
        return Err(AppError::validation("Missing file key"));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    tracing::debug!(size = body.len(), content_type, "Uploading file");

    let public_url = storage.upload_file(&key, body, content_type).await?;

    Ok(Json(UploadResponse {
        success: true,
        public_url,
    }))
}

/// Deletes a stored video
///
/// # Errors
///
/// - 404 if nothing is stored under `key`
/// - 500 on any other storage failure
#[instrument(skip(storage))]
pub async fn delete_file(
    Extension(storage): Extension<Arc<dyn ObjectStorage>>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    if key.trim().is_empty() {
        return Err(AppError::validation("Missing file key"));
    }

    storage.delete_file(&key).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("Deleted {key}"),
    }))
}
