use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::{
    catalog::{metaobject_gid, Catalog, MetaobjectRecord, LEADERBOARD_ENTRY_TYPE},
    submission::{self, REVIEW_PAGE_SIZE},
    types::{AppError, JsonBody},
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SubmissionPath {
    /// Metaobject global id, or its trailing numeric part
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateResponse {
    pub success: bool,
    pub submission: MetaobjectRecord,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VerifyResponse {
    pub success: bool,
    pub verified: bool,
    pub submission: MetaobjectRecord,
}

/// Oldest submission still waiting for review
///
/// # Errors
///
/// - 404 if every submission in the first page has been reviewed
/// - 500 if the catalog is unavailable
#[instrument(skip_all)]
pub async fn next_unverified(
    Extension(catalog): Extension<Arc<dyn Catalog>>,
) -> Result<Json<MetaobjectRecord>, AppError> {
    let records = catalog
        .query(LEADERBOARD_ENTRY_TYPE, REVIEW_PAGE_SIZE)
        .await?;

    submission::first_unverified(records)
        .map(Json)
        .ok_or_else(|| AppError::not_found("No unverified submissions found"))
}

/// Corrects fields of a submission. `verified` is ignored; use the verify endpoint.
///
/// # Errors
///
/// - 400 if the body is empty, holds nested values, or the catalog rejects it
/// - 500 if the catalog is unavailable
#[instrument(skip(catalog, body))]
pub async fn update_submission(
    Extension(catalog): Extension<Arc<dyn Catalog>>,
    Path(SubmissionPath { id }): Path<SubmissionPath>,
    JsonBody(body): JsonBody<Map<String, Value>>,
) -> Result<Json<UpdateResponse>, AppError> {
    let fields = submission::admin_edit_fields(body)?;

    let submission = catalog
        .update(&metaobject_gid(&id), &fields)
        .await
        .map_err(AppError::from_catalog_write)?;

    tracing::info!(id = %submission.id, keys = ?fields.keys().collect::<Vec<_>>(), "Updated submission");

    Ok(Json(UpdateResponse {
        success: true,
        submission,
    }))
}

/// Marks a submission verified, publishing it on its leaderboards
///
/// # Errors
///
/// - 400 if the catalog rejects the id
/// - 500 if the catalog is unavailable
#[instrument(skip(catalog))]
pub async fn verify_submission(
    Extension(catalog): Extension<Arc<dyn Catalog>>,
    Path(SubmissionPath { id }): Path<SubmissionPath>,
) -> Result<Json<VerifyResponse>, AppError> {
    let submission = catalog
        .update(&metaobject_gid(&id), &submission::verification_fields())
        .await
        .map_err(AppError::from_catalog_write)?;

    tracing::info!(id = %submission.id, "Verified submission");

    Ok(Json(VerifyResponse {
        success: true,
        verified: true,
        submission,
    }))
}
