use std::{collections::HashMap, sync::Arc};

use axum::{Extension, Json};
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    catalog::{Catalog, CreatedMetaobject, LEADERBOARD_ENTRY_TYPE},
    submission,
    types::{AppError, FormBody},
};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SubmitResponse {
    pub success: bool,
    /// The created leaderboard entry
    pub metaobject: CreatedMetaobject,
}

/// Records a new leaderboard submission from the storefront form
///
/// Fields may be posted as `contact[handle_text]` or `handle_text`. New entries are
/// always unverified and carry placeholder analysis values.
///
/// # Errors
///
/// - 400 if a required field is missing or the catalog rejects a value
/// - 500 if the catalog is unavailable
#[instrument(skip_all)]
pub async fn submit_chug(
    Extension(catalog): Extension<Arc<dyn Catalog>>,
    FormBody(form): FormBody<HashMap<String, String>>,
) -> Result<Json<SubmitResponse>, AppError> {
    let fields = submission::new_submission_fields(&form, Utc::now())?;

    let metaobject = catalog
        .create(LEADERBOARD_ENTRY_TYPE, &fields)
        .await
        .map_err(AppError::from_catalog_write)?;

    tracing::info!(id = %metaobject.id, "Created leaderboard submission");

    Ok(Json(SubmitResponse {
        success: true,
        metaobject,
    }))
}
