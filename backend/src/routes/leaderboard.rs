use std::sync::Arc;

use axum::{extract::Path, Extension, Json};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    catalog::{Catalog, MetaobjectRecord, LEADERBOARD_ENTRY_TYPE},
    submission::{self, LeaderboardSelector, LISTING_PAGE_SIZE},
    types::AppError,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TypePath {
    /// Leaderboard category, e.g. `RAB`
    pub leaderboard_type: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NamePath {
    /// White-label leaderboard name
    pub leaderboard_name: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TypeLeaderboardResponse {
    pub success: bool,
    pub leaderboard_type: String,
    pub count: usize,
    /// Verified entries, fastest first
    pub entries: Vec<MetaobjectRecord>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct NameLeaderboardResponse {
    pub success: bool,
    pub leaderboard_name: String,
    pub count: usize,
    /// Verified entries, fastest first
    pub entries: Vec<MetaobjectRecord>,
}

async fn ranked_entries(
    catalog: &dyn Catalog,
    selector: LeaderboardSelector,
    value: &str,
) -> Result<Vec<MetaobjectRecord>, AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!(
            "Missing {}",
            selector.field()
        )));
    }

    let records = catalog
        .query(LEADERBOARD_ENTRY_TYPE, LISTING_PAGE_SIZE)
        .await?;

    Ok(submission::leaderboard(records, selector, value))
}

/// Verified entries of one leaderboard type, fastest first
///
/// Only the first 250 entries in the catalog are considered.
///
/// # Errors
///
/// - 400 if the type is blank
/// - 500 if the catalog is unavailable
#[instrument(skip(catalog))]
pub async fn by_type(
    Extension(catalog): Extension<Arc<dyn Catalog>>,
    Path(TypePath { leaderboard_type }): Path<TypePath>,
) -> Result<Json<TypeLeaderboardResponse>, AppError> {
    let entries = ranked_entries(catalog.as_ref(), LeaderboardSelector::Type, &leaderboard_type)
        .await?;

    Ok(Json(TypeLeaderboardResponse {
        success: true,
        leaderboard_type,
        count: entries.len(),
        entries,
    }))
}

/// Verified entries of one white-label leaderboard, fastest first
///
/// # Errors
///
/// - 400 if the name is blank
/// - 500 if the catalog is unavailable
#[instrument(skip(catalog))]
pub async fn by_name(
    Extension(catalog): Extension<Arc<dyn Catalog>>,
    Path(NamePath { leaderboard_name }): Path<NamePath>,
) -> Result<Json<NameLeaderboardResponse>, AppError> {
    let entries = ranked_entries(catalog.as_ref(), LeaderboardSelector::Name, &leaderboard_name)
        .await?;

    Ok(Json(NameLeaderboardResponse {
        success: true,
        leaderboard_name,
        count: entries.len(),
        entries,
    }))
}
