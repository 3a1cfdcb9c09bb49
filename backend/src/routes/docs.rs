use aide::{axum::ApiRouter, openapi::OpenApi, scalar::Scalar};
use axum::{response::IntoResponse, routing::get, Extension, Json};

use crate::types::Environment;

/// Scalar UI and the raw document; mounted only where the environment shows docs
pub fn handler(environment: &Environment) -> ApiRouter {
    if !environment.show_api_docs() {
        return ApiRouter::new();
    }

    let scalar = Scalar::new("/openapi.json").with_title("Chug Leaderboard API");

    ApiRouter::new()
        .route("/docs", scalar.axum_route())
        .route("/openapi.json", get(openapi_schema))
}

#[allow(clippy::unused_async)]
async fn openapi_schema(Extension(openapi): Extension<OpenApi>) -> impl IntoResponse {
    Json(openapi)
}
