mod admin;
mod docs;
mod health;
mod leaderboard;
mod submissions;
pub mod uploads;

use aide::axum::{
    routing::{get, patch, post},
    ApiRouter,
};
use axum::{extract::DefaultBodyLimit, routing};

use crate::types::Environment;

/// Creates the router with all handler routes
pub fn handler(environment: &Environment) -> ApiRouter {
    ApiRouter::new()
        .merge(docs::handler(environment))
        .api_route("/health", get(health::handler))
        .api_route("/get-upload-url", post(uploads::issue_upload_url))
        // Raw-body proxy routes; keys contain `/`, so they take the rest of the path
        .route(
            "/upload/{*key}",
            routing::put(uploads::upload_file)
                .layer(DefaultBodyLimit::max(uploads::MAX_UPLOAD_BYTES)),
        )
        .route("/delete/{*key}", routing::delete(uploads::delete_file))
        .api_route("/submit-chug", post(submissions::submit_chug))
        .api_route(
            "/leaderboard/{leaderboard_type}",
            get(leaderboard::by_type),
        )
        .api_route(
            "/whitelabel/name/{leaderboard_name}",
            get(leaderboard::by_name),
        )
        .api_route("/admin/unverified", get(admin::next_unverified))
        .api_route("/admin/submission/{id}", patch(admin::update_submission))
        .api_route("/admin/verify/{id}", post(admin::verify_submission))
}
