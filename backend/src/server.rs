use std::sync::Arc;

use aide::openapi::{Info, OpenApi};
use axum::{
    http::{HeaderValue, Method},
    Extension, Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    catalog::Catalog,
    object_storage::ObjectStorage,
    routes::{self, uploads::PublicBaseUrl},
    types::Environment,
};

/// Browser access for the storefront theme
fn cors_layer(environment: &Environment) -> CorsLayer {
    let allow_origin = match environment.allowed_origin() {
        Some(origin) => match HeaderValue::from_str(&origin) {
            Ok(origin) => AllowOrigin::exact(origin),
            Err(_) => {
                tracing::warn!("ALLOWED_ORIGIN is not a valid header value, ignoring it");
                AllowOrigin::list([])
            }
        },
        None if matches!(environment, Environment::Development) => AllowOrigin::from(Any),
        None => AllowOrigin::list([]),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
}

/// Builds the application router around the given upstream clients
pub fn build_router(
    environment: Environment,
    object_storage: Arc<dyn ObjectStorage>,
    catalog: Arc<dyn Catalog>,
) -> Router {
    let mut openapi = OpenApi {
        info: Info {
            title: "Chug Leaderboard API".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Info::default()
        },
        ..OpenApi::default()
    };

    routes::handler(&environment)
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(PublicBaseUrl(environment.public_base_url())))
        .layer(Extension(object_storage))
        .layer(Extension(catalog))
        .layer(cors_layer(&environment))
        .layer(Extension(environment))
        .layer(TraceLayer::new_for_http())
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    object_storage: Arc<dyn ObjectStorage>,
    catalog: Arc<dyn Catalog>,
) -> anyhow::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], environment.port()));
    let router = build_router(environment, object_storage, catalog);

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🍺 Chug leaderboard relay started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutting down");
}
