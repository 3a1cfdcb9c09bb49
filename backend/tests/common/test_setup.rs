use axum::{body::Body, http::Request, response::Response, Router};
use chug_backend::{
    catalog::{mock::MockCatalog, MetaobjectRecord, LEADERBOARD_ENTRY_TYPE},
    object_storage::mock::MockObjectStorage,
    server,
    types::Environment,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use std::sync::Arc;
use tower::ServiceExt;

/// Timestamp the mock storage stamps on every key
pub const UPLOAD_TIMESTAMP_MS: i64 = 1_718_000_000_000;

/// Installs a debug-level tracing subscriber once per test binary
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Router wired to in-memory upstreams
pub struct TestSetup {
    pub router: Router,
    pub object_storage: Arc<MockObjectStorage>,
    pub catalog: Arc<MockCatalog>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::with_upstreams(
            MockObjectStorage::new(UPLOAD_TIMESTAMP_MS),
            MockCatalog::new(),
        )
    }

    pub fn with_upstreams(object_storage: MockObjectStorage, catalog: MockCatalog) -> Self {
        setup_test_env();

        let object_storage = Arc::new(object_storage);
        let catalog = Arc::new(catalog);

        let router = server::build_router(
            Environment::Development,
            object_storage.clone(),
            catalog.clone(),
        );

        Self {
            router,
            object_storage,
            catalog,
        }
    }

    /// Seeds a leaderboard entry
    pub fn insert_entry(&self, id: &str, fields: &[(&str, &str)]) {
        self.catalog.insert(LEADERBOARD_ENTRY_TYPE, entry(id, fields));
    }

    pub async fn send_request(
        &self,
        request: Request<Body>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_json_request(
        &self,
        method: &str,
        route: &str,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method(method)
            .header("Host", "relay.test")
            .header("Content-Type", "application/json")
            .body(Body::from(payload.to_string()))?;

        self.send_request(request).await
    }

    pub async fn send_form_request(
        &self,
        route: &str,
        form: &[(&str, &str)],
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let body = form
            .iter()
            .map(|(key, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(key, NON_ALPHANUMERIC),
                    utf8_percent_encode(value, NON_ALPHANUMERIC)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(body))?;

        self.send_request(request).await
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;

        self.send_request(request).await
    }
}

pub async fn parse_response_body(response: Response) -> serde_json::Value {
    use http_body_util::BodyExt;

    let body = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();
    serde_json::from_slice(&body).expect("Response body is not JSON")
}

pub fn entry(id: &str, fields: &[(&str, &str)]) -> MetaobjectRecord {
    MetaobjectRecord {
        id: format!("gid://shopify/Metaobject/{id}"),
        handle: format!("beer-leaderboard-entry-{id}"),
        fields: fields
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
    }
}
