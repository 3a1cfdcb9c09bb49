//! Outbound HTTP client shared by the upstream integrations

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_tracing::TracingMiddleware;

/// Default request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of idle connections to maintain per host
const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 10;

/// Shared HTTP client with connection pooling for all upstream requests.
/// Every request gets a tracing span through `reqwest-tracing`.
static HTTP_CLIENT: LazyLock<ClientWithMiddleware> = LazyLock::new(|| {
    let client = Client::builder()
        .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
        .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
        .user_agent(format!("chug-backend/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create HTTP client");

    ClientBuilder::new(client)
        .with(TracingMiddleware::default())
        .build()
});

/// Returns a handle to the shared client
#[must_use]
pub fn shared() -> ClientWithMiddleware {
    HTTP_CLIENT.clone()
}
