use std::sync::Arc;

use chug_backend::{
    catalog::{ShopifyClient, ShopifyTokenExchange},
    credentials::{CredentialCache, SystemClock},
    http_client,
    object_storage::{B2Authorizer, B2Client, B2Config},
    server,
    types::Environment,
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(environment.tracing_level().as_str()));

    // JSON logs for staging/production, human-readable for development
    match environment {
        Environment::Production | Environment::Staging => {
            fmt().json().with_env_filter(env_filter).init();
        }
        Environment::Development => {
            fmt().with_env_filter(env_filter).init();
        }
    }

    let http = http_client::shared();
    let store_url = environment.shopify_store_url();

    let credentials = Arc::new(CredentialCache::new(
        Arc::new(SystemClock),
        Arc::new(B2Authorizer::new(
            http.clone(),
            environment.b2_auth_url(),
            environment.b2_key_id(),
            environment.b2_application_key(),
        )),
        Arc::new(ShopifyTokenExchange::new(
            http.clone(),
            &store_url,
            environment.shopify_client_id(),
            environment.shopify_client_secret(),
        )),
    ));

    let object_storage = Arc::new(B2Client::new(
        http.clone(),
        B2Config {
            bucket_id: environment.b2_bucket_id(),
            bucket_name: environment.b2_bucket_name(),
        },
        credentials.clone(),
    ));

    let catalog = Arc::new(ShopifyClient::new(
        http,
        &store_url,
        &environment.shopify_api_version(),
        credentials,
    ));

    server::start(environment, object_storage, catalog).await
}
