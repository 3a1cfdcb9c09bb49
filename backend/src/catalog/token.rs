//! OAuth client-credentials exchange for the Admin API

use std::fmt;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};

use crate::credentials::{CredentialError, CredentialIssuer, Grant, Lifetime};

const PLATFORM: &str = "Shopify";

/// Admin API access token
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// The raw token value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AccessToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(..)")
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchanges the app's client id and secret for an access token
pub struct ShopifyTokenExchange {
    http_client: ClientWithMiddleware,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl ShopifyTokenExchange {
    /// Creates an exchange against `<store base URL>/admin/oauth/access_token`
    #[must_use]
    pub fn new(
        http_client: ClientWithMiddleware,
        store_base_url: &str,
        client_id: String,
        client_secret: String,
    ) -> Self {
        Self {
            http_client,
            token_url: format!(
                "{}/admin/oauth/access_token",
                store_base_url.trim_end_matches('/')
            ),
            client_id,
            client_secret,
        }
    }
}

#[async_trait]
impl CredentialIssuer<AccessToken> for ShopifyTokenExchange {
    async fn issue(&self) -> Result<Grant<AccessToken>, CredentialError> {
        let response = self
            .http_client
            .post(&self.token_url)
            .json(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                grant_type: "client_credentials",
            })
            .send()
            .await
            .map_err(|e| CredentialError::Transport {
                platform: PLATFORM,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected {
                platform: PLATFORM,
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| CredentialError::InvalidResponse {
                    platform: PLATFORM,
                    message: e.to_string(),
                })?;

        Ok(Grant {
            credential: AccessToken(token.access_token),
            lifetime: token
                .expires_in
                .map_or(Lifetime::Unknown, Lifetime::ExpiresIn),
        })
    }
}
