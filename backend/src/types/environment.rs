//! Environment configuration for different deployment stages

use std::env;

use tracing::Level;

/// Default B2 account authorization endpoint
const DEFAULT_B2_AUTH_URL: &str = "https://api.backblazeb2.com";

/// Admin API version used when `SHOPIFY_API_VERSION` is not set
const DEFAULT_SHOPIFY_API_VERSION: &str = "2025-01";

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment
    Development,
}

/// Reads a variable every environment must provide
fn required(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("{name} environment variable is not set"))
}

/// Reads a variable, treating blank values as unset
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Port the server listens on
    ///
    /// # Panics
    ///
    /// Panics if `PORT` is set but is not a valid port number
    #[must_use]
    pub fn port(&self) -> u16 {
        optional("PORT").map_or(3000, |port| {
            port.parse()
                .unwrap_or_else(|_| panic!("PORT environment variable is not a valid port: {port}"))
        })
    }

    /// Origin allowed to call the API from a browser. `None` in development means any
    /// origin; `None` elsewhere means no cross-origin access.
    #[must_use]
    pub fn allowed_origin(&self) -> Option<String> {
        optional("ALLOWED_ORIGIN")
    }

    /// Origin this service is publicly reachable under, used for proxy upload URLs.
    /// When unset the origin is derived from each request's headers.
    #[must_use]
    pub fn public_base_url(&self) -> Option<String> {
        optional("PUBLIC_BASE_URL").map(|url| url.trim_end_matches('/').to_string())
    }

    /// B2 application key id
    ///
    /// # Panics
    ///
    /// Panics if the `B2_KEY_ID` environment variable is not set
    #[must_use]
    pub fn b2_key_id(&self) -> String {
        required("B2_KEY_ID")
    }

    /// B2 application key
    ///
    /// # Panics
    ///
    /// Panics if the `B2_APPLICATION_KEY` environment variable is not set
    #[must_use]
    pub fn b2_application_key(&self) -> String {
        required("B2_APPLICATION_KEY")
    }

    /// Id of the bucket submission videos are uploaded to
    ///
    /// # Panics
    ///
    /// Panics if the `B2_BUCKET_ID` environment variable is not set
    #[must_use]
    pub fn b2_bucket_id(&self) -> String {
        required("B2_BUCKET_ID")
    }

    /// Name of the bucket submission videos are uploaded to
    ///
    /// # Panics
    ///
    /// Panics if the `B2_BUCKET_NAME` environment variable is not set
    #[must_use]
    pub fn b2_bucket_name(&self) -> String {
        required("B2_BUCKET_NAME")
    }

    /// B2 account authorization endpoint
    #[must_use]
    pub fn b2_auth_url(&self) -> String {
        optional("B2_AUTH_URL").unwrap_or_else(|| DEFAULT_B2_AUTH_URL.to_string())
    }

    /// Base URL of the store's Admin API, e.g. `https://chug.myshopify.com`.
    /// A bare domain gets an `https://` scheme.
    ///
    /// # Panics
    ///
    /// Panics if the `SHOPIFY_STORE_DOMAIN` environment variable is not set
    #[must_use]
    pub fn shopify_store_url(&self) -> String {
        let domain = required("SHOPIFY_STORE_DOMAIN");
        let domain = domain.trim().trim_end_matches('/');
        if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        }
    }

    /// Client id of the custom app
    ///
    /// # Panics
    ///
    /// Panics if the `SHOPIFY_CLIENT_ID` environment variable is not set
    #[must_use]
    pub fn shopify_client_id(&self) -> String {
        required("SHOPIFY_CLIENT_ID")
    }

    /// Client secret of the custom app
    ///
    /// # Panics
    ///
    /// Panics if the `SHOPIFY_CLIENT_SECRET` environment variable is not set
    #[must_use]
    pub fn shopify_client_secret(&self) -> String {
        required("SHOPIFY_CLIENT_SECRET")
    }

    /// Admin API version
    #[must_use]
    pub fn shopify_api_version(&self) -> String {
        optional("SHOPIFY_API_VERSION").unwrap_or_else(|| DEFAULT_SHOPIFY_API_VERSION.to_string())
    }

    /// Log level used when `RUST_LOG` is not set
    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development => Level::DEBUG,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);

        env::set_var("APP_ENV", " Staging ");
        assert_eq!(Environment::from_env(), Environment::Staging);

        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_optional_settings_fall_back_to_defaults() {
        for name in ["PORT", "B2_AUTH_URL", "SHOPIFY_API_VERSION", "ALLOWED_ORIGIN"] {
            env::remove_var(name);
        }
        env::set_var("PUBLIC_BASE_URL", "  ");

        let env = Environment::Development;
        assert_eq!(env.port(), 3000);
        assert_eq!(env.b2_auth_url(), "https://api.backblazeb2.com");
        assert_eq!(env.shopify_api_version(), "2025-01");
        assert_eq!(env.allowed_origin(), None);
        assert_eq!(env.public_base_url(), None);

        env::remove_var("PUBLIC_BASE_URL");
    }

    #[test]
    #[serial]
    fn test_store_domain_gets_https_scheme() {
        env::set_var("SHOPIFY_STORE_DOMAIN", "chug.myshopify.com/");
        assert_eq!(
            Environment::Production.shopify_store_url(),
            "https://chug.myshopify.com"
        );

        env::set_var("SHOPIFY_STORE_DOMAIN", "http://127.0.0.1:1234");
        assert_eq!(
            Environment::Production.shopify_store_url(),
            "http://127.0.0.1:1234"
        );

        env::remove_var("SHOPIFY_STORE_DOMAIN");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "B2_BUCKET_ID environment variable is not set")]
    fn test_missing_required_variable_panics() {
        env::remove_var("B2_BUCKET_ID");
        let _ = Environment::Production.b2_bucket_id();
    }
}
