//! In-process credential leases for the two upstream platforms.
//!
//! The relay holds exactly two bearer credentials: the object storage session and the
//! catalog access token. Both are acquired lazily on first use and replaced when they
//! are invalidated or expire. Nothing is persisted across restarts.
//!
//! The lock around each lease only guards reading and replacing the cached value. Two
//! requests that observe an expired lease at the same time will both run the exchange;
//! the last one to finish wins. Both exchanges are side-effect free for the relay.

mod error;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

pub use error::{CredentialError, CredentialResult};

use crate::{catalog::AccessToken, object_storage::StorageSession};

/// Tokens are treated as expired this long before the platform says they are
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 5 * 60;

/// Source of the current time, injected so lease expiry can be tested deterministically
pub trait Clock: Send + Sync {
    /// Current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// How long a freshly issued credential may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Valid until explicitly invalidated
    Indefinite,
    /// Valid for the given number of seconds, as reported by the platform
    ExpiresIn(i64),
    /// The platform did not say; the credential is used once and never cached as valid
    Unknown,
}

impl Lifetime {
    /// Absolute expiry for a credential issued at `issued_at`, with the safety margin applied
    #[must_use]
    pub fn expires_at(self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::Indefinite => None,
            Self::ExpiresIn(secs) => {
                let usable = secs.saturating_sub(EXPIRY_SAFETY_MARGIN_SECS).max(0);
                Some(issued_at + Duration::seconds(usable))
            }
            Self::Unknown => Some(issued_at),
        }
    }
}

/// A credential as returned by an issuer, before it is cached
#[derive(Debug, Clone)]
pub struct Grant<T> {
    /// The credential itself
    pub credential: T,
    /// How long it may be used
    pub lifetime: Lifetime,
}

/// Performs the network exchange that yields a new credential
#[async_trait]
pub trait CredentialIssuer<T>: Send + Sync {
    /// Acquire a fresh credential from the upstream platform
    async fn issue(&self) -> CredentialResult<Grant<T>>;
}

#[derive(Debug, Clone)]
struct Lease<T> {
    credential: T,
    expires_at: Option<DateTime<Utc>>,
}

impl<T> Lease<T> {
    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

struct LeaseSlot<T> {
    name: &'static str,
    issuer: Arc<dyn CredentialIssuer<T>>,
    lease: RwLock<Option<Lease<T>>>,
}

impl<T: Clone + Send + Sync> LeaseSlot<T> {
    fn new(name: &'static str, issuer: Arc<dyn CredentialIssuer<T>>) -> Self {
        Self {
            name,
            issuer,
            lease: RwLock::new(None),
        }
    }

    async fn get(&self, clock: &dyn Clock) -> CredentialResult<T> {
        if let Some(lease) = self.lease.read().await.as_ref() {
            if lease.is_valid_at(clock.now()) {
                tracing::debug!("Using cached {} credential", self.name);
                return Ok(lease.credential.clone());
            }
        }

        tracing::info!("Acquiring {} credential", self.name);
        let grant = self.issuer.issue().await.inspect_err(|e| {
            tracing::error!("Failed to acquire {} credential: {e}", self.name);
        })?;

        let lease = Lease {
            expires_at: grant.lifetime.expires_at(clock.now()),
            credential: grant.credential,
        };
        let credential = lease.credential.clone();

        if let Some(expires_at) = lease.expires_at {
            tracing::info!("{} credential valid until {expires_at}", self.name);
        }
        *self.lease.write().await = Some(lease);

        Ok(credential)
    }

    async fn invalidate(&self) {
        if self.lease.write().await.take().is_some() {
            tracing::info!("Invalidated cached {} credential", self.name);
        }
    }
}

/// Process-wide holder of the object storage session and the catalog access token
pub struct CredentialCache {
    clock: Arc<dyn Clock>,
    object_storage: LeaseSlot<StorageSession>,
    catalog: LeaseSlot<AccessToken>,
}

impl CredentialCache {
    /// Creates an empty cache; nothing is fetched until the first call
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        object_storage_issuer: Arc<dyn CredentialIssuer<StorageSession>>,
        catalog_issuer: Arc<dyn CredentialIssuer<AccessToken>>,
    ) -> Self {
        Self {
            clock,
            object_storage: LeaseSlot::new("object storage", object_storage_issuer),
            catalog: LeaseSlot::new("catalog", catalog_issuer),
        }
    }

    /// The clock leases are evaluated against
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Returns the authorized object storage session, authorizing on first use.
    ///
    /// Once authorized, the session is returned regardless of its age until
    /// [`Self::invalidate_object_storage_session`] is called.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError` if the authorize call fails
    pub async fn object_storage_session(&self) -> CredentialResult<StorageSession> {
        self.object_storage.get(self.clock.as_ref()).await
    }

    /// Returns a catalog access token that is valid now, exchanging client credentials
    /// when the cached token is missing or past its (early) expiry.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError` if the token exchange fails
    pub async fn catalog_token(&self) -> CredentialResult<AccessToken> {
        self.catalog.get(self.clock.as_ref()).await
    }

    /// Drops the object storage session so the next call re-authorizes
    pub async fn invalidate_object_storage_session(&self) {
        self.object_storage.invalidate().await;
    }

    /// Drops the catalog token so the next call re-exchanges
    pub async fn invalidate_catalog_token(&self) {
        self.catalog.invalidate().await;
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Deterministic clock and counting issuers for tests

    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use super::{
        async_trait, Clock, CredentialError, CredentialIssuer, CredentialResult, DateTime,
        Duration, Grant, Lifetime, Utc,
    };

    /// A clock that only moves when told to
    pub struct FakeClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FakeClock {
        /// Creates a clock frozen at `now`
        #[must_use]
        pub const fn new(now: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(now),
            }
        }

        /// Moves the clock forward
        ///
        /// # Panics
        ///
        /// Panics if the inner mutex is poisoned
        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    /// Issues numbered credentials and counts how often it was asked
    pub struct CountingIssuer {
        lifetime: Lifetime,
        fail_with_status: Option<u16>,
        calls: AtomicUsize,
    }

    impl CountingIssuer {
        /// Issuer whose credentials live for `lifetime`
        #[must_use]
        pub const fn new(lifetime: Lifetime) -> Self {
            Self {
                lifetime,
                fail_with_status: None,
                calls: AtomicUsize::new(0),
            }
        }

        /// Issuer that is always rejected with `status`
        #[must_use]
        pub const fn failing(status: u16) -> Self {
            Self {
                lifetime: Lifetime::Indefinite,
                fail_with_status: Some(status),
                calls: AtomicUsize::new(0),
            }
        }

        /// Number of exchanges performed so far
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl<T: From<String> + Send> CredentialIssuer<T> for CountingIssuer {
        async fn issue(&self) -> CredentialResult<Grant<T>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(status) = self.fail_with_status {
                return Err(CredentialError::Rejected {
                    platform: "test",
                    status,
                    message: "denied".to_string(),
                });
            }
            Ok(Grant {
                credential: T::from(format!("credential-{call}")),
                lifetime: self.lifetime,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{CountingIssuer, FakeClock};
    use super::*;

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn cache(
        clock: Arc<FakeClock>,
        storage: Arc<CountingIssuer>,
        catalog: Arc<CountingIssuer>,
    ) -> CredentialCache {
        CredentialCache::new(clock, storage, catalog)
    }

    #[test]
    fn test_lifetime_applies_safety_margin() {
        let now = start();
        assert_eq!(
            Lifetime::ExpiresIn(3600).expires_at(now),
            Some(now + Duration::seconds(3300))
        );
        assert_eq!(Lifetime::ExpiresIn(120).expires_at(now), Some(now));
        assert_eq!(Lifetime::Unknown.expires_at(now), Some(now));
        assert_eq!(Lifetime::Indefinite.expires_at(now), None);
    }

    #[tokio::test]
    async fn test_catalog_token_cached_within_window() {
        let clock = Arc::new(FakeClock::new(start()));
        let catalog = Arc::new(CountingIssuer::new(Lifetime::ExpiresIn(3600)));
        let cache = cache(
            clock.clone(),
            Arc::new(CountingIssuer::new(Lifetime::Indefinite)),
            catalog.clone(),
        );

        let first = cache.catalog_token().await.unwrap();
        clock.advance(Duration::seconds(3299));
        let second = cache.catalog_token().await.unwrap();

        assert_eq!(catalog.calls(), 1);
        assert_eq!(first.as_str(), second.as_str());
    }

    #[tokio::test]
    async fn test_catalog_token_refreshed_after_expiry() {
        let clock = Arc::new(FakeClock::new(start()));
        let catalog = Arc::new(CountingIssuer::new(Lifetime::ExpiresIn(3600)));
        let cache = cache(
            clock.clone(),
            Arc::new(CountingIssuer::new(Lifetime::Indefinite)),
            catalog.clone(),
        );

        cache.catalog_token().await.unwrap();
        // Exactly at the margin-adjusted expiry the token is no longer usable
        clock.advance(Duration::seconds(3300));
        let refreshed = cache.catalog_token().await.unwrap();

        assert_eq!(catalog.calls(), 2);
        assert_eq!(refreshed.as_str(), "credential-2");
    }

    #[tokio::test]
    async fn test_catalog_token_without_lifetime_is_never_reused() {
        let clock = Arc::new(FakeClock::new(start()));
        let catalog = Arc::new(CountingIssuer::new(Lifetime::Unknown));
        let cache = cache(
            clock,
            Arc::new(CountingIssuer::new(Lifetime::Indefinite)),
            catalog.clone(),
        );

        cache.catalog_token().await.unwrap();
        cache.catalog_token().await.unwrap();

        assert_eq!(catalog.calls(), 2);
    }

    #[tokio::test]
    async fn test_storage_session_authorized_once_regardless_of_age() {
        let clock = Arc::new(FakeClock::new(start()));
        let storage = Arc::new(CountingIssuer::new(Lifetime::Indefinite));
        let cache = cache(
            clock.clone(),
            storage.clone(),
            Arc::new(CountingIssuer::new(Lifetime::ExpiresIn(3600))),
        );

        cache.object_storage_session().await.unwrap();
        clock.advance(Duration::days(30));
        cache.object_storage_session().await.unwrap();

        assert_eq!(storage.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalidated_session_is_reauthorized() {
        let clock = Arc::new(FakeClock::new(start()));
        let storage = Arc::new(CountingIssuer::new(Lifetime::Indefinite));
        let cache = cache(
            clock,
            storage.clone(),
            Arc::new(CountingIssuer::new(Lifetime::ExpiresIn(3600))),
        );

        cache.object_storage_session().await.unwrap();
        cache.invalidate_object_storage_session().await;
        let session = cache.object_storage_session().await.unwrap();

        assert_eq!(storage.calls(), 2);
        assert_eq!(session.authorization_token, "credential-2");
    }

    #[tokio::test]
    async fn test_failed_exchange_propagates_and_is_not_cached() {
        let clock = Arc::new(FakeClock::new(start()));
        let catalog = Arc::new(CountingIssuer::failing(401));
        let cache = cache(
            clock,
            Arc::new(CountingIssuer::new(Lifetime::Indefinite)),
            catalog.clone(),
        );

        let err = cache.catalog_token().await.unwrap_err();
        assert_eq!(err.upstream_status(), Some(401));

        cache.catalog_token().await.unwrap_err();
        assert_eq!(catalog.calls(), 2);
    }
}
