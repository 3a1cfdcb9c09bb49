//! Backblaze B2 storage for submission videos.
//!
//! Clients never talk to B2 directly: they ask for an upload target, `PUT` the bytes to
//! this service's `/upload/{key}` proxy, and link the public download URL in their
//! submission.

mod client;
mod error;
mod wire;

use async_trait::async_trait;
use axum::body::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

pub use client::{B2Authorizer, B2Client, B2Config};
pub use error::{ObjectStorageError, ObjectStorageResult};

/// Prefix of every submission video key
pub const SUBMISSIONS_PREFIX: &str = "submissions/";

/// Characters left alone by `encodeURIComponent`
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Characters left alone in a B2 `X-Bz-File-Name` header
const B2_FILE_NAME: &AsciiSet = &URI_COMPONENT.remove(b'/');

/// Authorized B2 account context required by every storage call
#[derive(Debug, Clone)]
pub struct StorageSession {
    /// Account authorization token
    pub authorization_token: String,
    /// Base URL for API calls
    pub api_url: String,
    /// Base URL for public downloads
    pub download_url: String,
}

#[cfg(any(test, feature = "test-utils"))]
impl From<String> for StorageSession {
    fn from(authorization_token: String) -> Self {
        Self {
            authorization_token,
            api_url: String::new(),
            download_url: String::new(),
        }
    }
}

/// Where a client should send an upload and where the file will be served from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget {
    /// Storage key the file will be stored under
    pub key: String,
    /// Same-origin proxy URL the client `PUT`s the bytes to
    pub upload_url: String,
    /// Public download URL of the stored file
    pub public_url: String,
}

/// Object storage operations used by the upload handlers
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Allocates a storage key for `filename` and returns the URLs to upload and fetch it.
    /// `public_base` is the origin this service is reachable under.
    async fn issue_upload_target(
        &self,
        filename: &str,
        content_type: &str,
        public_base: &str,
    ) -> ObjectStorageResult<UploadTarget>;

    /// Stores `body` under `key` and returns its public URL
    async fn upload_file(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> ObjectStorageResult<String>;

    /// Deletes the file stored under `key`
    async fn delete_file(&self, key: &str) -> ObjectStorageResult<()>;
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `submissions/<unix-ms>-<sanitized filename>`
#[must_use]
pub fn submission_key(timestamp_ms: i64, filename: &str) -> String {
    format!(
        "{SUBMISSIONS_PREFIX}{timestamp_ms}-{}",
        sanitize_filename(filename)
    )
}

/// Public download URL of `key` in `bucket_name`
#[must_use]
pub fn public_url(download_url: &str, bucket_name: &str, key: &str) -> String {
    format!(
        "{}/file/{bucket_name}/{key}",
        download_url.trim_end_matches('/')
    )
}

/// Proxy upload URL for `key` on this service
#[must_use]
pub fn proxy_upload_url(public_base: &str, key: &str) -> String {
    format!(
        "{}/upload/{}",
        public_base.trim_end_matches('/'),
        utf8_percent_encode(key, URI_COMPONENT)
    )
}

/// Value of the `X-Bz-File-Name` header for `key`
#[must_use]
pub fn encode_b2_file_name(key: &str) -> String {
    utf8_percent_encode(key, B2_FILE_NAME).to_string()
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! In-memory object storage for handler tests

    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::{
        async_trait, proxy_upload_url, public_url, submission_key, Bytes, ObjectStorage,
        ObjectStorageError, ObjectStorageResult, UploadTarget,
    };

    /// Download base used for every public URL produced by the mock
    pub const MOCK_DOWNLOAD_URL: &str = "https://f000.backblazeb2.com";
    /// Bucket name used for every public URL produced by the mock
    pub const MOCK_BUCKET: &str = "chug-videos";

    /// Stores uploads in a map keyed by storage key
    pub struct MockObjectStorage {
        timestamp_ms: i64,
        fail_uploads: bool,
        files: Mutex<BTreeMap<String, (String, Vec<u8>)>>,
    }

    impl MockObjectStorage {
        /// Mock that stamps every key with `timestamp_ms`
        #[must_use]
        pub const fn new(timestamp_ms: i64) -> Self {
            Self {
                timestamp_ms,
                fail_uploads: false,
                files: Mutex::new(BTreeMap::new()),
            }
        }

        /// Mock whose uploads always fail upstream
        #[must_use]
        pub const fn failing_uploads() -> Self {
            Self {
                timestamp_ms: 0,
                fail_uploads: true,
                files: Mutex::new(BTreeMap::new()),
            }
        }

        /// Seeds a stored file
        ///
        /// # Panics
        ///
        /// Panics if the inner mutex is poisoned
        pub fn insert(&self, key: &str, content_type: &str, body: &[u8]) {
            self.files
                .lock()
                .unwrap()
                .insert(key.to_string(), (content_type.to_string(), body.to_vec()));
        }

        /// Content type and bytes stored under `key`
        ///
        /// # Panics
        ///
        /// Panics if the inner mutex is poisoned
        pub fn get(&self, key: &str) -> Option<(String, Vec<u8>)> {
            self.files.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl ObjectStorage for MockObjectStorage {
        async fn issue_upload_target(
            &self,
            filename: &str,
            content_type: &str,
            public_base: &str,
        ) -> ObjectStorageResult<UploadTarget> {
            if filename.trim().is_empty() || content_type.trim().is_empty() {
                return Err(ObjectStorageError::InvalidInput(
                    "filename and contentType are required".to_string(),
                ));
            }
            let key = submission_key(self.timestamp_ms, filename);
            Ok(UploadTarget {
                upload_url: proxy_upload_url(public_base, &key),
                public_url: public_url(MOCK_DOWNLOAD_URL, MOCK_BUCKET, &key),
                key,
            })
        }

        async fn upload_file(
            &self,
            key: &str,
            body: Bytes,
            content_type: &str,
        ) -> ObjectStorageResult<String> {
            if self.fail_uploads {
                return Err(ObjectStorageError::Upload("HTTP 503".to_string()));
            }
            self.insert(key, content_type, &body);
            Ok(public_url(MOCK_DOWNLOAD_URL, MOCK_BUCKET, key))
        }

        async fn delete_file(&self, key: &str) -> ObjectStorageResult<()> {
            self.files
                .lock()
                .unwrap()
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| ObjectStorageError::NotFound(key.to_string()))
        }
    }
}
