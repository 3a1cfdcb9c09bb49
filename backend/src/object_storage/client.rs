//! B2 native API client

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::{header, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use serde::{de::DeserializeOwned, Serialize};

use super::{
    encode_b2_file_name, proxy_upload_url, public_url, submission_key,
    wire::{
        describe_failure, AuthorizeAccountResponse, DeleteFileVersionRequest,
        GetUploadUrlRequest, GetUploadUrlResponse, ListFileNamesRequest, ListFileNamesResponse,
    },
    ObjectStorage, ObjectStorageError, ObjectStorageResult, StorageSession, UploadTarget,
};
use crate::credentials::{CredentialCache, CredentialError, CredentialIssuer, Grant, Lifetime};

const PLATFORM: &str = "Backblaze B2";

/// Content type B2 infers from the file name
const AUTO_CONTENT_TYPE: &str = "b2/x-auto";

/// Whole-request limit for `b2_upload_file` bodies of up to 100 MB; overrides the shared
/// client's API-call timeout
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Bucket the client reads and writes
#[derive(Debug, Clone)]
pub struct B2Config {
    /// Bucket identifier used in API calls
    pub bucket_id: String,
    /// Bucket name used in public download URLs
    pub bucket_name: String,
}

/// Authorizes the B2 account with an application key
pub struct B2Authorizer {
    http_client: ClientWithMiddleware,
    auth_url: String,
    key_id: String,
    application_key: String,
}

impl B2Authorizer {
    /// Creates an authorizer against `auth_url` (normally `https://api.backblazeb2.com`)
    #[must_use]
    pub const fn new(
        http_client: ClientWithMiddleware,
        auth_url: String,
        key_id: String,
        application_key: String,
    ) -> Self {
        Self {
            http_client,
            auth_url,
            key_id,
            application_key,
        }
    }
}

#[async_trait]
impl CredentialIssuer<StorageSession> for B2Authorizer {
    async fn issue(&self) -> Result<Grant<StorageSession>, CredentialError> {
        let url = format!(
            "{}/b2api/v2/b2_authorize_account",
            self.auth_url.trim_end_matches('/')
        );

        let response = self
            .http_client
            .get(url)
            .basic_auth(&self.key_id, Some(&self.application_key))
            .send()
            .await
            .map_err(|e| CredentialError::Transport {
                platform: PLATFORM,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Rejected {
                platform: PLATFORM,
                status: status.as_u16(),
                message: describe_failure(status.as_u16(), &body),
            });
        }

        let account: AuthorizeAccountResponse =
            response
                .json()
                .await
                .map_err(|e| CredentialError::InvalidResponse {
                    platform: PLATFORM,
                    message: e.to_string(),
                })?;

        Ok(Grant {
            credential: StorageSession {
                authorization_token: account.authorization_token,
                api_url: account.api_url,
                download_url: account.download_url,
            },
            lifetime: Lifetime::Indefinite,
        })
    }
}

/// Object storage backed by a single B2 bucket
pub struct B2Client {
    http_client: ClientWithMiddleware,
    config: B2Config,
    credentials: Arc<CredentialCache>,
}

impl B2Client {
    /// Creates a new B2 client; the session is authorized lazily through `credentials`
    #[must_use]
    pub const fn new(
        http_client: ClientWithMiddleware,
        config: B2Config,
        credentials: Arc<CredentialCache>,
    ) -> Self {
        Self {
            http_client,
            config,
            credentials,
        }
    }

    /// Calls `b2api/v2/<operation>` with a JSON body.
    ///
    /// A `401` drops the cached session so the next request re-authorizes; the failing
    /// call itself is not retried.
    async fn api_call<B, R>(
        &self,
        session: &StorageSession,
        operation: &str,
        body: &B,
    ) -> Result<R, String>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!(
            "{}/b2api/v2/{operation}",
            session.api_url.trim_end_matches('/')
        );

        let response = self
            .http_client
            .post(url)
            .header(header::AUTHORIZATION, &session.authorization_token)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("{operation} request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.credentials.invalidate_object_storage_session().await;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(format!(
                "{operation}: {}",
                describe_failure(status.as_u16(), &body)
            ));
        }

        response
            .json()
            .await
            .map_err(|e| format!("{operation} returned an invalid body: {e}"))
    }
}

#[async_trait]
impl ObjectStorage for B2Client {
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

        let session = self.credentials.object_storage_session().await?;
        let timestamp_ms = self.credentials.clock().now().timestamp_millis();
        let key = submission_key(timestamp_ms, filename);

        tracing::debug!("Issued upload target for key: {key}");

        Ok(UploadTarget {
            upload_url: proxy_upload_url(public_base, &key),
            public_url: public_url(&session.download_url, &self.config.bucket_name, &key),
            key,
        })
    }

    async fn upload_file(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> ObjectStorageResult<String> {
        let session = self.credentials.object_storage_session().await?;

        let target: GetUploadUrlResponse = self
            .api_call(
                &session,
                "b2_get_upload_url",
                &GetUploadUrlRequest {
                    bucket_id: &self.config.bucket_id,
                },
            )
            .await
            .map_err(ObjectStorageError::Upload)?;

        let content_type = if content_type.trim().is_empty() {
            AUTO_CONTENT_TYPE
        } else {
            content_type
        };
        let content_length = body.len();

        let response = self
            .http_client
            .post(&target.upload_url)
            .header(header::AUTHORIZATION, &target.authorization_token)
            .header("X-Bz-File-Name", encode_b2_file_name(key))
            .header(header::CONTENT_TYPE, content_type)
            .header("X-Bz-Content-Sha1", "do_not_verify")
            .timeout(UPLOAD_TIMEOUT)
            .body(body)
            .send()
            .await
            .map_err(|e| ObjectStorageError::Upload(format!("b2_upload_file request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ObjectStorageError::Upload(format!(
                "b2_upload_file: {}",
                describe_failure(status.as_u16(), &body)
            )));
        }

        tracing::info!("Uploaded {content_length} bytes to {key}");

        Ok(public_url(
            &session.download_url,
            &self.config.bucket_name,
            key,
        ))
    }

    async fn delete_file(&self, key: &str) -> ObjectStorageResult<()> {
        let session = self.credentials.object_storage_session().await?;

        let listing: ListFileNamesResponse = self
            .api_call(
                &session,
                "b2_list_file_names",
                &ListFileNamesRequest {
                    bucket_id: &self.config.bucket_id,
                    start_file_name: key,
                    prefix: key,
                    max_file_count: 1,
                },
            )
            .await
            .map_err(ObjectStorageError::Upstream)?;

        let file = listing
            .files
            .into_iter()
            .find(|file| file.file_name == key)
            .ok_or_else(|| ObjectStorageError::NotFound(key.to_string()))?;

        self.api_call::<_, serde_json::Value>(
            &session,
            "b2_delete_file_version",
            &DeleteFileVersionRequest {
                file_name: &file.file_name,
                file_id: &file.file_id,
            },
        )
        .await
        .map_err(ObjectStorageError::Upstream)?;

        tracing::info!("Deleted {key} ({})", file.file_id);
        Ok(())
    }
}
