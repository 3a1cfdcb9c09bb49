//! Admin GraphQL API client

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest_middleware::ClientWithMiddleware;
use serde::{de::DeserializeOwned, Serialize};

use super::{
    graphql::{
        field_pairs, CreateData, CreateInput, CreateVariables, GraphqlRequest, GraphqlResponse,
        QueryData, QueryVariables, UpdateData, UpdateInput, UpdateVariables, METAOBJECTS_QUERY,
        METAOBJECT_CREATE, METAOBJECT_UPDATE,
    },
    Catalog, CatalogError, CatalogResult, CreatedMetaobject, Fields, MetaobjectRecord,
};
use crate::credentials::CredentialCache;

/// Header carrying the Admin API access token
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Metaobject store backed by the Shopify Admin GraphQL API
pub struct ShopifyClient {
    http_client: ClientWithMiddleware,
    graphql_url: String,
    credentials: Arc<CredentialCache>,
}

impl ShopifyClient {
    /// Creates a client for `<store base URL>/admin/api/<api_version>/graphql.json`
    #[must_use]
    pub fn new(
        http_client: ClientWithMiddleware,
        store_base_url: &str,
        api_version: &str,
        credentials: Arc<CredentialCache>,
    ) -> Self {
        Self {
            http_client,
            graphql_url: format!(
                "{}/admin/api/{api_version}/graphql.json",
                store_base_url.trim_end_matches('/')
            ),
            credentials,
        }
    }

    /// Runs one GraphQL document and returns its `data`.
    ///
    /// A `401` drops the cached token so the next request exchanges a new one.
    async fn execute<V, T>(&self, query: &str, variables: V) -> CatalogResult<T>
    where
        V: Serialize + Send + Sync,
        T: DeserializeOwned + Send,
    {
        let token = self.credentials.catalog_token().await?;

        let response = self
            .http_client
            .post(&self.graphql_url)
            .header(ACCESS_TOKEN_HEADER, token.as_str())
            .json(&GraphqlRequest { query, variables })
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.credentials.invalidate_catalog_token().await;
            }
            let body = response.text().await.unwrap_or_default();
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GraphqlResponse<T> = response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))?;

        if !payload.errors.is_empty() {
            return Err(CatalogError::Graphql(payload.errors));
        }

        payload.data.ok_or(CatalogError::MissingPayload("data"))
    }
}

#[async_trait]
impl Catalog for ShopifyClient {
    async fn create(
        &self,
        object_type: &str,
        fields: &Fields,
    ) -> CatalogResult<CreatedMetaobject> {
        let data: CreateData = self
            .execute(
                METAOBJECT_CREATE,
                CreateVariables {
                    metaobject: CreateInput {
                        object_type,
                        fields: field_pairs(fields),
                    },
                },
            )
            .await?;

        let payload = data
            .metaobject_create
            .ok_or(CatalogError::MissingPayload("metaobjectCreate"))?;
        if !payload.user_errors.is_empty() {
            return Err(CatalogError::UserErrors(payload.user_errors));
        }
        let created = payload
            .metaobject
            .ok_or(CatalogError::MissingPayload("metaobjectCreate.metaobject"))?;

        tracing::info!("Created {object_type} metaobject {}", created.id);

        Ok(CreatedMetaobject {
            id: created.id,
            handle: created.handle,
        })
    }

    async fn query(&self, object_type: &str, page_size: u32) -> CatalogResult<Vec<MetaobjectRecord>> {
        let data: QueryData = self
            .execute(
                METAOBJECTS_QUERY,
                QueryVariables {
                    object_type,
                    first: page_size,
                },
            )
            .await?;

        let records: Vec<MetaobjectRecord> = data
            .metaobjects
            .ok_or(CatalogError::MissingPayload("metaobjects"))?
            .nodes
            .into_iter()
            .map(MetaobjectRecord::from)
            .collect();

        // Only one page is fetched; anything past `page_size` is not visible to callers
        if records.len() >= page_size as usize {
            tracing::warn!(
                "{object_type} query returned a full page of {page_size}; later records are not fetched"
            );
        }

        Ok(records)
    }

    async fn update(&self, id: &str, fields: &Fields) -> CatalogResult<MetaobjectRecord> {
        let data: UpdateData = self
            .execute(
                METAOBJECT_UPDATE,
                UpdateVariables {
                    id,
                    metaobject: UpdateInput {
                        fields: field_pairs(fields),
                    },
                },
            )
            .await?;

        let payload = data
            .metaobject_update
            .ok_or(CatalogError::MissingPayload("metaobjectUpdate"))?;
        if !payload.user_errors.is_empty() {
            return Err(CatalogError::UserErrors(payload.user_errors));
        }
        let updated = payload
            .metaobject
            .ok_or(CatalogError::MissingPayload("metaobjectUpdate.metaobject"))?;

        tracing::info!("Updated metaobject {id}");

        Ok(updated.into())
    }
}
