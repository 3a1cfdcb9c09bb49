//! Schema-less record storage on the catalog platform (Shopify metaobjects).
//!
//! On the wire a metaobject carries an ordered list of `{key, value}` string pairs. This
//! module exposes it as a flat string map on both read and write.

mod client;
mod error;
mod graphql;
mod token;

use async_trait::async_trait;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use client::ShopifyClient;
pub use error::{CatalogError, CatalogResult};
pub use graphql::{GraphqlError, UserError};
pub use token::{AccessToken, ShopifyTokenExchange};

/// Metaobject type holding public leaderboard submissions
pub const LEADERBOARD_ENTRY_TYPE: &str = "beer_leaderboard_entry";

const METAOBJECT_GID_PREFIX: &str = "gid://shopify/Metaobject/";

/// Flat key/value view of a metaobject's fields, in catalog order
pub type Fields = IndexMap<String, String>;

/// Expands a bare numeric metaobject id into its global id; global ids pass through
#[must_use]
pub fn metaobject_gid(id: &str) -> String {
    if id.starts_with("gid://") {
        id.to_string()
    } else {
        format!("{METAOBJECT_GID_PREFIX}{id}")
    }
}

/// One metaobject as read from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MetaobjectRecord {
    /// Global id (`gid://shopify/Metaobject/...`)
    pub id: String,
    /// Human-readable handle
    pub handle: String,
    /// Field values by key
    pub fields: Fields,
}

/// Identity of a newly created metaobject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CreatedMetaobject {
    /// Global id
    pub id: String,
    /// Human-readable handle
    pub handle: String,
}

/// Generic metaobject operations
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Creates a metaobject of `object_type` with `fields`
    async fn create(&self, object_type: &str, fields: &Fields)
        -> CatalogResult<CreatedMetaobject>;

    /// Fetches the first `page_size` metaobjects of `object_type`. Cursors are not
    /// followed, so records past the first page are not returned.
    async fn query(&self, object_type: &str, page_size: u32) -> CatalogResult<Vec<MetaobjectRecord>>;

    /// Overwrites only the supplied `fields` of metaobject `id`
    async fn update(&self, id: &str, fields: &Fields) -> CatalogResult<MetaobjectRecord>;
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! In-memory catalog for handler tests

    use std::sync::Mutex;

    use super::{
        async_trait, Catalog, CatalogError, CatalogResult, CreatedMetaobject, Fields,
        MetaobjectRecord, UserError,
    };

    /// Keeps metaobjects in insertion order and records every update it receives
    #[derive(Default)]
    pub struct MockCatalog {
        records: Mutex<Vec<(String, MetaobjectRecord)>>,
        updates: Mutex<Vec<(String, Fields)>>,
        unavailable: bool,
    }

    impl MockCatalog {
        /// Empty catalog
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Catalog whose every call fails upstream
        #[must_use]
        pub fn unavailable() -> Self {
            Self {
                unavailable: true,
                ..Self::default()
            }
        }

        /// Seeds a record of `object_type`
        ///
        /// # Panics
        ///
        /// Panics if the inner mutex is poisoned
        pub fn insert(&self, object_type: &str, record: MetaobjectRecord) {
            self.records
                .lock()
                .unwrap()
                .push((object_type.to_string(), record));
        }

        /// Record with the given id
        ///
        /// # Panics
        ///
        /// Panics if the inner mutex is poisoned
        pub fn get(&self, id: &str) -> Option<MetaobjectRecord> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .find(|(_, record)| record.id == id)
                .map(|(_, record)| record.clone())
        }

        /// Every `(id, fields)` pair passed to `update`, in call order
        ///
        /// # Panics
        ///
        /// Panics if the inner mutex is poisoned
        pub fn updates(&self) -> Vec<(String, Fields)> {
            self.updates.lock().unwrap().clone()
        }

        fn check_available(&self) -> CatalogResult<()> {
            if self.unavailable {
                return Err(CatalogError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Catalog for MockCatalog {
        async fn create(
            &self,
            object_type: &str,
            fields: &Fields,
        ) -> CatalogResult<CreatedMetaobject> {
            self.check_available()?;
            let mut records = self.records.lock().unwrap();
            let n = records.len() + 1;
            let record = MetaobjectRecord {
                id: format!("{}{n}", super::METAOBJECT_GID_PREFIX),
                handle: format!("{}-{n}", object_type.replace('_', "-")),
                fields: fields.clone(),
            };
            records.push((object_type.to_string(), record.clone()));
            Ok(CreatedMetaobject {
                id: record.id,
                handle: record.handle,
            })
        }

        async fn query(
            &self,
            object_type: &str,
            page_size: u32,
        ) -> CatalogResult<Vec<MetaobjectRecord>> {
            self.check_available()?;
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _)| t == object_type)
                .take(page_size as usize)
                .map(|(_, record)| record.clone())
                .collect())
        }

        async fn update(&self, id: &str, fields: &Fields) -> CatalogResult<MetaobjectRecord> {
            self.check_available()?;
            self.updates
                .lock()
                .unwrap()
                .push((id.to_string(), fields.clone()));

            let mut records = self.records.lock().unwrap();
            let (_, record) = records
                .iter_mut()
                .find(|(_, record)| record.id == id)
                .ok_or_else(|| {
                    CatalogError::UserErrors(vec![UserError {
                        field: Some(vec!["id".to_string()]),
                        message: "Record not found".to_string(),
                        code: Some("RECORD_NOT_FOUND".to_string()),
                    }])
                })?;
            record
                .fields
                .extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
            Ok(record.clone())
        }
    }
}
