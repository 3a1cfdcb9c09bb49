//! GraphQL documents and wire types for Admin API metaobjects

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Fields, MetaobjectRecord};

pub const METAOBJECT_CREATE: &str = r"
mutation CreateMetaobject($metaobject: MetaobjectCreateInput!) {
  metaobjectCreate(metaobject: $metaobject) {
    metaobject { id handle }
    userErrors { field message code }
  }
}";

pub const METAOBJECTS_QUERY: &str = r"
query ListMetaobjects($type: String!, $first: Int!) {
  metaobjects(type: $type, first: $first) {
    nodes { id handle fields { key value } }
  }
}";

pub const METAOBJECT_UPDATE: &str = r"
mutation UpdateMetaobject($id: ID!, $metaobject: MetaobjectUpdateInput!) {
  metaobjectUpdate(id: $id, metaobject: $metaobject) {
    metaobject { id handle fields { key value } }
    userErrors { field message code }
  }
}";

#[derive(Debug, Serialize)]
pub struct GraphqlRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Deserialize)]
pub struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

/// A top-level GraphQL error
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GraphqlError {
    /// Error description
    pub message: String,
}

/// A field-level validation error reported by a mutation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserError {
    /// Path to the offending input field
    #[serde(default)]
    pub field: Option<Vec<String>>,
    /// Error description
    pub message: String,
    /// Machine-readable code
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FieldPair {
    pub key: String,
    pub value: Option<String>,
}

/// Flattens the wire `[{key, value}]` list into a map; `null` values become empty strings
pub fn flatten_fields(pairs: Vec<FieldPair>) -> Fields {
    pairs
        .into_iter()
        .map(|pair| (pair.key, pair.value.unwrap_or_default()))
        .collect()
}

/// Rebuilds the wire `[{key, value}]` list from a map
pub fn field_pairs(fields: &Fields) -> Vec<FieldPair> {
    fields
        .iter()
        .map(|(key, value)| FieldPair {
            key: key.clone(),
            value: Some(value.clone()),
        })
        .collect()
}

#[derive(Debug, Deserialize)]
pub struct MetaobjectNode {
    pub id: String,
    pub handle: String,
    #[serde(default)]
    pub fields: Vec<FieldPair>,
}

impl From<MetaobjectNode> for MetaobjectRecord {
    fn from(node: MetaobjectNode) -> Self {
        Self {
            id: node.id,
            handle: node.handle,
            fields: flatten_fields(node.fields),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreateVariables<'a> {
    pub metaobject: CreateInput<'a>,
}

#[derive(Debug, Serialize)]
pub struct CreateInput<'a> {
    #[serde(rename = "type")]
    pub object_type: &'a str,
    pub fields: Vec<FieldPair>,
}

#[derive(Debug, Serialize)]
pub struct QueryVariables<'a> {
    #[serde(rename = "type")]
    pub object_type: &'a str,
    pub first: u32,
}

#[derive(Debug, Serialize)]
pub struct UpdateVariables<'a> {
    pub id: &'a str,
    pub metaobject: UpdateInput,
}

#[derive(Debug, Serialize)]
pub struct UpdateInput {
    pub fields: Vec<FieldPair>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateData {
    pub metaobject_create: Option<MutationPayload<CreatedNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateData {
    pub metaobject_update: Option<MutationPayload<MetaobjectNode>>,
}

#[derive(Debug, Deserialize)]
pub struct QueryData {
    pub metaobjects: Option<Connection>,
}

#[derive(Debug, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub nodes: Vec<MetaobjectNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationPayload<T> {
    pub metaobject: Option<T>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
pub struct CreatedNode {
    pub id: String,
    pub handle: String,
}
