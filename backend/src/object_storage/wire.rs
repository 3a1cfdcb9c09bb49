//! Request and response bodies of the B2 native API (v2)

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeAccountResponse {
    pub authorization_token: String,
    pub api_url: String,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUploadUrlRequest<'a> {
    pub bucket_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUploadUrlResponse {
    pub upload_url: String,
    pub authorization_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFileNamesRequest<'a> {
    pub bucket_id: &'a str,
    pub start_file_name: &'a str,
    pub prefix: &'a str,
    pub max_file_count: u32,
}

#[derive(Debug, Deserialize)]
pub struct ListFileNamesResponse {
    pub files: Vec<FileVersion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    pub file_id: String,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileVersionRequest<'a> {
    pub file_name: &'a str,
    pub file_id: &'a str,
}

/// Error body returned by every B2 endpoint
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Renders a failed B2 response as `HTTP <status> <code>: <message>`, falling back to the
/// raw body when it is not a B2 error document
pub fn describe_failure(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| format!("HTTP {status}: {body}"),
        |err| format!("HTTP {status} {}: {}", err.code, err.message),
    )
}
