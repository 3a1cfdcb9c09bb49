//! Chug leaderboard relay: upload proxy and leaderboard API between the storefront,
//! Shopify metaobjects and Backblaze B2.

#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs, dead_code)]

/// Metaobject storage on Shopify
pub mod catalog;

/// Cached upstream credentials
pub mod credentials;

/// Shared outbound HTTP client
pub mod http_client;

/// Video storage on Backblaze B2
pub mod object_storage;

/// HTTP routes
pub mod routes;

/// Server setup
pub mod server;

/// Leaderboard submission rules
pub mod submission;

/// Configuration, errors and extractors
pub mod types;
