//! ymproxy - Yandex Music proxy for a web frontend
//!
//! Forwards catalog lookups and audio downloads to Yandex Music and flattens
//! landing-page blocks (personal mixes, charts) into simple JSON records.

/// HTTP routes, middleware and OpenAPI document
pub mod api;
/// Yandex Music client, vendor schema and response records
pub mod clients;
/// Flattening of landing-page blocks
pub mod landing;
