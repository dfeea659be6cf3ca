//! HTTP surface: routes, API key middleware and the OpenAPI document

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::get};
use tower_http::cors::CorsLayer;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::clients::{
    MusicService,
    entities::{ArtistInfo, ChartEntry, ChartsReport, MixInfo, TrackInfo},
};

/// `X-API-KEY` check
pub mod auth;
/// Error to response mapping
pub mod error;
/// Route handlers
pub mod handlers;

pub use auth::API_KEY_HEADER;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Vendor calls
    pub service: Arc<dyn MusicService>,
    /// Expected `X-API-KEY` value
    pub api_key: Arc<str>,
    /// Where audio is buffered before it is sent
    pub temp_dir: Arc<PathBuf>,
}

impl AppState {
    /// State buffering audio in the system temp directory
    pub fn new(service: Arc<dyn MusicService>, api_key: impl Into<Arc<str>>) -> Self {
        AppState {
            service,
            api_key: api_key.into(),
            temp_dir: Arc::new(std::env::temp_dir()),
        }
    }

    /// Buffer audio in `dir` instead
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Arc::new(dir.into());
        self
    }
}

struct ApiKeyAddon;

impl Modify for ApiKeyAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(API_KEY_HEADER))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "ymproxy",
        description = "Yandex Music proxy with flattened landing data"
    ),
    paths(
        handlers::search,
        handlers::get_track,
        handlers::get_album,
        handlers::download_track,
        handlers::stream_track,
        handlers::get_mixes,
        handlers::get_chart,
    ),
    components(schemas(ArtistInfo, TrackInfo, MixInfo, ChartEntry, ChartsReport)),
    modifiers(&ApiKeyAddon),
    tags(
        (name = "catalog", description = "Vendor objects passed through as-is"),
        (name = "audio", description = "Track audio"),
        (name = "landing", description = "Flattened landing page blocks")
    )
)]
pub struct ApiDoc;

/// Builds the application router with auth and CORS applied
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/search", get(handlers::search))
        .route("/track/{track_id}", get(handlers::get_track))
        .route("/album/{album_id}", get(handlers::get_album))
        .route("/download/{track_id}", get(handlers::download_track))
        .route("/stream/{track_id}", get(handlers::stream_track))
        .route("/mixes", get(handlers::get_mixes))
        .route("/chart", get(handlers::get_chart))
        .with_state(state.clone())
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(state, auth::require_api_key))
        // Outermost, so preflight requests never hit the key check
        .layer(CorsLayer::permissive())
}
