//! Route handlers
//!
//! Catalog routes hand back vendor JSON untouched. Landing routes return the
//! flattened records from [`crate::landing`]. Audio routes download the track
//! into a temporary file and stream it back.

use std::{io::SeekFrom, path::Path as FsPath};

use axum::{
    Json,
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use log::info;
use serde::Deserialize;
use serde_json::Value;
use tempfile::TempPath;
use tokio::{fs::File, io::AsyncSeekExt};
use tokio_util::io::ReaderStream;
use utoipa::IntoParams;

use crate::{
    api::{AppState, error::AppError},
    clients::{
        entities::{ChartsReport, MixInfo},
        errors::Result,
    },
    landing::{collect_charts, collect_mixes},
};

const AUDIO_MPEG: &str = "audio/mpeg";
/// Name prefix of buffered audio files
pub const TEMP_PREFIX: &str = "ymproxy-";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Search query
    pub query: String,
}

#[utoipa::path(
    get,
    path = "/search",
    tag = "catalog",
    params(SearchParams),
    responses(
        (status = 200, description = "Vendor search result", body = serde_json::Value),
        (status = 403, description = "Missing or invalid API key")
    ),
    security(("api_key" = []))
)]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Json<Value>, AppError> {
    Ok(Json(state.service.search(&params.query).await?))
}

#[utoipa::path(
    get,
    path = "/track/{track_id}",
    tag = "catalog",
    params(("track_id" = u64, Path, description = "Track id")),
    responses(
        (status = 200, description = "Vendor track object", body = serde_json::Value),
        (status = 404, description = "Unknown track")
    ),
    security(("api_key" = []))
)]
pub async fn get_track(
    State(state): State<AppState>,
    Path(track_id): Path<u64>,
) -> std::result::Result<Json<Value>, AppError> {
    Ok(Json(
        state.service.track_document(&track_id.to_string()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/album/{album_id}",
    tag = "catalog",
    params(("album_id" = u64, Path, description = "Album id")),
    responses(
        (status = 200, description = "Vendor album with its tracks", body = serde_json::Value),
        (status = 404, description = "Unknown album")
    ),
    security(("api_key" = []))
)]
pub async fn get_album(
    State(state): State<AppState>,
    Path(album_id): Path<u64>,
) -> std::result::Result<Json<Value>, AppError> {
    Ok(Json(
        state
            .service
            .album_with_tracks(&album_id.to_string())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/download/{track_id}",
    tag = "audio",
    params(("track_id" = u64, Path, description = "Track id")),
    responses(
        (status = 200, description = "MP3 file sent as an attachment"),
        (status = 500, description = "Download failed")
    ),
    security(("api_key" = []))
)]
pub async fn download_track(
    State(state): State<AppState>,
    Path(track_id): Path<u64>,
) -> std::result::Result<Response, AppError> {
    let (file, path, size) = download_to_temp(&state, track_id).await?;
    info!("Sending track {track_id} as attachment ({size} bytes)");

    Ok((
        [
            (header::CONTENT_TYPE, AUDIO_MPEG.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"track_{track_id}.mp3\""),
            ),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        temp_file_body(file, path),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/stream/{track_id}",
    tag = "audio",
    params(("track_id" = u64, Path, description = "Track id")),
    responses(
        (status = 200, description = "MP3 audio, chunked"),
        (status = 500, description = "Download failed")
    ),
    security(("api_key" = []))
)]
pub async fn stream_track(
    State(state): State<AppState>,
    Path(track_id): Path<u64>,
) -> std::result::Result<Response, AppError> {
    let (file, path, size) = download_to_temp(&state, track_id).await?;
    info!("Streaming track {track_id} ({size} bytes)");

    Ok((
        [(header::CONTENT_TYPE, AUDIO_MPEG)],
        temp_file_body(file, path),
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/mixes",
    tag = "landing",
    responses(
        (
            status = 200,
            description = "Up to four personal mixes, empty on failure",
            body = Vec<MixInfo>
        )
    ),
    security(("api_key" = []))
)]
pub async fn get_mixes(State(state): State<AppState>) -> Json<Vec<MixInfo>> {
    Json(collect_mixes(state.service.as_ref()).await)
}

#[utoipa::path(
    get,
    path = "/chart",
    tag = "landing",
    responses(
        (status = 200, description = "Chart blocks with their track ids", body = ChartsReport)
    ),
    security(("api_key" = []))
)]
pub async fn get_chart(State(state): State<AppState>) -> Json<ChartsReport> {
    Json(collect_charts(state.service.as_ref()).await)
}

// The temp file is removed when `TempPath` drops, including on every error path here
async fn download_to_temp(state: &AppState, track_id: u64) -> Result<(File, TempPath, u64)> {
    let (file, path) = temp_audio_file(&state.temp_dir)?;
    let mut file = File::from_std(file);
    let size = state
        .service
        .download_to(&track_id.to_string(), &mut file)
        .await?;
    file.seek(SeekFrom::Start(0)).await?;
    Ok((file, path, size))
}

fn temp_audio_file(dir: &FsPath) -> Result<(std::fs::File, TempPath)> {
    Ok(tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".mp3")
        .tempfile_in(dir)?
        .into_parts())
}

fn temp_file_body(file: File, path: TempPath) -> Body {
    let stream = ReaderStream::new(file).map(move |chunk| {
        // Holds the temp file until the body is dropped
        let _keep = &path;
        chunk
    });
    Body::from_stream(stream)
}
