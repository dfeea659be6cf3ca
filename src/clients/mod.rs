use async_trait::async_trait;
use serde_json::Value;
use tokio::fs::File;

use crate::clients::{
    errors::Result,
    schema::{Landing, Playlist, Track},
};

/// Download variant selection and direct link signing
pub mod download;
/// Response records served to the frontend
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// Typed view of the vendor JSON
pub mod schema;
/// Yandex Music HTTP client
pub mod yandex;

pub use yandex::YandexMusicClient;

/// Vendor calls the HTTP handlers depend on
///
/// `YandexMusicClient` is the real implementation; tests plug in fakes.
#[async_trait]
pub trait MusicService: Send + Sync {
    /// Full-text search, vendor JSON as returned
    async fn search(&self, query: &str) -> Result<Value>;

    /// A single track, vendor JSON as returned
    async fn track_document(&self, track_id: &str) -> Result<Value>;

    /// An album together with its track volumes, vendor JSON as returned
    async fn album_with_tracks(&self, album_id: &str) -> Result<Value>;

    /// Full track objects for the given ids, in one request
    async fn tracks(&self, track_ids: &[String]) -> Result<Vec<Track>>;

    /// Landing page restricted to the given block types
    async fn landing(&self, blocks: &[&str]) -> Result<Landing>;

    /// A user playlist with its track list
    async fn user_playlist(&self, owner_uid: &str, kind: &str) -> Result<Playlist>;

    /// Writes the track audio (mp3) into `file` and returns the byte count
    async fn download_to(&self, track_id: &str, file: &mut File) -> Result<u64>;
}
