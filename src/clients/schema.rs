//! Typed view of the Yandex Music JSON schema
//!
//! Only the fields this crate reads are modelled. Everything else in a
//! vendor payload is ignored by serde, and endpoints that return vendor data
//! untouched work on `serde_json::Value` instead.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Yandex sends most ids as numbers, some as strings
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(Error::custom(format!(
            "id must be a string or number, got {other}"
        ))),
    }
}

pub(crate) fn deserialize_opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(Error::custom(format!(
            "id must be a string or number, got {other}"
        ))),
    }
}

/// Every successful vendor response wraps its payload in `result`
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub result: T,
}

/// Body of a failed vendor response
#[derive(Debug, Deserialize)]
pub struct VendorErrorBody {
    pub error: VendorError,
}

#[derive(Debug, Default, Deserialize)]
pub struct VendorError {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountStatus {
    pub account: Account,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub uid: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artist {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Album reference embedded in a track
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumRef {
    #[serde(default)]
    pub cover_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub albums: Vec<AlbumRef>,
    #[serde(default)]
    pub cover_uri: Option<String>,
    #[serde(default)]
    pub og_image: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

/// Playlist entry: the id, and sometimes the full track
#[derive(Debug, Clone, Deserialize)]
pub struct TrackShort {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub uid: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cover {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub items_uri: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub uid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub cover: Option<Cover>,
    #[serde(default)]
    pub track_count: Option<u32>,
    #[serde(default)]
    pub tracks: Vec<TrackShort>,
}

impl Playlist {
    /// Uid of the playlist owner, falling back to the playlist's own `uid`
    pub fn owner_uid(&self) -> Option<&str> {
        self.owner
            .as_ref()
            .and_then(|o| o.uid.as_deref())
            .or(self.uid.as_deref())
    }
}

/// Result of `/landing3`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Landing {
    #[serde(default)]
    pub blocks: Vec<LandingBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LandingBlock {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub entities: Vec<BlockEntity>,
}

/// One landing item. `data` is shaped by `kind`, see [`BlockEntity::into_payload`].
#[derive(Debug, Clone, Deserialize)]
pub struct BlockEntity {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// Entity data decoded according to the entity type
#[derive(Debug, Clone)]
pub enum EntityPayload {
    PersonalPlaylist(GeneratedPlaylist),
    ChartItem(ChartItem),
    Other(String),
}

impl BlockEntity {
    pub fn into_payload(self) -> serde_json::Result<EntityPayload> {
        Ok(match self.kind.as_str() {
            "personal-playlist" => {
                EntityPayload::PersonalPlaylist(serde_json::from_value(self.data)?)
            }
            "chart-item" => EntityPayload::ChartItem(serde_json::from_value(self.data)?),
            _ => EntityPayload::Other(self.kind),
        })
    }
}

/// Wrapper around a personal mix ("Playlist of the day", etc.)
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedPlaylist {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<Playlist>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartItem {
    #[serde(default)]
    pub track: Option<Track>,
}

/// One entry of `/tracks/{id}/download-info`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadInfo {
    pub codec: String,
    pub bitrate_in_kbps: u32,
    #[serde(default)]
    pub preview: bool,
    pub download_info_url: String,
}
