use serde::Serialize;
use utoipa::ToSchema;

/// Size substituted into vendor cover templates
pub const COVER_SIZE: &str = "200x200";

/// Chart blocks carry no cover we know how to extract
pub const CHART_COVER_PLACEHOLDER: &str = "Cover extraction is not implemented yet";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ArtistInfo {
    pub id: String,
    pub name: String,
}

/// Flattened view of a vendor track
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TrackInfo {
    pub id: String,
    pub title: String,
    pub artists: Vec<ArtistInfo>,
    pub cover_url: Option<String>,
    pub duration_ms: Option<u64>,
}

/// Flattened view of a personal mix from the landing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MixInfo {
    pub title: String,
    pub cover_image_url: Option<String>,
    pub tracks: Vec<TrackInfo>,
    /// Track count announced by the landing entity
    pub track_count_from_data: u32,
    /// Number of tracks actually fetched
    pub fetched_track_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChartEntry {
    pub chart_title: String,
    pub chart_cover_image_url: String,
    pub track_ids: Vec<String>,
}

/// Body of `/chart`; `errors` is `null` when nothing went wrong
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChartsReport {
    pub charts: Vec<ChartEntry>,
    pub errors: Option<Vec<String>>,
}

/// Turns a host-relative `%%` cover template into an https URL
pub fn cover_url(template: &str) -> Option<String> {
    let template = template.trim();
    if template.is_empty() {
        return None;
    }
    Some(format!("https://{}", template.replace("%%", COVER_SIZE)))
}
