//! Flattening of landing-page blocks into the records served by `/mixes` and `/chart`

use std::collections::{HashMap, HashSet};

use log::{debug, error, warn};

use crate::clients::{
    MusicService,
    entities::{
        ArtistInfo, CHART_COVER_PLACEHOLDER, ChartEntry, ChartsReport, MixInfo, TrackInfo,
        cover_url,
    },
    errors::Result,
    schema::{
        BlockEntity, Cover, EntityPayload, GeneratedPlaylist, LandingBlock, Playlist, Track,
    },
};

/// `/mixes` never returns more than this many mixes
pub const MAX_MIXES: usize = 4;

const PERSONAL_PLAYLISTS_BLOCK: &str = "personal-playlists";
const CHART_BLOCK: &str = "chart";

const MIX_BLOCKS: &[&str] = &[PERSONAL_PLAYLISTS_BLOCK];
const CHART_BLOCKS: &[&str] = &[CHART_BLOCK, PERSONAL_PLAYLISTS_BLOCK];

const UNKNOWN_TITLE: &str = "Unknown title";
const UNKNOWN_CHART_TITLE: &str = "N/A";
const NO_BLOCKS_ERROR: &str = "Landing returned no blocks for the requested set";
const NO_CHART_BLOCKS_ERROR: &str = "No blocks of type 'chart' in the requested set";

/// Flat view of a vendor track. The cover comes from the track, then its first album,
/// then `ogImage`.
pub fn track_info(track: &Track) -> TrackInfo {
    let cover = track
        .cover_uri
        .as_deref()
        .or_else(|| track.albums.first().and_then(|a| a.cover_uri.as_deref()))
        .or(track.og_image.as_deref())
        .and_then(cover_url);

    TrackInfo {
        id: track.id.clone(),
        title: track.title.clone(),
        artists: track
            .artists
            .iter()
            .map(|a| ArtistInfo {
                id: a.id.clone(),
                name: a.name.clone(),
            })
            .collect(),
        cover_url: cover,
        duration_ms: track.duration_ms,
    }
}

/// Personal mixes from the landing page with their tracks, at most [`MAX_MIXES`].
/// Failures are logged and produce an empty list.
pub async fn collect_mixes(service: &dyn MusicService) -> Vec<MixInfo> {
    match try_collect_mixes(service).await {
        Ok(mixes) => mixes,
        Err(e) => {
            error!("Failed to collect personal mixes: {e}");
            Vec::new()
        }
    }
}

async fn try_collect_mixes(service: &dyn MusicService) -> Result<Vec<MixInfo>> {
    let landing = service.landing(MIX_BLOCKS).await?;
    if landing.blocks.is_empty() {
        warn!("{NO_BLOCKS_ERROR}");
        return Ok(Vec::new());
    }

    let playlists = landing
        .blocks
        .into_iter()
        .filter(|block| block.kind == PERSONAL_PLAYLISTS_BLOCK)
        .flat_map(|block| block.entities)
        .filter_map(nested_playlist)
        .take(MAX_MIXES);

    let mut mixes = Vec::with_capacity(MAX_MIXES);
    for playlist in playlists {
        mixes.push(build_mix(service, playlist).await);
    }
    debug!("Collected {} personal mixes", mixes.len());
    Ok(mixes)
}

fn nested_playlist(entity: BlockEntity) -> Option<Playlist> {
    let entity_id = entity.id.clone().unwrap_or_default();
    match entity.into_payload() {
        Ok(EntityPayload::PersonalPlaylist(GeneratedPlaylist { data: Some(playlist), .. })) => {
            Some(playlist)
        }
        Ok(EntityPayload::PersonalPlaylist(generated)) => {
            warn!(
                "Skipping entity {entity_id}: {} has no nested playlist data",
                generated.kind.as_deref().unwrap_or("generated playlist")
            );
            None
        }
        Ok(EntityPayload::ChartItem(_)) => {
            debug!("Skipping entity {entity_id}: chart item in a personal playlists block");
            None
        }
        Ok(EntityPayload::Other(kind)) => {
            debug!("Skipping entity {entity_id}: unexpected type {kind}");
            None
        }
        Err(e) => {
            warn!("Skipping entity {entity_id}: malformed personal playlist: {e}");
            None
        }
    }
}

fn cover_template(cover: &Cover) -> Option<&str> {
    cover
        .uri
        .as_deref()
        .or_else(|| cover.items_uri.first().map(String::as_str))
}

async fn build_mix(service: &dyn MusicService, playlist: Playlist) -> MixInfo {
    let title = playlist
        .title
        .clone()
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let cover_image_url = playlist
        .cover
        .as_ref()
        .and_then(cover_template)
        .and_then(cover_url);

    let tracks = match (playlist.owner_uid(), playlist.kind.as_deref()) {
        (Some(owner_uid), Some(kind)) => fetch_mix_tracks(service, owner_uid, kind)
            .await
            .unwrap_or_else(|e| {
                warn!(
                    "Failed to fetch tracks for mix '{title}' (owner {owner_uid}, kind {kind}): {e}"
                );
                Vec::new()
            }),
        _ => {
            debug!("Mix '{title}' has no owner uid or kind, tracks not fetched");
            Vec::new()
        }
    };

    MixInfo {
        title,
        cover_image_url,
        track_count_from_data: playlist.track_count.unwrap_or(0),
        fetched_track_count: tracks.len(),
        tracks,
    }
}

// Playlist entries may be "trackId:albumId"
fn track_key(id: &str) -> &str {
    id.split(':').next().unwrap_or(id)
}

async fn fetch_mix_tracks(
    service: &dyn MusicService,
    owner_uid: &str,
    kind: &str,
) -> Result<Vec<TrackInfo>> {
    let playlist = service.user_playlist(owner_uid, kind).await?;

    let mut seen = HashSet::new();
    let entries: Vec<_> = playlist
        .tracks
        .into_iter()
        .filter(|short| seen.insert(track_key(&short.id).to_string()))
        .collect();

    // Entries without an embedded track are fetched in a single batch
    let missing: Vec<String> = entries
        .iter()
        .filter(|short| short.track.is_none())
        .map(|short| track_key(&short.id).to_string())
        .collect();
    let mut fetched: HashMap<String, Track> = service
        .tracks(&missing)
        .await?
        .into_iter()
        .map(|track| (track.id.clone(), track))
        .collect();

    Ok(entries
        .into_iter()
        .filter_map(|short| {
            let track = short
                .track
                .or_else(|| fetched.remove(track_key(&short.id)));
            track.as_ref().map(track_info)
        })
        .collect())
}

/// Chart blocks of the landing page as lists of track ids
pub async fn collect_charts(service: &dyn MusicService) -> ChartsReport {
    let landing = match service.landing(CHART_BLOCKS).await {
        Ok(landing) => landing,
        Err(e) => {
            error!("Failed to fetch landing for charts: {e}");
            return ChartsReport {
                charts: Vec::new(),
                errors: Some(vec![format!(
                    "Critical error while fetching Yandex Music data: {e}"
                )]),
            };
        }
    };

    if landing.blocks.is_empty() {
        warn!("{NO_BLOCKS_ERROR}");
        return ChartsReport {
            charts: Vec::new(),
            errors: Some(vec![NO_BLOCKS_ERROR.to_string()]),
        };
    }

    let charts: Vec<ChartEntry> = landing
        .blocks
        .into_iter()
        .filter(|block| block.kind == CHART_BLOCK)
        .map(chart_entry)
        .collect();

    let mut errors = Vec::new();
    if charts.is_empty() {
        warn!("{NO_CHART_BLOCKS_ERROR}");
        errors.push(NO_CHART_BLOCKS_ERROR.to_string());
    }

    ChartsReport {
        charts,
        errors: (!errors.is_empty()).then_some(errors),
    }
}

fn chart_entry(block: LandingBlock) -> ChartEntry {
    let chart_title = block
        .title
        .unwrap_or_else(|| UNKNOWN_CHART_TITLE.to_string());

    let track_ids = block
        .entities
        .into_iter()
        .filter_map(|entity| match entity.into_payload() {
            Ok(EntityPayload::ChartItem(item)) => item.track.map(|t| t.id),
            Ok(_) => None,
            Err(e) => {
                debug!("Skipping chart entity in '{chart_title}': {e}");
                None
            }
        })
        .filter(|id| !id.is_empty())
        .collect();

    ChartEntry {
        chart_title,
        chart_cover_image_url: CHART_COVER_PLACEHOLDER.to_string(),
        track_ids,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::fs::File;

    use super::*;
    use crate::clients::{errors::Error, schema::Landing};

    #[derive(Default)]
    struct FakeService {
        landing: Option<Value>,
        playlists: HashMap<(String, String), Value>,
        tracks: HashMap<String, Value>,
        track_batches: Mutex<Vec<Vec<String>>>,
        playlist_calls: AtomicUsize,
    }

    #[async_trait]
    impl MusicService for FakeService {
        async fn search(&self, _query: &str) -> Result<Value> {
            Ok(json!({}))
        }

        async fn track_document(&self, track_id: &str) -> Result<Value> {
            self.tracks
                .get(track_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(track_id.to_string()))
        }

        async fn album_with_tracks(&self, _album_id: &str) -> Result<Value> {
            Ok(json!({}))
        }

        async fn tracks(&self, track_ids: &[String]) -> Result<Vec<Track>> {
            self.track_batches.lock().unwrap().push(track_ids.to_vec());
            track_ids
                .iter()
                .filter_map(|id| self.tracks.get(id))
                .map(|v| serde_json::from_value(v.clone()).map_err(Error::from))
                .collect()
        }

        async fn landing(&self, _blocks: &[&str]) -> Result<Landing> {
            let value = self
                .landing
                .clone()
                .ok_or_else(|| Error::from_status_code(500, "internal", "landing is down"))?;
            Ok(serde_json::from_value(value)?)
        }

        async fn user_playlist(&self, owner_uid: &str, kind: &str) -> Result<Playlist> {
            self.playlist_calls.fetch_add(1, Ordering::SeqCst);
            let value = self
                .playlists
                .get(&(owner_uid.to_string(), kind.to_string()))
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("{owner_uid}/{kind}")))?;
            Ok(serde_json::from_value(value)?)
        }

        async fn download_to(&self, _track_id: &str, _file: &mut File) -> Result<u64> {
            Ok(0)
        }
    }

    fn mix_entity(kind: u32, title: &str) -> Value {
        json!({
            "id": format!("mix-{kind}"),
            "type": "personal-playlist",
            "data": {
                "type": "playlistOfTheDay",
                "ready": true,
                "data": {
                    "owner": {"uid": 1000},
                    "kind": kind,
                    "title": title,
                    "cover": {"type": "pic", "uri": format!("avatars.yandex.net/mix/{kind}/%%")},
                    "trackCount": 2
                }
            }
        })
    }

    fn track(id: u32, title: &str) -> Value {
        json!({
            "id": id.to_string(),
            "title": title,
            "artists": [{"id": 7, "name": "Artist"}],
            "coverUri": format!("avatars.yandex.net/track/{id}/%%"),
            "durationMs": 180_000
        })
    }

    #[test]
    fn track_info_falls_back_to_album_cover() {
        let track: Track = serde_json::from_value(json!({
            "id": 5,
            "title": "Song",
            "albums": [{"id": 9, "coverUri": "avatars.yandex.net/album/9/%%"}]
        }))
        .unwrap();
        let info = track_info(&track);
        assert!(info.artists.is_empty());
        assert_eq!(
            info.cover_url.as_deref(),
            Some("https://avatars.yandex.net/album/9/200x200")
        );
        assert_eq!(info.duration_ms, None);
    }

    #[test]
    fn only_the_first_album_cover_is_used() {
        let track: Track = serde_json::from_value(json!({
            "id": 6,
            "title": "Song",
            "albums": [{"id": 1}, {"id": 2, "coverUri": "avatars.yandex.net/album/2/%%"}],
            "ogImage": "avatars.yandex.net/og/6/%%"
        }))
        .unwrap();
        assert_eq!(
            track_info(&track).cover_url.as_deref(),
            Some("https://avatars.yandex.net/og/6/200x200")
        );
    }

    #[tokio::test]
    async fn mixes_are_capped() {
        let entities: Vec<Value> = (1..=6)
            .map(|k| mix_entity(k, &format!("Mix {k}")))
            .collect();
        let service = FakeService {
            landing: Some(json!({"blocks": [
                {"type": "personal-playlists", "entities": entities}
            ]})),
            ..Default::default()
        };

        let mixes = collect_mixes(&service).await;
        assert_eq!(mixes.len(), MAX_MIXES);
        assert_eq!(mixes[0].title, "Mix 1");
        assert_eq!(
            mixes[0].cover_image_url.as_deref(),
            Some("https://avatars.yandex.net/mix/1/200x200")
        );
        assert_eq!(service.playlist_calls.load(Ordering::SeqCst), MAX_MIXES);
    }

    #[tokio::test]
    async fn fewer_entities_than_cap_are_all_returned() {
        let service = FakeService {
            landing: Some(json!({"blocks": [
                {"type": "chart", "entities": []},
                {"type": "personal-playlists", "entities": [
                    mix_entity(1, "Daily"),
                    mix_entity(2, "Premiere")
                ]}
            ]})),
            ..Default::default()
        };
        let titles: Vec<String> = collect_mixes(&service)
            .await
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(titles, vec!["Daily", "Premiere"]);
    }

    #[tokio::test]
    async fn mix_tracks_are_fetched_once_in_a_batch() {
        let mut playlists = HashMap::new();
        playlists.insert(
            ("1000".to_string(), "1".to_string()),
            json!({
                "kind": 1,
                "tracks": [
                    {"id": 10},
                    {"id": "11:500"},
                    {"id": 10},
                    {"id": 12, "track": track(12, "Embedded")}
                ]
            }),
        );
        let mut tracks = HashMap::new();
        tracks.insert("10".to_string(), track(10, "Ten"));
        tracks.insert("11".to_string(), track(11, "Eleven"));

        let service = FakeService {
            landing: Some(json!({"blocks": [
                {"type": "personal-playlists", "entities": [mix_entity(1, "Daily")]}
            ]})),
            playlists,
            tracks,
            ..Default::default()
        };

        let mixes = collect_mixes(&service).await;
        assert_eq!(mixes.len(), 1);
        let mix = &mixes[0];
        let titles: Vec<&str> = mix.tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Ten", "Eleven", "Embedded"]);
        assert_eq!(mix.fetched_track_count, 3);
        assert_eq!(mix.track_count_from_data, 2);
        assert_eq!(
            *service.track_batches.lock().unwrap(),
            vec![vec!["10".to_string(), "11".to_string()]]
        );
        assert_eq!(mix.tracks[0].artists[0].name, "Artist");
    }

    #[tokio::test]
    async fn entities_without_nested_data_are_skipped() {
        let service = FakeService {
            landing: Some(json!({"blocks": [{"type": "personal-playlists", "entities": [
                {"type": "personal-playlist", "data": {"type": "missedLikes", "ready": false}},
                {"type": "promotion", "data": {}},
                mix_entity(3, "Kept")
            ]}]})),
            ..Default::default()
        };
        let mixes = collect_mixes(&service).await;
        assert_eq!(mixes.len(), 1);
        assert_eq!(mixes[0].title, "Kept");
    }

    #[tokio::test]
    async fn failed_track_fetch_leaves_mix_empty() {
        let service = FakeService {
            landing: Some(json!({"blocks": [
                {"type": "personal-playlists", "entities": [mix_entity(9, "Lonely")]}
            ]})),
            ..Default::default()
        };
        let mixes = collect_mixes(&service).await;
        assert_eq!(mixes.len(), 1);
        assert!(mixes[0].tracks.is_empty());
        assert_eq!(mixes[0].fetched_track_count, 0);
    }

    #[tokio::test]
    async fn mix_without_title_or_owner_uses_defaults() {
        let service = FakeService {
            landing: Some(json!({"blocks": [{"type": "personal-playlists", "entities": [
                {"type": "personal-playlist", "data": {"data": {
                    "cover": {"itemsUri": ["avatars.yandex.net/a/%%"]}
                }}}
            ]}]})),
            ..Default::default()
        };
        let mixes = collect_mixes(&service).await;
        assert_eq!(mixes[0].title, UNKNOWN_TITLE);
        assert_eq!(
            mixes[0].cover_image_url.as_deref(),
            Some("https://avatars.yandex.net/a/200x200")
        );
        assert_eq!(service.playlist_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn landing_failure_yields_no_mixes() {
        let service = FakeService::default();
        assert!(collect_mixes(&service).await.is_empty());
    }

    #[tokio::test]
    async fn charts_list_track_ids() {
        let service = FakeService {
            landing: Some(json!({"blocks": [
                {"type": "chart", "title": "Chart", "entities": [
                    {"type": "chart-item", "data": {
                        "track": track(1, "One"),
                        "chart": {"position": 1}
                    }},
                    {"type": "chart-item", "data": {"chart": {"position": 2}}},
                    {"type": "chart-item", "data": {"track": {"id": 3}}},
                    {"type": "promotion", "data": {}}
                ]},
                {"type": "personal-playlists", "entities": []}
            ]})),
            ..Default::default()
        };

        let report = collect_charts(&service).await;
        assert_eq!(report.errors, None);
        assert_eq!(
            report.charts,
            vec![ChartEntry {
                chart_title: "Chart".into(),
                chart_cover_image_url: CHART_COVER_PLACEHOLDER.into(),
                track_ids: vec!["1".into(), "3".into()],
            }]
        );
    }

    #[tokio::test]
    async fn missing_chart_block_is_reported() {
        let service = FakeService {
            landing: Some(json!({"blocks": [{"type": "personal-playlists", "entities": []}]})),
            ..Default::default()
        };
        let report = collect_charts(&service).await;
        assert!(report.charts.is_empty());
        assert_eq!(report.errors, Some(vec![NO_CHART_BLOCKS_ERROR.to_string()]));
    }

    #[tokio::test]
    async fn empty_landing_is_reported() {
        let service = FakeService {
            landing: Some(json!({"blocks": []})),
            ..Default::default()
        };
        let report = collect_charts(&service).await;
        assert_eq!(report.errors, Some(vec![NO_BLOCKS_ERROR.to_string()]));
    }

    #[tokio::test]
    async fn landing_failure_is_reported_in_charts() {
        let report = collect_charts(&FakeService::default()).await;
        assert!(report.charts.is_empty());
        let errors = report.errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Critical error while fetching Yandex Music data"));
    }
}
