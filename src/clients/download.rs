//! Resolving a downloadable audio URL for a track
//!
//! `/tracks/{id}/download-info` lists the available encodings. Each entry points
//! to a small XML document from which the signed direct link is built.

use md5::{Digest, Md5};
use serde::Deserialize;

use crate::clients::{
    errors::{Error, Result},
    schema::DownloadInfo,
};

/// Salt mixed into the direct link signature
const SIGN_SALT: &str = "XGRlBW9FXlekgbPrRHuSiA";

pub const PREFERRED_CODEC: &str = "mp3";
pub const PREFERRED_BITRATE_KBPS: u32 = 192;
/// Scheme of the audio storage hosts
pub const STORAGE_SCHEME: &str = "https";

/// Parsed `download-info` XML
#[derive(Debug, Deserialize)]
pub struct DownloadLocation {
    pub host: String,
    pub path: String,
    pub ts: String,
    pub s: String,
}

impl DownloadLocation {
    pub fn from_xml(xml: &str) -> Result<Self> {
        Ok(quick_xml::de::from_str(xml)?)
    }

    /// Signed `get-mp3` link on the storage host
    pub fn direct_link(&self, scheme: &str) -> String {
        let path_tail = self.path.strip_prefix('/').unwrap_or(&self.path);
        let mut hasher = Md5::new();
        hasher.update(SIGN_SALT.as_bytes());
        hasher.update(path_tail.as_bytes());
        hasher.update(self.s.as_bytes());
        let sign = hex::encode(hasher.finalize());
        format!(
            "{scheme}://{}/get-mp3/{sign}/{}{}",
            self.host, self.ts, self.path
        )
    }
}

/// Picks mp3 at the preferred bitrate, otherwise the best full-length mp3
pub fn choose_variant<'a>(
    track_id: &str,
    variants: &'a [DownloadInfo],
) -> Result<&'a DownloadInfo> {
    let mp3 = variants
        .iter()
        .filter(|v| v.codec == PREFERRED_CODEC && !v.preview);

    mp3.clone()
        .find(|v| v.bitrate_in_kbps == PREFERRED_BITRATE_KBPS)
        .or_else(|| mp3.max_by_key(|v| v.bitrate_in_kbps))
        .ok_or_else(|| Error::NotAvailable(format!("no mp3 variant for track {track_id}")))
}
