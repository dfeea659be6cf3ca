use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, info, warn};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::{fs::File, io::AsyncWriteExt};

use crate::clients::{
    MusicService,
    download::{DownloadLocation, STORAGE_SCHEME, choose_variant},
    errors::{Error, Result},
    schema::{
        Account, AccountStatus, DownloadInfo, Envelope, Landing, Playlist, Track, VendorError,
        VendorErrorBody,
    },
};

/// Public Yandex Music API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.music.yandex.net";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CLIENT_HEADER: &str = "X-Yandex-Music-Client";
const CLIENT_ID: &str = "YandexMusicAndroid/24023231";
const USER_AGENT: &str = "Yandex-Music-API";

/// Client for the Yandex Music API, authorised with an OAuth token when one is given
pub struct YandexMusicClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    storage_scheme: String,
    account: Option<Account>,
}

impl YandexMusicClient {
    /// An empty token is treated as no token
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(YandexMusicClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            timeout,
            storage_scheme: STORAGE_SCHEME.to_string(),
            account: None,
        })
    }

    /// Scheme used for the signed audio links, `https` unless overridden
    #[must_use]
    pub fn with_storage_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.storage_scheme = scheme.into();
        self
    }

    /// Account the token belongs to, known after [`YandexMusicClient::init`]
    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    // Fetch and remember the account the token belongs to
    pub async fn init(&mut self) -> Result<()> {
        if self.token.is_none() {
            warn!("No Yandex Music token configured, using anonymous access");
        }
        let status: AccountStatus = self.get("/account/status", &[]).await?;
        match (&status.account.uid, &status.account.login) {
            (Some(uid), login) => info!(
                "Authenticated as Yandex Music user {} (uid {uid})",
                login.as_deref().unwrap_or("<no login>")
            ),
            (None, _) => info!("Yandex Music session is anonymous"),
        }
        self.account = Some(status.account);
        Ok(())
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(CLIENT_HEADER, CLIENT_ID);
        match &self.token {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, format!("OAuth {token}")),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}{endpoint}", self.base_url);
        debug!("GET {url} with {} params", params.len());
        let request = self.authorized(self.http.get(&url)).query(params);
        self.send(request).await
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{endpoint}", self.base_url);
        debug!("POST {url} with {} fields", form.len());
        let request = self.authorized(self.http.post(&url)).form(form);
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.timeout(self.timeout).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let vendor = serde_json::from_str::<VendorErrorBody>(&body)
                .map(|b| b.error)
                .unwrap_or_else(|_| VendorError {
                    name: String::new(),
                    message: body,
                });
            warn!(
                "Yandex Music API error ({status}): {} {}",
                vendor.name, vendor.message
            );
            return Err(Error::from_status_code(
                status.as_u16(),
                vendor.name,
                vendor.message,
            ));
        }

        let bytes = response.bytes().await?;
        let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
        Ok(envelope.result)
    }

    async fn raw_tracks(&self, track_ids: &str) -> Result<Vec<Value>> {
        self.post_form(
            "/tracks",
            &[("track-ids", track_ids), ("with-positions", "True")],
        )
        .await
    }
}

#[async_trait]
impl MusicService for YandexMusicClient {
    async fn search(&self, query: &str) -> Result<Value> {
        self.get(
            "/search",
            &[
                ("text", query),
                ("nocorrect", "False"),
                ("type", "all"),
                ("page", "0"),
                ("playlist-in-best", "True"),
            ],
        )
        .await
    }

    async fn track_document(&self, track_id: &str) -> Result<Value> {
        self.raw_tracks(track_id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("track {track_id}")))
    }

    async fn album_with_tracks(&self, album_id: &str) -> Result<Value> {
        self.get(&format!("/albums/{album_id}/with-tracks"), &[]).await
    }

    async fn tracks(&self, track_ids: &[String]) -> Result<Vec<Track>> {
        if track_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.post_form(
            "/tracks",
            &[
                ("track-ids", track_ids.join(",").as_str()),
                ("with-positions", "True"),
            ],
        )
        .await
    }

    async fn landing(&self, blocks: &[&str]) -> Result<Landing> {
        self.get("/landing3", &[("blocks", blocks.join(",").as_str())])
            .await
    }

    async fn user_playlist(&self, owner_uid: &str, kind: &str) -> Result<Playlist> {
        self.get(&format!("/users/{owner_uid}/playlists/{kind}"), &[])
            .await
    }

    async fn download_to(&self, track_id: &str, file: &mut File) -> Result<u64> {
        let variants: Vec<DownloadInfo> = self
            .get(&format!("/tracks/{track_id}/download-info"), &[])
            .await?;
        let variant = choose_variant(track_id, &variants)?;
        debug!(
            "Downloading track {track_id} as {} {}kbps",
            variant.codec, variant.bitrate_in_kbps
        );

        let xml = self
            .authorized(self.http.get(&variant.download_info_url))
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let location = DownloadLocation::from_xml(&xml)?;

        // No overall timeout here, audio bodies can take a while
        let response = self
            .http
            .get(location.direct_link(&self.storage_scheme))
            .send()
            .await?
            .error_for_status()?;

        let mut body = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!("Downloaded {written} bytes for track {track_id}");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_anonymous() {
        let client =
            YandexMusicClient::new(DEFAULT_API_BASE, Some(String::new()), DEFAULT_TIMEOUT)
                .unwrap();
        assert!(client.token.is_none());
        assert!(client.account().is_none());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client =
            YandexMusicClient::new("http://127.0.0.1:9999/", None, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:9999");
    }

    #[tokio::test]
    async fn empty_id_list_skips_the_request() {
        // Unroutable base: a request would fail
        let client = YandexMusicClient::new("http://127.0.0.1:1", None, DEFAULT_TIMEOUT).unwrap();
        assert!(client.tracks(&[]).await.unwrap().is_empty());
    }
}
