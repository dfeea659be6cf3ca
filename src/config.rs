use std::{net::SocketAddr, sync::Arc, time::Duration};

use ymproxy::clients::{
    MusicService, YandexMusicClient,
    errors::{Error, Result},
    yandex::{DEFAULT_API_BASE, DEFAULT_TIMEOUT},
};

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";

// Configuration for the HTTP server
pub struct Config {
    pub service: Arc<dyn MusicService>,
    pub api_key: String,
    pub bind: SocketAddr,
}

#[derive(Default)]
pub struct ConfigBuilder {
    service: Option<Arc<dyn MusicService>>,
    api_key: Option<String>,
    yandex_token: Option<String>,
    api_base: Option<String>,
    timeout: Option<Duration>,
    bind: Option<SocketAddr>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(dead_code)]
    pub fn service(mut self, service: Arc<dyn MusicService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn yandex_token(mut self, token: Option<String>) -> Self {
        self.yandex_token = token;
        self
    }

    pub fn api_base(mut self, api_base: String) -> Self {
        self.api_base = Some(api_base);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn bind(mut self, bind: SocketAddr) -> Self {
        self.bind = Some(bind);
        self
    }

    /// Vendor client from the collected settings, already initialised
    pub async fn build_client(&self) -> Result<YandexMusicClient> {
        let mut client = YandexMusicClient::new(
            self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE),
            self.yandex_token.clone(),
            self.timeout.unwrap_or(DEFAULT_TIMEOUT),
        )?;
        client.init().await?;
        Ok(client)
    }

    pub async fn build(self) -> Result<Config> {
        let api_key = self
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::ConfigurationError(
                    "API_KEY is not set; the server refuses to run without a client key".into(),
                )
            })?;
        let bind = match self.bind {
            Some(bind) => bind,
            None => DEFAULT_BIND
                .parse()
                .map_err(|e| Error::ConfigurationError(format!("Invalid bind address: {e}")))?,
        };
        let service = match self.service {
            Some(ref service) => service.clone(),
            None => Arc::new(self.build_client().await?),
        };
        Ok(Config {
            service,
            api_key,
            bind,
        })
    }
}
