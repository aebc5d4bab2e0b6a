use std::time::Duration;

use futures_util::StreamExt;
use relay_logging::relay_debug;
use reqwest::header::CONTENT_TYPE;

use crate::{FailureKind, FetchError, FetchMetadata, FetchOutput, SourceMode};

pub const DASHBOARD_URL: &str = "https://www.wunderground.com/personal-weather-station/dashboard";
pub const FEED_URL: &str = "http://api.wunderground.com/weatherstation/WXCurrentObXML.asp?format=XML";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub dashboard_url: String,
    pub feed_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            dashboard_url: DASHBOARD_URL.to_string(),
            feed_url: FEED_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
                "text/xml".to_string(),
                "application/xml".to_string(),
                "text/plain".to_string(),
            ],
        }
    }
}

impl FetchSettings {
    /// Upstream URL for a station, with the station id as the `ID` query
    /// parameter.
    pub fn station_url(&self, pws_id: &str, mode: SourceMode) -> Result<reqwest::Url, FetchError> {
        let base = match mode {
            SourceMode::Scrape => &self.dashboard_url,
            SourceMode::Feed => &self.feed_url,
        };
        let mut url = reqwest::Url::parse(base)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;
        url.query_pairs_mut().append_pair("ID", pws_id);
        Ok(url)
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, pws_id: &str, mode: SourceMode) -> Result<FetchOutput, FetchError>;
}

/// One GET per call, no retries.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Self {
        Self { settings }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        let policy = reqwest::redirect::Policy::limited(self.settings.redirect_limit);

        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))
    }

    fn is_content_type_allowed(&self, content_type: &str) -> bool {
        let ct = content_type.split(';').next().unwrap_or(content_type).trim();
        self.settings
            .allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ct))
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.settings.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, pws_id: &str, mode: SourceMode) -> Result<FetchOutput, FetchError> {
        let url = self.settings.station_url(pws_id, mode)?;
        let client = self.build_client()?;

        relay_debug!("Fetching {} for {} from {}", mode, pws_id, url);
        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(self.too_large(content_len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        if let Some(ct) = content_type.as_deref() {
            if !self.is_content_type_allowed(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.settings.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(FetchError::new(
                FailureKind::EmptyBody,
                format!("{mode} for {pws_id} returned no content"),
            ));
        }

        relay_debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(FetchOutput {
            bytes,
            metadata: FetchMetadata { content_type },
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::new(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
