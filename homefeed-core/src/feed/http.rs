//! Blocking HTTP provider for the public homefeed endpoint.
//!
//! One GET per page, `page` as the only query parameter, a fixed browser-like
//! header set. The endpoint is unauthenticated; the `Authorization` header it
//! expects carries the literal `Bearer undefined`.

use super::provider::{FeedProvider, FetchError, PageResponse};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::debug;

/// Public homefeed endpoint.
pub const DEFAULT_BASE_URL: &str = "https://prod.api.probo.in/api/v2/feed/public/homefeed";

/// Connection settings for [`HttpFeedProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeedClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Sent verbatim on every request, in order.
    pub headers: Vec<(String, String)>,
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            headers: default_headers(),
        }
    }
}

/// Header set the feed expects from its own web client.
///
/// `Accept-Encoding` is left to reqwest, which advertises and decodes
/// gzip, brotli and zstd itself.
pub fn default_headers() -> Vec<(String, String)> {
    [
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:136.0) Gecko/20100101 Firefox/136.0",
        ),
        ("Accept", "*/*"),
        ("Accept-Language", "en-US,en;q=0.5"),
        ("Referer", "https://probo.in/"),
        ("Origin", "https://probo.in"),
        ("Content-type", "application/json"),
        ("x-device-os", "DESKTOP"),
        ("x-version-name", "10"),
        ("appid", "in.probo.pro"),
        ("Authorization", "Bearer undefined"),
        ("Sec-Fetch-Dest", "empty"),
        ("Sec-Fetch-Mode", "cors"),
        ("Sec-Fetch-Site", "same-site"),
        ("Priority", "u=4"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Homefeed provider backed by a blocking reqwest client.
pub struct HttpFeedProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpFeedProvider {
    pub fn new(config: &FeedClientConfig) -> Result<Self, FetchError> {
        let headers = build_header_map(&config.headers)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::ClientSetup(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn build_header_map(headers: &[(String, String)]) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::ClientSetup(format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FetchError::ClientSetup(format!("header value for {name}: {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

impl FeedProvider for HttpFeedProvider {
    fn name(&self) -> &str {
        "probo_homefeed"
    }

    fn fetch_page(&self, page: u32) -> Result<PageResponse, FetchError> {
        if page == 0 {
            return Err(FetchError::InvalidPage(page));
        }

        debug!(page, url = %self.base_url, "requesting page");
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("page", page)])
            .send()
            .map_err(|e| FetchError::NetworkUnreachable(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                page,
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| FetchError::MalformedBody(format!("page {page}: {e}")))?;
        PageResponse::from_json(page, &body)
    }
}
