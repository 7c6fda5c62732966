//! Feed provider trait and structured fetch errors.
//!
//! The FeedProvider trait abstracts over where pages come from so the sweep
//! can run against the live HTTP feed or a scripted fake in tests.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// One market event exactly as the feed returned it. Expected to be a JSON
/// object; anything else is rejected by the validator.
pub type RawRecord = Value;

/// Errors from fetching a single page.
///
/// The sweep does not branch on the variant; they exist so operators can tell
/// a dropped connection from a changed response format.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid page index {0} (pages are 1-indexed)")]
    InvalidPage(u32),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} for page {page}")]
    HttpStatus { page: u32, status: u16 },

    #[error("malformed response body: {0}")]
    MalformedBody(String),

    #[error("feed rejected page {page}: {message}")]
    Rejected { page: u32, message: String },

    #[error("HTTP client setup failed: {0}")]
    ClientSetup(String),
}

/// A single page of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    /// Total number of records across all pages, as reported by the feed.
    pub total_count: u64,
    /// Records on this page, in feed order.
    pub records: Vec<RawRecord>,
    /// Whether the feed flagged the response as successful.
    pub success: bool,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "isError", default)]
    is_error: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    data: Option<EnvelopeData>,
}

#[derive(Debug, Deserialize)]
struct EnvelopeData {
    total_count: u64,
    records: Vec<RawRecord>,
}

impl PageResponse {
    /// Parse a feed response body.
    ///
    /// The body must be an object with `data.total_count` and `data.records`.
    /// An envelope carrying `isError: true` is reported as `Rejected`.
    pub fn from_json(page: u32, body: &str) -> Result<Self, FetchError> {
        let envelope: Envelope = serde_json::from_str(body)
            .map_err(|e| FetchError::MalformedBody(format!("page {page}: {e}")))?;

        if envelope.is_error.unwrap_or(false) {
            return Err(FetchError::Rejected {
                page,
                message: envelope
                    .message
                    .unwrap_or_else(|| "no message".to_string()),
            });
        }

        let data = envelope.data.ok_or_else(|| {
            FetchError::MalformedBody(format!("page {page}: missing `data` object"))
        })?;

        Ok(Self {
            total_count: data.total_count,
            records: data.records,
            success: true,
        })
    }
}

/// Source of feed pages.
///
/// Implementations perform exactly one request per call and never retry.
pub trait FeedProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch one page. `page` is 1-indexed.
    fn fetch_page(&self, page: u32) -> Result<PageResponse, FetchError>;
}
