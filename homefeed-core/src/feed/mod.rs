//! Feed access: provider trait, error type, and the HTTP implementation.

pub mod http;
pub mod provider;

pub use http::{FeedClientConfig, HttpFeedProvider, DEFAULT_BASE_URL};
pub use provider::{FeedProvider, FetchError, PageResponse, RawRecord};
