//! Homefeed Core: feed access, record validation, and the paginated sweep.
//!
//! This crate contains the fetch-validate-aggregate pipeline:
//! - Domain types (`ValidatedEvent`, `ProbabilityData`)
//! - `FeedProvider` trait and the blocking HTTP implementation
//! - Structural validation and price normalization, per record
//! - Page-count derivation and the sequential sweep with per-page isolation

pub mod event;
pub mod feed;
pub mod sweep;
pub mod validate;

pub use event::{ProbabilityData, ValidatedEvent};
pub use feed::{FeedProvider, FetchError, HttpFeedProvider, PageResponse, RawRecord};
pub use sweep::{
    fetch_first_page, run_sweep, sweep_remaining, total_pages, FirstPage, Pacer, PageReport,
    PageStatus, PaginationError, SweepError, SweepOutcome, ThreadPacer, MAX_PAGES,
};
pub use validate::{validate_batch, validate_record, BatchOutcome, ValidationError};
