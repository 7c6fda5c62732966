//! Sweep orchestrator: walk every page of the feed once, sequentially.
//!
//! Page 1 decides how many pages there are and must succeed; every later page
//! is isolated, so a failed fetch costs that page's records and nothing else.

use crate::event::ValidatedEvent;
use crate::feed::{FeedProvider, FetchError, PageResponse};
use crate::validate::validate_batch;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// The page count could not be derived from page 1.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    #[error("page 1 returned no records but the feed reports {total_count} in total")]
    EmptyFirstPage { total_count: u64 },

    #[error("{total_count} records at {per_page} per page exceeds {} pages", MAX_PAGES)]
    TooManyPages { total_count: u64, per_page: usize },
}

/// A failure that ends the sweep before any later page is attempted.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("first page fetch failed: {0}")]
    FirstPage(#[from] FetchError),

    #[error("cannot paginate: {0}")]
    Pagination(#[from] PaginationError),
}

/// Upper bound on pages in one sweep. A feed claiming more is treated as
/// reporting a bogus `total_count`.
pub const MAX_PAGES: u32 = 1_000_000;

/// Number of pages needed to hold `total_count` records at `per_page` each.
///
/// An empty feed has zero pages. Zero records per page with a positive total
/// is an error rather than a division fault, as is a count above [`MAX_PAGES`].
pub fn total_pages(total_count: u64, per_page: usize) -> Result<u32, PaginationError> {
    if total_count == 0 {
        return Ok(0);
    }
    if per_page == 0 {
        return Err(PaginationError::EmptyFirstPage { total_count });
    }
    let pages = total_count.div_ceil(per_page as u64);
    match u32::try_from(pages) {
        Ok(pages) if pages <= MAX_PAGES => Ok(pages),
        _ => Err(PaginationError::TooManyPages {
            total_count,
            per_page,
        }),
    }
}

/// Blocking wait between requests.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

/// Pacer that sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Page 1 together with the page count derived from it.
#[derive(Debug, Clone)]
pub struct FirstPage {
    pub response: PageResponse,
    pub total_pages: u32,
}

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Fetched { validated: usize, rejected: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    pub page: u32,
    pub status: PageStatus,
}

/// Everything gathered by one sweep.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Surviving events in page order, then feed order within a page.
    pub events: Vec<ValidatedEvent>,
    pub total_count: u64,
    pub total_pages: u32,
    /// One entry per attempted page, in the order attempted.
    pub pages: Vec<PageReport>,
}

impl SweepOutcome {
    pub fn pages_failed(&self) -> usize {
        self.pages
            .iter()
            .filter(|p| matches!(p.status, PageStatus::Failed { .. }))
            .count()
    }

    pub fn records_rejected(&self) -> usize {
        self.pages
            .iter()
            .map(|p| match p.status {
                PageStatus::Fetched { rejected, .. } => rejected,
                PageStatus::Failed { .. } => 0,
            })
            .sum()
    }
}

fn fetch_checked(provider: &dyn FeedProvider, page: u32) -> Result<PageResponse, FetchError> {
    let response = provider.fetch_page(page)?;
    if !response.success {
        return Err(FetchError::Rejected {
            page,
            message: "response not flagged as successful".to_string(),
        });
    }
    Ok(response)
}

/// Fetch page 1 and derive the page count. Any failure here is fatal for the sweep.
pub fn fetch_first_page(provider: &dyn FeedProvider) -> Result<FirstPage, SweepError> {
    let response = fetch_checked(provider, 1)?;
    let total_pages = total_pages(response.total_count, response.records.len())?;
    info!(
        total_count = response.total_count,
        total_pages,
        provider = provider.name(),
        "Found {} total records across {} pages",
        response.total_count,
        total_pages
    );
    Ok(FirstPage {
        response,
        total_pages,
    })
}

/// Validate page 1, then fetch and validate pages `2..=total_pages`.
///
/// `page_delay` is paused before every request after the first.
pub fn sweep_remaining(
    provider: &dyn FeedProvider,
    first: FirstPage,
    pacer: &dyn Pacer,
    page_delay: Duration,
) -> SweepOutcome {
    let FirstPage {
        response,
        total_pages,
    } = first;
    let total_count = response.total_count;

    let mut events = Vec::new();
    let mut pages = Vec::new();

    let batch = validate_batch(&response.records);
    info!(
        page = 1,
        validated = batch.events.len(),
        "Validated and fetched {} records from page 1",
        batch.events.len()
    );
    pages.push(PageReport {
        page: 1,
        status: PageStatus::Fetched {
            validated: batch.events.len(),
            rejected: batch.rejected.len(),
        },
    });
    events.extend(batch.events);

    for page in 2..=total_pages {
        pacer.pause(page_delay);

        let status = match fetch_checked(provider, page) {
            Ok(response) => {
                let batch = validate_batch(&response.records);
                info!(
                    page,
                    validated = batch.events.len(),
                    "Validated and fetched {} records from page {page}",
                    batch.events.len()
                );
                let status = PageStatus::Fetched {
                    validated: batch.events.len(),
                    rejected: batch.rejected.len(),
                };
                events.extend(batch.events);
                status
            }
            Err(e) => {
                warn!(page, error = %e, "Error processing page {page}");
                PageStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };
        pages.push(PageReport { page, status });
    }

    SweepOutcome {
        events,
        total_count,
        total_pages,
        pages,
    }
}

/// One full sweep: page 1, then every remaining page.
pub fn run_sweep(
    provider: &dyn FeedProvider,
    pacer: &dyn Pacer,
    page_delay: Duration,
) -> Result<SweepOutcome, SweepError> {
    let first = fetch_first_page(provider)?;
    Ok(sweep_remaining(provider, first, pacer, page_delay))
}
