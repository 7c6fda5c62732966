//! Polling cycle: an explicit state machine around sweep, export, and sleep.
//!
//! ```text
//! Idle → FetchingFirstPage → SweepingPages → Exporting → Sleeping
//!              ↑                                            │
//!              └────────────────────────────────────────────┘
//! ```
//!
//! A failed first page or a failed export ends the cycle early, but the
//! machine still passes through `Sleeping` for the full interval. There is no
//! terminal state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{error, info};

use homefeed_core::{
    fetch_first_page, sweep_remaining, FeedProvider, FirstPage, Pacer, SweepError, SweepOutcome,
};

use crate::config::PollerConfig;
use crate::export::{CycleExporter, ExportArtifacts, ExportOutcome};

/// Wall-clock source for cycle timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Observable position of the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    FetchingFirstPage,
    SweepingPages,
    Exporting,
    Sleeping,
}

/// Anything that reached the cycle boundary.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("sweep aborted: {0}")]
    Sweep(#[from] SweepError),

    #[error("export failed: {0:#}")]
    Export(anyhow::Error),
}

#[derive(Debug)]
pub enum CycleOutcome {
    Exported(ExportArtifacts),
    NoData,
    Failed(CycleError),
}

/// Sweep figures for a cycle that got past page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub total_count: u64,
    pub total_pages: u32,
    pub pages_failed: usize,
    pub records_rejected: usize,
    pub events: usize,
}

impl From<&SweepOutcome> for SweepStats {
    fn from(sweep: &SweepOutcome) -> Self {
        Self {
            total_count: sweep.total_count,
            total_pages: sweep.total_pages,
            pages_failed: sweep.pages_failed(),
            records_rejected: sweep.records_rejected(),
            events: sweep.events.len(),
        }
    }
}

/// Summary of one finished cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    pub completed_at: DateTime<Local>,
    pub outcome: CycleOutcome,
    /// `None` when the cycle failed before the sweep finished.
    pub sweep: Option<SweepStats>,
}

enum Phase {
    Idle,
    FetchingFirstPage,
    SweepingPages(FirstPage),
    Exporting(SweepOutcome),
    Sleeping,
}

/// Drives cycles against a provider. Sequential; one transition per `step`.
pub struct Poller<'a> {
    provider: &'a dyn FeedProvider,
    pacer: &'a dyn Pacer,
    clock: &'a dyn Clock,
    exporter: CycleExporter,
    page_delay: Duration,
    cycle_interval: Duration,
    phase: Phase,
    cycles_completed: u64,
}

impl<'a> Poller<'a> {
    pub fn new(
        provider: &'a dyn FeedProvider,
        pacer: &'a dyn Pacer,
        clock: &'a dyn Clock,
        exporter: CycleExporter,
        page_delay: Duration,
        cycle_interval: Duration,
    ) -> Self {
        Self {
            provider,
            pacer,
            clock,
            exporter,
            page_delay,
            cycle_interval,
            phase: Phase::Idle,
            cycles_completed: 0,
        }
    }

    pub fn from_config(
        config: &PollerConfig,
        provider: &'a dyn FeedProvider,
        pacer: &'a dyn Pacer,
        clock: &'a dyn Clock,
    ) -> Self {
        Self::new(
            provider,
            pacer,
            clock,
            CycleExporter::from_config(&config.export),
            config.timing.page_delay(),
            config.timing.cycle_interval(),
        )
    }

    pub fn state(&self) -> CycleState {
        match self.phase {
            Phase::Idle => CycleState::Idle,
            Phase::FetchingFirstPage => CycleState::FetchingFirstPage,
            Phase::SweepingPages(_) => CycleState::SweepingPages,
            Phase::Exporting(_) => CycleState::Exporting,
            Phase::Sleeping => CycleState::Sleeping,
        }
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed
    }

    /// Perform one transition. Returns the report when a cycle has just ended.
    pub fn step(&mut self) -> Option<CycleReport> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {
                self.phase = Phase::FetchingFirstPage;
                None
            }
            Phase::FetchingFirstPage => match fetch_first_page(self.provider) {
                Ok(first) => {
                    self.phase = Phase::SweepingPages(first);
                    None
                }
                Err(e) => Some(self.finish(CycleOutcome::Failed(e.into()), None)),
            },
            Phase::SweepingPages(first) => {
                let sweep = sweep_remaining(self.provider, first, self.pacer, self.page_delay);
                self.phase = Phase::Exporting(sweep);
                None
            }
            Phase::Exporting(sweep) => {
                let completed_at = self.clock.now();
                let stats = SweepStats::from(&sweep);
                let outcome = match self.exporter.export(completed_at, &sweep) {
                    Ok(ExportOutcome::Written(artifacts)) => CycleOutcome::Exported(artifacts),
                    Ok(ExportOutcome::NoData) => CycleOutcome::NoData,
                    Err(e) => CycleOutcome::Failed(CycleError::Export(e)),
                };
                // The sweep's events are dropped here; nothing carries over.
                drop(sweep);
                Some(self.finish_at(completed_at, outcome, Some(stats)))
            }
            Phase::Sleeping => {
                info!(
                    interval_secs = self.cycle_interval.as_secs(),
                    "Waiting {}s before the next iteration",
                    self.cycle_interval.as_secs()
                );
                self.pacer.pause(self.cycle_interval);
                self.phase = Phase::FetchingFirstPage;
                None
            }
        }
    }

    fn finish(&mut self, outcome: CycleOutcome, sweep: Option<SweepStats>) -> CycleReport {
        let completed_at = self.clock.now();
        self.finish_at(completed_at, outcome, sweep)
    }

    fn finish_at(
        &mut self,
        completed_at: DateTime<Local>,
        outcome: CycleOutcome,
        sweep: Option<SweepStats>,
    ) -> CycleReport {
        self.cycles_completed += 1;
        self.phase = Phase::Sleeping;

        let cycle = self.cycles_completed;
        match &outcome {
            CycleOutcome::Exported(artifacts) => info!(
                cycle,
                rows = artifacts.rows,
                path = %artifacts.csv.display(),
                "Data saved to {}",
                artifacts.csv.display()
            ),
            CycleOutcome::NoData => info!(cycle, "No data extracted for this iteration"),
            CycleOutcome::Failed(e) => error!(cycle, error = %e, "Cycle failed"),
        }
        if let Some(stats) = &sweep {
            info!(
                cycle,
                pages_failed = stats.pages_failed,
                records_rejected = stats.records_rejected,
                "Total valid records collected: {}",
                stats.events
            );
        }

        CycleReport {
            cycle,
            completed_at,
            outcome,
            sweep,
        }
    }

    /// Run cycles until `max_cycles` have completed or `cancel` is set.
    ///
    /// With neither, this never returns. The sleep after the final cycle of a
    /// bounded run is skipped.
    pub fn run(&mut self, max_cycles: Option<u64>, cancel: Option<&AtomicBool>) -> u64 {
        if max_cycles == Some(0) {
            return self.cycles_completed;
        }
        loop {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                break;
            }
            if self.step().is_some()
                && max_cycles.is_some_and(|max| self.cycles_completed >= max)
            {
                break;
            }
        }
        self.cycles_completed
    }
}
