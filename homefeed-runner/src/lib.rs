//! Homefeed Runner: polling cycles, configuration, and snapshot export.
//!
//! This crate builds on `homefeed-core` to provide:
//! - TOML configuration with reference defaults
//! - The cycle state machine (sweep → export → sleep, forever)
//! - CSV snapshots with an optional JSON manifest per cycle

pub mod config;
pub mod cycle;
pub mod export;
pub mod manifest;

pub use config::{ConfigError, ExportSection, FeedSection, PollerConfig, TimingSection};
pub use cycle::{
    Clock, CycleError, CycleOutcome, CycleReport, CycleState, Poller, SweepStats, SystemClock,
};
pub use export::{
    export_events_csv, CycleExporter, ExportArtifacts, ExportOutcome, EXPORT_COLUMNS,
};
pub use manifest::{read_manifest, CycleManifest};
