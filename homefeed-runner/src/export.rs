//! Snapshot export: one CSV per cycle, optional JSON manifest alongside.
//!
//! Columns follow `ValidatedEvent` field order. The nested probability
//! descriptor is flattened into dotted columns at the end of the row.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use homefeed_core::{SweepOutcome, ValidatedEvent};

use crate::config::ExportSection;
use crate::manifest::{write_manifest, CycleManifest};

/// Header row of every export.
pub const EXPORT_COLUMNS: [&str; 16] = [
    "id",
    "name",
    "display_name",
    "image_url",
    "yes_price",
    "no_price",
    "trading_info",
    "traders_count_numeric",
    "expiry_date",
    "expiry_date_time_stamp",
    "type",
    "is_event_active",
    "available_yes_price",
    "available_no_price",
    "probability_data.text",
    "probability_data.value",
];

fn optional_cell(v: Option<f64>) -> String {
    v.map(|f| f.to_string()).unwrap_or_default()
}

/// Serialize events to CSV text, header included.
pub fn export_events_csv(events: &[ValidatedEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(EXPORT_COLUMNS)?;

    for e in events {
        wtr.write_record([
            &e.id.to_string(),
            &e.name,
            &e.display_name,
            &e.image_url,
            &e.yes_price,
            &e.no_price,
            &e.trading_info,
            &e.traders_count_numeric.to_string(),
            &e.expiry_date,
            &e.expiry_date_time_stamp,
            &e.event_type,
            &e.is_event_active.to_string(),
            &optional_cell(e.available_yes_price),
            &optional_cell(e.available_no_price),
            &e.probability_data.text,
            &e.probability_data.value.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// `<prefix>_<YYYYMMDD_HHMMSS>`, the stem shared by the CSV and its manifest.
pub fn snapshot_stem(prefix: &str, completed_at: &DateTime<Local>) -> String {
    format!("{prefix}_{}", completed_at.format("%Y%m%d_%H%M%S"))
}

/// Files written for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifacts {
    pub csv: PathBuf,
    pub manifest: Option<PathBuf>,
    pub rows: usize,
    /// BLAKE3 hex digest of the CSV bytes.
    pub data_hash: String,
}

/// Result of exporting one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(ExportArtifacts),
    /// Nothing survived validation; no file was created.
    NoData,
}

/// Writes cycle snapshots into a fixed directory.
#[derive(Debug, Clone)]
pub struct CycleExporter {
    output_dir: PathBuf,
    file_prefix: String,
    write_manifest: bool,
}

impl CycleExporter {
    pub fn new(output_dir: impl AsRef<Path>, file_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            file_prefix: file_prefix.into(),
            write_manifest: false,
        }
    }

    pub fn from_config(section: &ExportSection) -> Self {
        Self::new(&section.output_dir, section.file_prefix.clone())
            .with_manifest(section.write_manifest)
    }

    pub fn with_manifest(mut self, enabled: bool) -> Self {
        self.write_manifest = enabled;
        self
    }

    /// Export the events of a completed sweep, tagged with its completion time.
    pub fn export(
        &self,
        completed_at: DateTime<Local>,
        sweep: &SweepOutcome,
    ) -> Result<ExportOutcome> {
        if sweep.events.is_empty() {
            return Ok(ExportOutcome::NoData);
        }

        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create export dir: {}", self.output_dir.display())
        })?;

        let stem = snapshot_stem(&self.file_prefix, &completed_at);
        let csv_path = self.output_dir.join(format!("{stem}.csv"));
        let csv = export_events_csv(&sweep.events)?;
        std::fs::write(&csv_path, &csv)
            .with_context(|| format!("failed to write {}", csv_path.display()))?;
        let data_hash = blake3::hash(csv.as_bytes()).to_hex().to_string();

        let manifest = if self.write_manifest {
            let path = self.output_dir.join(format!("{stem}.manifest.json"));
            let manifest = CycleManifest::new(completed_at, &csv_path, sweep, &data_hash);
            write_manifest(&path, &manifest).with_context(|| {
                format!("{} was written without its manifest", csv_path.display())
            })?;
            Some(path)
        } else {
            None
        };

        Ok(ExportOutcome::Written(ExportArtifacts {
            csv: csv_path,
            manifest,
            rows: sweep.events.len(),
            data_hash,
        }))
    }
}
