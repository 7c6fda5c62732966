//! Cycle manifest export (JSON).

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use homefeed_core::SweepOutcome;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current schema version for manifests.
pub const MANIFEST_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleManifest {
    pub schema_version: u32,
    pub completed_at: DateTime<Local>,
    pub csv_file: String,
    pub total_count: u64,
    pub total_pages: u32,
    pub pages_attempted: usize,
    pub pages_failed: usize,
    pub records_rejected: usize,
    pub rows_exported: usize,
    pub data_hash: String,
}

impl CycleManifest {
    pub fn new(
        completed_at: DateTime<Local>,
        csv_path: &Path,
        sweep: &SweepOutcome,
        data_hash: &str,
    ) -> Self {
        Self {
            schema_version: MANIFEST_SCHEMA_VERSION,
            completed_at,
            csv_file: csv_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            total_count: sweep.total_count,
            total_pages: sweep.total_pages,
            pages_attempted: sweep.pages.len(),
            pages_failed: sweep.pages_failed(),
            records_rejected: sweep.records_rejected(),
            rows_exported: sweep.events.len(),
            data_hash: data_hash.to_string(),
        }
    }
}

pub fn write_manifest(path: &Path, manifest: &CycleManifest) -> Result<()> {
    let json =
        serde_json::to_string_pretty(manifest).context("Failed to serialize cycle manifest")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write manifest to {}", path.display()))?;
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<CycleManifest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    serde_json::from_str(&json).context("Failed to deserialize cycle manifest")
}
