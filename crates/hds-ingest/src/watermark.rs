//! Last-run watermark persistence
//!
//! The watermark file is a one-field JSON document:
//!
//! ```json
//! {"last_run": "2024-06-01"}
//! ```
//!
//! Catalog entries modified on or before this date are treated as already
//! synced. A missing file means nothing has been synced yet.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cutoff used before the first successful run.
pub fn first_run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Serialize, Deserialize)]
struct WatermarkFile {
    #[serde(with = "hds_common::dates::iso_date")]
    last_run: NaiveDate,
}

/// File-backed watermark
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted cutoff.
    ///
    /// Returns [`first_run_date`] when the file does not exist. A file that
    /// exists but cannot be read or parsed is an error: silently falling back
    /// would re-download the whole catalog.
    pub fn load(&self) -> Result<NaiveDate> {
        if !self.path.exists() {
            let date = first_run_date();
            info!(
                path = %self.path.display(),
                cutoff = %date,
                "No watermark file, processing full history"
            );
            return Ok(date);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read watermark {}", self.path.display()))?;
        let file: WatermarkFile = serde_json::from_str(&content)
            .with_context(|| format!("Malformed watermark file {}", self.path.display()))?;

        debug!(path = %self.path.display(), cutoff = %file.last_run, "Loaded watermark");
        Ok(file.last_run)
    }

    /// Persist `date`, replacing any previous value.
    ///
    /// Writes a sibling temp file and renames it over the target so a crash
    /// mid-write never leaves a truncated watermark behind.
    pub fn save(&self, date: NaiveDate) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string(&WatermarkFile { last_run: date })?;
        let tmp = self.path.with_extension("json.tmp");

        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write watermark {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace watermark {}", self.path.display()))?;

        info!(path = %self.path.display(), last_run = %date, "Watermark saved");
        Ok(())
    }

    /// Delete the watermark so the next run starts from [`first_run_date`].
    /// Returns whether a file was removed.
    pub fn reset(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove watermark {}", self.path.display())),
        }
    }
}
