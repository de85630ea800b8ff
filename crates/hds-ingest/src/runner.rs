//! Run controller
//!
//! One incremental run: load the watermark, select catalog records modified
//! since then, fetch them concurrently, and move the watermark forward.
//!
//! Fatal errors (catalog, watermark, output directory) abort the run before
//! the watermark is written, so a failed run is simply repeated next time.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::catalog::{self, FetchRecord};
use crate::config::{AdvancePolicy, IngestConfig};
use crate::dispatch::{dispatch, FailedRecord};
use crate::fetch::{CsvFetcher, RecordProcessor};
use crate::progress::record_progress;
use crate::watermark::WatermarkStore;

/// Records a run would fetch, without fetching them
#[derive(Debug, Clone, Serialize)]
pub struct RunPlan {
    pub cutoff: NaiveDate,
    pub records: Vec<FetchRecord>,
}

/// A record written during a run
#[derive(Debug, Clone, Serialize)]
pub struct SavedRecord {
    pub title: String,
    pub url: String,
    pub path: PathBuf,
    pub rows: usize,
}

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_date: NaiveDate,
    pub previous_watermark: NaiveDate,
    pub qualifying: usize,
    pub saved: Vec<SavedRecord>,
    pub failures: Vec<FailedRecord>,
    pub next_watermark: NaiveDate,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.saved.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Watermark to persist after a run on `run_date`.
///
/// With [`AdvancePolicy::RetryFailed`] the watermark stops one day before the
/// oldest failed record, so that record's entry qualifies again next run.
pub fn next_watermark(
    policy: AdvancePolicy,
    run_date: NaiveDate,
    failures: &[FailedRecord],
) -> NaiveDate {
    match policy {
        AdvancePolicy::Unconditional => run_date,
        AdvancePolicy::RetryFailed => failures
            .iter()
            .map(|f| f.modified.pred_opt().unwrap_or(NaiveDate::MIN))
            .min()
            .map_or(run_date, |held| held.min(run_date)),
    }
}

/// Drives one incremental sync
pub struct IngestRunner<P = CsvFetcher> {
    config: IngestConfig,
    watermark: WatermarkStore,
    processor: P,
}

impl IngestRunner<CsvFetcher> {
    /// Runner that downloads over HTTP into `config.output_dir`.
    pub fn from_config(config: IngestConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = CsvFetcher::new(&config.output_dir, config.http_timeout)?;
        Ok(Self::with_processor(config, fetcher))
    }
}

impl<P: RecordProcessor> IngestRunner<P> {
    pub fn with_processor(config: IngestConfig, processor: P) -> Self {
        let watermark = WatermarkStore::new(&config.watermark_path);
        Self {
            config,
            watermark,
            processor,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn watermark(&self) -> &WatermarkStore {
        &self.watermark
    }

    /// Select the records the next run would fetch. Touches nothing on disk.
    pub fn plan(&self) -> Result<RunPlan> {
        let cutoff = self.watermark.load()?;
        let records =
            catalog::load_and_filter(&self.config.metadata_path, &self.config.theme, cutoff)?;
        Ok(RunPlan { cutoff, records })
    }

    /// Execute one run dated `run_date`.
    ///
    /// Per-record failures are reported in the summary; only setup and
    /// watermark errors are returned as `Err`.
    pub async fn run(&self, run_date: NaiveDate) -> Result<RunSummary> {
        info!(
            run_date = %run_date,
            catalog = %self.config.metadata_path.display(),
            output_dir = %self.config.output_dir.display(),
            theme = %self.config.theme,
            workers = self.config.worker_count,
            "Starting ingest run"
        );

        let previous_watermark = self.watermark.load()?;

        std::fs::create_dir_all(&self.config.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.config.output_dir.display()
            )
        })?;

        let records = catalog::load_and_filter(
            &self.config.metadata_path,
            &self.config.theme,
            previous_watermark,
        )?;
        let qualifying = records.len();

        let progress = record_progress(qualifying as u64, self.config.show_progress);
        let report = dispatch(
            &self.processor,
            records,
            self.config.worker_count,
            &progress,
        )
        .await;
        progress.finish_and_clear();

        let next = next_watermark(self.config.advance_policy, run_date, &report.failures);
        if next < run_date {
            warn!(
                failed = report.failures.len(),
                oldest_failure = ?report.oldest_failure(),
                watermark = %next,
                "Holding watermark so failed records are retried next run"
            );
        }
        self.watermark.save(next)?;

        let summary = RunSummary {
            run_date,
            previous_watermark,
            qualifying,
            saved: report
                .saved
                .into_iter()
                .map(|(record, file)| SavedRecord {
                    title: record.title,
                    url: record.url,
                    path: file.path,
                    rows: file.rows,
                })
                .collect(),
            failures: report.failures,
            next_watermark: next,
        };

        info!(
            qualifying,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            watermark = %next,
            "Job complete"
        );

        Ok(summary)
    }
}
