//! Bounded-concurrency fan-out over fetch records
//!
//! Runs a [`RecordProcessor`] over every record with at most `worker_count`
//! in flight. A failed record is logged and collected; it never stops the
//! others.

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use serde::Serialize;
use tracing::{error, info};

use crate::catalog::FetchRecord;
use crate::fetch::{RecordProcessor, SavedFile};

/// A record whose fetch did not produce a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedRecord {
    pub title: String,
    pub url: String,
    pub modified: NaiveDate,
    pub reason: String,
}

/// Outcome of one dispatch, in completion order
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub saved: Vec<(FetchRecord, SavedFile)>,
    pub failures: Vec<FailedRecord>,
}

impl DispatchReport {
    pub fn total(&self) -> usize {
        self.saved.len() + self.failures.len()
    }

    /// Oldest modification date among failed records.
    pub fn oldest_failure(&self) -> Option<NaiveDate> {
        self.failures.iter().map(|f| f.modified).min()
    }
}

/// Process all `records`, at most `worker_count` at a time.
///
/// Returns once every record has either been saved or failed. A
/// `worker_count` of zero is treated as one.
pub async fn dispatch<P>(
    processor: &P,
    records: Vec<FetchRecord>,
    worker_count: usize,
    progress: &ProgressBar,
) -> DispatchReport
where
    P: RecordProcessor + ?Sized,
{
    let total = records.len();
    let concurrency = worker_count.max(1);

    info!(records = total, concurrency, "Dispatching fetches");

    let outcomes: Vec<Result<(FetchRecord, SavedFile), FailedRecord>> = stream::iter(records)
        .map(|record| async move {
            let outcome = match processor.process(&record).await {
                Ok(saved) => Ok((record, saved)),
                Err(e) => {
                    error!(
                        title = %record.title,
                        url = %record.url,
                        error = %e,
                        timeout = e.is_timeout(),
                        network = e.is_network(),
                        "Fetch failed"
                    );
                    Err(FailedRecord {
                        reason: e.to_string(),
                        title: record.title,
                        url: record.url,
                        modified: record.modified,
                    })
                },
            };
            progress.inc(1);
            outcome
        })
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut report = DispatchReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(saved) => report.saved.push(saved),
            Err(failed) => report.failures.push(failed),
        }
    }

    info!(
        saved = report.saved.len(),
        failed = report.failures.len(),
        "Dispatch complete: {} / {} records saved",
        report.saved.len(),
        total
    );

    report
}
