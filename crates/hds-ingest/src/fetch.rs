//! Download-and-clean worker
//!
//! [`CsvFetcher`] downloads one record's CSV, rewrites its header row with
//! [`normalize_header`], and stores the result under the output directory.
//! Data rows are copied byte-for-byte.

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::catalog::FetchRecord;
use crate::error::FetchError;
use crate::normalize::{normalize_header, output_file_name};

/// A file written for one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedFile {
    pub path: PathBuf,
    /// Data rows, excluding the header
    pub rows: usize,
}

/// Per-record work run by the dispatcher (dependency injection seam)
#[async_trait]
pub trait RecordProcessor: Send + Sync {
    async fn process(&self, record: &FetchRecord) -> Result<SavedFile, FetchError>;
}

/// HTTP-backed processor writing cleaned CSV files
pub struct CsvFetcher {
    client: reqwest::Client,
    output_dir: PathBuf,
}

impl CsvFetcher {
    /// Build a fetcher whose every request is bounded by `timeout`.
    pub fn new(output_dir: impl Into<PathBuf>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hds-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(client, output_dir))
    }

    pub fn with_client(client: reqwest::Client, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
        }
    }

    /// Where `record` will be written.
    pub fn output_path(&self, record: &FetchRecord) -> PathBuf {
        self.output_dir.join(output_file_name(&record.title))
    }

    async fn download(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::http(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(url, status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| FetchError::http(url, e))?;
        debug!(url, bytes = body.len(), "Downloaded");
        Ok(body)
    }
}

#[async_trait]
impl RecordProcessor for CsvFetcher {
    async fn process(&self, record: &FetchRecord) -> Result<SavedFile, FetchError> {
        info!(title = %record.title, url = %record.url, "Downloading");

        let body = self.download(&record.url).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(FetchError::EmptyBody(record.url.clone()));
        }

        let path = self.output_path(record);
        let dest = path.clone();
        let rows = tokio::task::spawn_blocking(move || clean_csv(&body, &dest))
            .await
            .map_err(|e| FetchError::Task(e.to_string()))??;

        info!(title = %record.title, path = %path.display(), rows, "Saved");
        Ok(SavedFile { path, rows })
    }
}

/// Normalize the header row of `body` and write the table to `dest`,
/// replacing any existing file. Returns the number of data rows.
///
/// Rows must all have the header's width; a ragged table is rejected as
/// malformed. The table is written to a temp file in the destination
/// directory and renamed over `dest` only once complete, so a failed record
/// leaves the previous file intact and concurrent writers to one path never
/// interleave.
pub fn clean_csv(body: &[u8], dest: &Path) -> Result<usize, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body);

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|raw| normalize_header(&String::from_utf8_lossy(raw)))
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(FetchError::MissingHeader);
    }

    let dir = match dest.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".hds-")
        .suffix(".csv.tmp")
        .tempfile_in(dir)?;

    let mut writer = csv::Writer::from_writer(tmp);
    writer.write_record(&headers)?;

    let mut rows = 0usize;
    for record in reader.byte_records() {
        writer.write_byte_record(&record?)?;
        rows += 1;
    }

    let mut tmp = writer
        .into_inner()
        .map_err(|e| FetchError::Io(e.into_error()))?;
    tmp.flush()?;
    tmp.persist(dest).map_err(|e| FetchError::Io(e.error))?;

    Ok(rows)
}
