//! Per-record error types
//!
//! A [`FetchError`] describes why one dataset could not be downloaded or
//! cleaned. These never abort a run; the dispatcher logs them and collects
//! them into the run summary.

use thiserror::Error;

/// Why a single fetch record failed
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection failure, timeout, or body read error
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-2xx status
    #[error("Server returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Response had no header row to normalize
    #[error("Empty CSV body from {0}")]
    EmptyBody(String),

    /// Body has no usable header row
    #[error("CSV body has no header row")]
    MissingHeader,

    /// Body is not well-formed CSV (e.g. ragged rows)
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Output file could not be written
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking clean/write task panicked or was cancelled
    #[error("Clean task failed: {0}")]
    Task(String),
}

impl FetchError {
    /// Create a transport error
    pub fn http(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            url: url.into(),
            source,
        }
    }

    /// Create a status error
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Whether the failure happened before any bytes reached disk.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Status { .. })
    }

    /// Whether the transport gave up waiting on the server.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http { source, .. } if source.is_timeout())
    }
}
