//! HDS Ingest Library
//!
//! Incremental sync of hospital-themed datasets from a CMS-style metadata
//! catalog into cleaned CSV files.
//!
//! # Pipeline
//!
//! - **Watermark**: the date of the last completed run ([`watermark`])
//! - **Catalog**: entries tagged with the theme and modified after the
//!   watermark, flattened into one [`catalog::FetchRecord`] per distribution
//! - **Fetch**: download, header normalization, write ([`fetch`])
//! - **Dispatch**: bounded-concurrency fan-out over all records ([`dispatch`])
//! - **Runner**: sequences the above and advances the watermark ([`runner`])
//!
//! # Example
//!
//! ```no_run
//! use hds_ingest::config::IngestConfig;
//! use hds_ingest::runner::IngestRunner;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?.with_workers(8);
//!     let runner = IngestRunner::from_config(config)?;
//!     let summary = runner.run(chrono::Local::now().date_naive()).await?;
//!     println!("{} saved, {} failed", summary.succeeded(), summary.failed());
//!     Ok(())
//! }
//! ```
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod progress;
pub mod runner;
pub mod watermark;

pub use error::FetchError;
