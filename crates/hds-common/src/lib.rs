//! HDS Common Library
//!
//! Shared utilities for the Hospital Dataset Sync workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`HdsError`] and the [`Result`] alias
//! - **Dates**: catalog date parsing and the `YYYY-MM-DD` wire format
//! - **Logging**: `tracing` subscriber setup shared by every binary
//!
//! # Example
//!
//! ```no_run
//! use hds_common::dates::parse_catalog_date;
//! use hds_common::Result;
//!
//! fn cutoff() -> Result<chrono::NaiveDate> {
//!     parse_catalog_date("2024-06-01")
//! }
//! ```
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod dates;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{HdsError, Result};
