//! Catalog date handling
//!
//! Dates travel as `YYYY-MM-DD` strings in the catalog and the watermark file,
//! but are compared as [`NaiveDate`] values everywhere else. The string form
//! only exists at the serde boundary.

use crate::error::{HdsError, Result};
use chrono::{DateTime, NaiveDate};

/// Wire format for every date this workspace reads or writes.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a catalog date.
///
/// Accepts the fixed-width `YYYY-MM-DD` form and, for catalogs that emit full
/// timestamps, RFC 3339 values (the calendar date of the timestamp is kept).
pub fn parse_catalog_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|ts| ts.date_naive())
        .map_err(|_| HdsError::InvalidDate(raw.to_string()))
}

/// Format a date in the wire format.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Serde adapter for `YYYY-MM-DD` fields.
///
/// ```ignore
/// #[derive(serde::Deserialize)]
/// struct Entry {
///     #[serde(with = "hds_common::dates::iso_date")]
///     modified: chrono::NaiveDate,
/// }
/// ```
pub mod iso_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_catalog_date(&raw).map_err(de::Error::custom)
    }
}
