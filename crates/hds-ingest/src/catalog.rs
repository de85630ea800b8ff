//! Catalog loading and incremental filtering
//!
//! Reads the metadata export, keeps entries tagged with the configured theme
//! that changed after the watermark, and flattens each entry's distributions
//! into [`FetchRecord`]s.
//!
//! Two document shapes are accepted:
//!
//! - a top-level array of entries (the CMS metastore export)
//! - a DCAT catalog object whose `dataset` field holds the entries

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// One dataset description from the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    pub title: String,

    #[serde(default)]
    pub theme: Vec<String>,

    #[serde(with = "hds_common::dates::iso_date")]
    pub modified: NaiveDate,

    #[serde(default)]
    pub distribution: Vec<Distribution>,
}

/// One downloadable artifact of an entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Distribution {
    /// Direct file link. API-only distributions carry `accessURL` instead and
    /// are skipped.
    #[serde(rename = "downloadURL", default)]
    pub download_url: Option<String>,

    #[serde(rename = "mediaType", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

/// Unit of work for the fetch pipeline
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FetchRecord {
    pub title: String,
    pub modified: NaiveDate,
    pub url: String,
}

impl CatalogEntry {
    /// Whether this entry belongs in a run with the given theme and cutoff.
    /// The cutoff is exclusive: an entry modified on the cutoff date was
    /// already picked up by the run that wrote it.
    pub fn qualifies(&self, theme: &str, after: NaiveDate) -> bool {
        self.modified > after && self.theme.iter().any(|t| t == theme)
    }

    /// One record per distribution that has a download link.
    pub fn records(&self) -> impl Iterator<Item = FetchRecord> + '_ {
        self.distribution.iter().filter_map(move |dist| match &dist.download_url {
            Some(url) if !url.trim().is_empty() => Some(FetchRecord {
                title: self.title.clone(),
                modified: self.modified,
                url: url.trim().to_string(),
            }),
            _ => {
                debug!(title = %self.title, "Skipping distribution without downloadURL");
                None
            },
        })
    }
}

/// Parse a catalog document.
pub fn parse_catalog(content: &str) -> Result<Vec<CatalogEntry>> {
    let document: serde_json::Value =
        serde_json::from_str(content).context("Catalog is not valid JSON")?;

    let entries = match document {
        serde_json::Value::Array(_) => document,
        serde_json::Value::Object(mut catalog) => match catalog.remove("dataset") {
            Some(entries @ serde_json::Value::Array(_)) => entries,
            _ => bail!("Catalog object has no 'dataset' array"),
        },
        _ => bail!("Catalog must be an array of entries or an object with a 'dataset' array"),
    };

    serde_json::from_value(entries).context("Malformed catalog entry")
}

/// Read and parse the catalog at `path`.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog {}", path.display()))?;
    parse_catalog(&content).with_context(|| format!("Failed to parse catalog {}", path.display()))
}

/// Keep qualifying entries and flatten them into fetch records.
pub fn filter_records(entries: &[CatalogEntry], theme: &str, after: NaiveDate) -> Vec<FetchRecord> {
    entries
        .iter()
        .filter(|entry| entry.qualifies(theme, after))
        .flat_map(|entry| entry.records())
        .collect()
}

/// Load the catalog and return every record modified after `after`.
pub fn load_and_filter(path: &Path, theme: &str, after: NaiveDate) -> Result<Vec<FetchRecord>> {
    let entries = load_catalog(path)?;
    let records = filter_records(&entries, theme, after);

    info!(
        catalog = %path.display(),
        entries = entries.len(),
        records = records.len(),
        theme,
        after = %after,
        "Catalog filtered"
    );

    Ok(records)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn entry(title: &str, theme: &[&str], modified: &str, urls: &[&str]) -> serde_json::Value {
        json!({
            "title": title,
            "theme": theme,
            "modified": modified,
            "distribution": urls
                .iter()
                .map(|u| json!({"downloadURL": u, "mediaType": "text/csv"}))
                .collect::<Vec<_>>(),
        })
    }

    #[test]
    fn test_theme_and_date_are_both_required() {
        let doc = json!([
            entry("Hospital General Information", &["Hospitals"], "2024-06-01", &["https://x/e1.csv"]),
            entry("Nursing Staffing", &["Nursing"], "2024-06-01", &["https://x/e2.csv"]),
            entry("Old Hospital Survey", &["Hospitals"], "2023-12-31", &["https://x/e3.csv"]),
        ]);
        let entries = parse_catalog(&doc.to_string()).unwrap();

        let records = filter_records(&entries, "Hospitals", date("2024-01-01"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Hospital General Information");
        assert_eq!(records[0].url, "https://x/e1.csv");
    }

    #[test]
    fn test_modified_equal_to_watermark_is_excluded() {
        let doc = json!([entry("Same Day", &["Hospitals"], "2024-06-01", &["https://x/a.csv"])]);
        let entries = parse_catalog(&doc.to_string()).unwrap();

        assert!(filter_records(&entries, "Hospitals", date("2024-06-01")).is_empty());
        assert_eq!(filter_records(&entries, "Hospitals", date("2024-05-31")).len(), 1);
    }

    #[test]
    fn test_flattening() {
        let doc = json!([
            entry(
                "Timely and Effective Care",
                &["Hospitals"],
                "2024-03-05",
                &["https://x/1.csv", "https://x/2.csv", "https://x/3.csv"],
            ),
            entry("No Files Yet", &["Hospitals"], "2024-03-05", &[]),
        ]);
        let entries = parse_catalog(&doc.to_string()).unwrap();
        let records = filter_records(&entries, "Hospitals", date("2024-01-01"));

        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .all(|r| r.title == "Timely and Effective Care" && r.modified == date("2024-03-05")));
        let urls: std::collections::HashSet<_> = records.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls.len(), 3);
    }

    #[test]
    fn test_theme_match_is_exact() {
        let doc = json!([entry("A", &["hospitals", "Hospitals and Clinics"], "2024-06-01", &["https://x/a.csv"])]);
        let entries = parse_catalog(&doc.to_string()).unwrap();
        assert!(filter_records(&entries, "Hospitals", date("2000-01-01")).is_empty());
    }

    #[test]
    fn test_dcat_catalog_object() {
        let doc = json!({
            "@type": "dcat:Catalog",
            "dataset": [entry("A", &["Hospitals"], "2024-06-01", &["https://x/a.csv"])],
        });
        let entries = parse_catalog(&doc.to_string()).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_missing_optional_fields_and_api_distributions() {
        let doc = json!([
            {"title": "No theme", "modified": "2024-06-01"},
            {
                "title": "API only",
                "theme": ["Hospitals"],
                "modified": "2024-06-01T10:00:00Z",
                "distribution": [
                    {"accessURL": "https://x/api", "format": "API"},
                    {"downloadURL": "https://x/b.csv"},
                    {"downloadURL": "   "}
                ]
            }
        ]);
        let entries = parse_catalog(&doc.to_string()).unwrap();
        assert!(entries[0].theme.is_empty());
        assert!(entries[0].distribution.is_empty());

        let records = filter_records(&entries, "Hospitals", date("2024-01-01"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "https://x/b.csv");
        assert_eq!(records[0].modified, date("2024-06-01"));
    }

    #[test]
    fn test_malformed_documents_are_errors() {
        assert!(parse_catalog("{").is_err());
        assert!(parse_catalog(r#"{"entries": []}"#).is_err());
        assert!(parse_catalog(r#""just a string""#).is_err());
        assert!(parse_catalog(r#"[{"title": "Bad date", "modified": "June 1st"}]"#).is_err());
        assert!(parse_catalog(r#"[{"theme": ["Hospitals"], "modified": "2024-06-01"}]"#).is_err());
    }

    #[test]
    fn test_load_and_filter_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        let doc = json!([entry("A", &["Hospitals"], "2024-06-01", &["https://x/a.csv"])]);
        std::fs::write(&path, doc.to_string()).unwrap();

        let records = load_and_filter(&path, "Hospitals", date("2000-01-01")).unwrap();
        assert_eq!(records.len(), 1);

        assert!(load_and_filter(&dir.path().join("missing.json"), "Hospitals", date("2000-01-01")).is_err());
    }
}
