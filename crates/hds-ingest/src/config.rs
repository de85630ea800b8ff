//! Ingest run configuration
//!
//! Every path and tuning knob of a run lives in [`IngestConfig`] so the runner
//! can be pointed at scratch directories and mock servers in tests.

use hds_common::{HdsError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Ingest Configuration Constants
// ============================================================================

/// Catalog export read when no path is configured.
pub const DEFAULT_METADATA_PATH: &str = "CMS_Metastore.json";

/// Directory that receives cleaned CSV files.
pub const DEFAULT_OUTPUT_DIR: &str = "processed_csvs";

/// File holding the last successful run date.
pub const DEFAULT_WATERMARK_PATH: &str = "last_run.json";

/// Theme tag an entry must carry to be synced.
pub const DEFAULT_THEME: &str = "Hospitals";

/// Concurrent downloads.
pub const DEFAULT_WORKERS: usize = 5;

/// Per-request timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// How far the watermark moves after a run with failed records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AdvancePolicy {
    /// Hold the watermark just below the oldest failed entry so it is picked
    /// up again next run. Entries modified after it are re-fetched as well.
    #[default]
    RetryFailed,
    /// Always move to the run date. Failed records are not retried unless
    /// their entry is modified again upstream.
    Unconditional,
}

impl std::str::FromStr for AdvancePolicy {
    type Err = HdsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "retry-failed" | "retry" => Ok(AdvancePolicy::RetryFailed),
            "unconditional" | "always" => Ok(AdvancePolicy::Unconditional),
            _ => Err(HdsError::config(format!(
                "Invalid advance policy '{}': expected 'retry-failed' or 'unconditional'",
                s
            ))),
        }
    }
}

impl std::fmt::Display for AdvancePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdvancePolicy::RetryFailed => write!(f, "retry-failed"),
            AdvancePolicy::Unconditional => write!(f, "unconditional"),
        }
    }
}

/// Ingest run configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Catalog metadata document (JSON)
    pub metadata_path: PathBuf,

    /// Output directory for cleaned CSV files
    pub output_dir: PathBuf,

    /// Watermark file location
    pub watermark_path: PathBuf,

    /// Theme tag filter (exact match)
    pub theme: String,

    /// Maximum concurrent fetches
    pub worker_count: usize,

    /// Timeout applied to every HTTP request
    pub http_timeout: Duration,

    /// Watermark behaviour after partial failure
    pub advance_policy: AdvancePolicy,

    /// Draw a progress bar over dispatched records
    pub show_progress: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            metadata_path: PathBuf::from(DEFAULT_METADATA_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            watermark_path: PathBuf::from(DEFAULT_WATERMARK_PATH),
            theme: DEFAULT_THEME.to_string(),
            worker_count: DEFAULT_WORKERS,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            advance_policy: AdvancePolicy::default(),
            show_progress: false,
        }
    }
}

impl IngestConfig {
    /// Create new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load config from environment variables
    ///
    /// - `HDS_METADATA_PATH`
    /// - `HDS_OUTPUT_DIR`
    /// - `HDS_WATERMARK_PATH`
    /// - `HDS_THEME`
    /// - `HDS_WORKERS`
    /// - `HDS_HTTP_TIMEOUT_SECS`
    /// - `HDS_ADVANCE_POLICY`
    pub fn from_env() -> Result<Self> {
        let config = Self::new().merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `HDS_*` overrides without validating, so later overrides (CLI
    /// flags) can still replace an out-of-range value.
    pub fn merge_env(self) -> Result<Self> {
        let mut config = self;

        if let Ok(path) = std::env::var("HDS_METADATA_PATH") {
            config.metadata_path = PathBuf::from(path);
        }

        if let Ok(dir) = std::env::var("HDS_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        if let Ok(path) = std::env::var("HDS_WATERMARK_PATH") {
            config.watermark_path = PathBuf::from(path);
        }

        if let Ok(theme) = std::env::var("HDS_THEME") {
            config.theme = theme;
        }

        if let Ok(workers) = std::env::var("HDS_WORKERS") {
            config.worker_count = workers.trim().parse().map_err(|_| {
                HdsError::config(format!("HDS_WORKERS must be a positive integer, got '{}'", workers))
            })?;
        }

        if let Ok(secs) = std::env::var("HDS_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                HdsError::config(format!(
                    "HDS_HTTP_TIMEOUT_SECS must be a number of seconds, got '{}'",
                    secs
                ))
            })?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Ok(policy) = std::env::var("HDS_ADVANCE_POLICY") {
            config.advance_policy = policy.parse()?;
        }

        Ok(config)
    }

    /// Set catalog path
    pub fn with_metadata_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = path.into();
        self
    }

    /// Set output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set watermark file
    pub fn with_watermark_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.watermark_path = path.into();
        self
    }

    /// Set theme filter
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    /// Set concurrency level
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.worker_count = workers;
        self
    }

    /// Set per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Set watermark advance policy
    pub fn with_advance_policy(mut self, policy: AdvancePolicy) -> Self {
        self.advance_policy = policy;
        self
    }

    /// Enable the dispatch progress bar
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Reject settings that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(HdsError::config("worker_count must be at least 1"));
        }
        if self.http_timeout.is_zero() {
            return Err(HdsError::config("http_timeout must be greater than zero"));
        }
        if self.theme.trim().is_empty() {
            return Err(HdsError::config("theme must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: [&str; 7] = [
        "HDS_METADATA_PATH",
        "HDS_OUTPUT_DIR",
        "HDS_WATERMARK_PATH",
        "HDS_THEME",
        "HDS_WORKERS",
        "HDS_HTTP_TIMEOUT_SECS",
        "HDS_ADVANCE_POLICY",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_defaults() {
        let config = IngestConfig::new();
        assert_eq!(config.metadata_path, PathBuf::from("CMS_Metastore.json"));
        assert_eq!(config.output_dir, PathBuf::from("processed_csvs"));
        assert_eq!(config.watermark_path, PathBuf::from("last_run.json"));
        assert_eq!(config.theme, "Hospitals");
        assert_eq!(config.worker_count, 5);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.advance_policy, AdvancePolicy::RetryFailed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = IngestConfig::new()
            .with_metadata_path("/data/catalog.json")
            .with_output_dir("/data/out")
            .with_watermark_path("/data/state.json")
            .with_theme("Nursing homes")
            .with_workers(2)
            .with_timeout(Duration::from_secs(5))
            .with_advance_policy(AdvancePolicy::Unconditional)
            .with_progress(true);

        assert_eq!(config.metadata_path, PathBuf::from("/data/catalog.json"));
        assert_eq!(config.output_dir, PathBuf::from("/data/out"));
        assert_eq!(config.watermark_path, PathBuf::from("/data/state.json"));
        assert_eq!(config.theme, "Nursing homes");
        assert_eq!(config.worker_count, 2);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.advance_policy, AdvancePolicy::Unconditional);
        assert!(config.show_progress);
    }

    #[test]
    fn test_validate_rejects_degenerate_settings() {
        assert!(IngestConfig::new().with_workers(0).validate().is_err());
        assert!(IngestConfig::new()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(IngestConfig::new().with_theme("  ").validate().is_err());
    }

    #[test]
    fn test_advance_policy_parse() {
        assert_eq!(
            "retry-failed".parse::<AdvancePolicy>().unwrap(),
            AdvancePolicy::RetryFailed
        );
        assert_eq!(
            "RETRY_FAILED".parse::<AdvancePolicy>().unwrap(),
            AdvancePolicy::RetryFailed
        );
        assert_eq!(
            "unconditional".parse::<AdvancePolicy>().unwrap(),
            AdvancePolicy::Unconditional
        );
        assert!("sometimes".parse::<AdvancePolicy>().is_err());
        assert_eq!(AdvancePolicy::Unconditional.to_string(), "unconditional");
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        clear_env();
        std::env::set_var("HDS_METADATA_PATH", "/tmp/meta.json");
        std::env::set_var("HDS_OUTPUT_DIR", "/tmp/out");
        std::env::set_var("HDS_WORKERS", "12");
        std::env::set_var("HDS_HTTP_TIMEOUT_SECS", "45");
        std::env::set_var("HDS_ADVANCE_POLICY", "unconditional");

        let config = IngestConfig::from_env().unwrap();
        assert_eq!(config.metadata_path, PathBuf::from("/tmp/meta.json"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.watermark_path, PathBuf::from(DEFAULT_WATERMARK_PATH));
        assert_eq!(config.worker_count, 12);
        assert_eq!(config.http_timeout, Duration::from_secs(45));
        assert_eq!(config.advance_policy, AdvancePolicy::Unconditional);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_from_env_rejects_bad_numbers() {
        clear_env();

        std::env::set_var("HDS_WORKERS", "five");
        assert!(matches!(IngestConfig::from_env(), Err(HdsError::Config(_))));

        std::env::set_var("HDS_WORKERS", "0");
        assert!(IngestConfig::from_env().is_err());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_merge_env_defers_validation() {
        clear_env();
        std::env::set_var("HDS_WORKERS", "0");

        let config = IngestConfig::new().merge_env().unwrap();
        assert_eq!(config.worker_count, 0);
        assert!(config.with_workers(3).validate().is_ok());

        std::env::set_var("HDS_WORKERS", "many");
        assert!(IngestConfig::new().merge_env().is_err());

        clear_env();
    }
}
