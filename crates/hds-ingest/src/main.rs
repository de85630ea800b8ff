//! HDS Ingest - incremental hospital dataset sync

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use hds_common::dates::{parse_catalog_date, DATE_FORMAT};
use hds_common::logging::{init_logging, LogConfig, LogLevel};
use hds_ingest::config::{AdvancePolicy, IngestConfig};
use hds_ingest::runner::IngestRunner;
use hds_ingest::watermark::WatermarkStore;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hds-ingest")]
#[command(author, version, about = "Incremental CMS hospital dataset sync")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every dataset modified since the last run
    Run {
        #[command(flatten)]
        overrides: ConfigOverrides,

        /// List qualifying records without downloading
        #[arg(long)]
        dry_run: bool,

        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Inspect or change the last-run watermark
    Watermark {
        /// Watermark file
        #[arg(long, global = true)]
        watermark: Option<PathBuf>,

        #[command(subcommand)]
        action: WatermarkAction,
    },
}

#[derive(Subcommand, Debug)]
enum WatermarkAction {
    /// Print the effective cutoff date
    Show,
    /// Overwrite the cutoff date
    Set {
        /// Date as YYYY-MM-DD
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,
    },
    /// Delete the watermark so the next run processes full history
    Reset,
}

/// Flags that take precedence over `HDS_*` environment variables
#[derive(Args, Debug)]
struct ConfigOverrides {
    /// Catalog metadata JSON
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Directory for cleaned CSV files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Watermark file
    #[arg(long)]
    watermark: Option<PathBuf>,

    /// Theme tag to sync
    #[arg(long)]
    theme: Option<String>,

    /// Concurrent downloads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Watermark behaviour after failures (retry-failed, unconditional)
    #[arg(long)]
    advance_policy: Option<AdvancePolicy>,
}

impl ConfigOverrides {
    fn apply(self, mut config: IngestConfig) -> IngestConfig {
        if let Some(path) = self.metadata {
            config = config.with_metadata_path(path);
        }
        if let Some(dir) = self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(path) = self.watermark {
            config = config.with_watermark_path(path);
        }
        if let Some(theme) = self.theme {
            config = config.with_theme(theme);
        }
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(policy) = self.advance_policy {
            config = config.with_advance_policy(policy);
        }
        config
    }
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_catalog_date(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("hds-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    match cli.command {
        Command::Run {
            overrides,
            dry_run,
            progress,
        } => {
            let config = overrides
                .apply(IngestConfig::new().merge_env()?)
                .with_progress(progress);

            let runner = IngestRunner::from_config(config)?;

            if dry_run {
                let plan = runner.plan()?;
                println!("cutoff: {}", plan.cutoff.format(DATE_FORMAT));
                for record in &plan.records {
                    println!(
                        "{}\t{}\t{}",
                        record.modified.format(DATE_FORMAT),
                        record.title,
                        record.url
                    );
                }
                println!("{} record(s) would be fetched", plan.records.len());
                return Ok(());
            }

            let run_date = chrono::Local::now().date_naive();
            let summary = runner.run(run_date).await?;

            for failure in &summary.failures {
                println!("FAILED {} ({}): {}", failure.title, failure.url, failure.reason);
            }
            println!(
                "{} saved, {} failed, watermark {}",
                summary.succeeded(),
                summary.failed(),
                summary.next_watermark.format(DATE_FORMAT)
            );
        },
        Command::Watermark { watermark, action } => {
            let path = match watermark {
                Some(path) => path,
                None => IngestConfig::new().merge_env()?.watermark_path,
            };
            let store = WatermarkStore::new(path);

            match action {
                WatermarkAction::Show => {
                    let date = store.load()?;
                    println!("{}", date.format(DATE_FORMAT));
                },
                WatermarkAction::Set { date } => {
                    store.save(date)?;
                    info!(last_run = %date, "Watermark set");
                },
                WatermarkAction::Reset => {
                    if store.reset()? {
                        info!(path = %store.path().display(), "Watermark removed");
                    } else {
                        info!(path = %store.path().display(), "No watermark to remove");
                    }
                },
            }
        },
    }

    Ok(())
}
