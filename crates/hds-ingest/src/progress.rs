//! Progress bar for dispatched records

use indicatif::{ProgressBar, ProgressStyle};

const RECORD_TEMPLATE: &str =
    "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})";

/// Bar over `total` records, or a hidden bar that swallows updates when
/// `visible` is false.
pub fn record_progress(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::default_bar()
        .template(RECORD_TEMPLATE)
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());

    let pb = ProgressBar::new(total);
    pb.set_style(style);
    pb.set_message("Fetching datasets");
    pb
}
