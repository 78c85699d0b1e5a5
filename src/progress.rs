//! Progress reporting: a record-count spinner for fetch loops and a count bar
//! for consolidation, optionally attached to one shared `MultiProgress`.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Optional global MultiProgress that allows multiple bars to render concurrently.
/// If unset, progress bars draw to the default terminal target.
static GLOBAL_MP: OnceLock<Arc<MultiProgress>> = OnceLock::new();

/// Install a global MultiProgress used by all subsequently created progress bars.
/// Safe to call once; additional calls are ignored.
pub fn set_global_multiprogress(mp: Arc<MultiProgress>) {
    let _ = GLOBAL_MP.set(mp);
}

fn attach(pb: ProgressBar) -> ProgressBar {
    match GLOBAL_MP.get() {
        Some(mp) => mp.add(pb),
        None => pb,
    }
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
}

/// Count-style progress bar (items processed out of total), with an optional label.
pub fn make_count_progress(total: u64, label: &str) -> ProgressBar {
    let pb = attach(ProgressBar::new(total));
    pb.set_style(style(
        "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
         it/s: {per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}",
    ));
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Open-ended spinner counting fetched records; the prefix shows where the cursor is.
pub fn make_fetch_spinner(label: &str) -> ProgressBar {
    let pb = attach(ProgressBar::new_spinner());
    pb.set_style(style("{spinner:.green} {msg} {pos} records  [{prefix}]  elapsed: {elapsed_precise}"));
    pb.set_message(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
