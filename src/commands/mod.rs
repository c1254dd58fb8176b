//! Command line subcommands

mod confirm;
mod download;
mod trajectory;

pub use confirm::*;
pub use download::*;
pub use trajectory::*;

use indicatif::{ProgressBar, ProgressStyle};

fn progress_bar(len: u64) -> ProgressBar {
    let progress = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(
        "{elapsed_precise} {bar:40.cyan/blue} {pos}/{len} {percent}% ETA {eta_precise}",
    ) {
        progress.set_style(style.progress_chars("##-"));
    }
    progress
}
