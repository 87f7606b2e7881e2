pub mod logging;
pub mod progress_config;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Adds a counting bar to `multi_progress`, or returns None when progress is off.
pub fn stage_progress_bar(
    multi_progress: &Option<MultiProgress>,
    len: u64,
    message: &str,
) -> Option<ProgressBar> {
    let mp = multi_progress.as_ref()?;
    let pb = mp.add(ProgressBar::new(len));
    let style = ProgressStyle::default_bar()
        .template("    {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    Some(pb)
}
