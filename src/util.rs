use std::time::{SystemTime, UNIX_EPOCH};

use indicatif::{ProgressBar, ProgressStyle};

/// Generates a microsecond-precision timestamp representing the current system time.
///
/// Used as the run identifier in the run report. Returns 0 if the system clock
/// is set before the Unix epoch.
pub fn generate_timestamp_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_micros() as u64)
        .unwrap_or(0)
}

/// Local wall-clock time formatted for report headers, e.g. `2024-09-19 14:02:11`.
pub fn report_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Creates a progress bar in the crate's standard style.
///
/// # Arguments
///
/// * `len` - Number of steps
/// * `message` - Label shown next to the bar
/// * `visible` - When false a hidden bar is returned, so callers never need to
///   branch on whether progress is shown
pub fn progress_bar(len: u64, message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
    {
        pb.set_style(style.progress_chars("=>-"));
    }
    pb.set_message(message.to_string());
    pb
}

#[cfg(test)]
mod test_util {
    use super::*;

    #[test]
    fn test_timestamps() {
        let first = generate_timestamp_us();
        let second = generate_timestamp_us();
        assert!(second >= first);
        // YYYY-mm-dd HH:MM:SS
        assert_eq!(report_timestamp().len(), 19);
    }

    #[test]
    fn test_hidden_progress_bar() {
        let pb = progress_bar(10, "noop", false);
        pb.inc(3);
        assert!(pb.is_hidden());
    }
}
