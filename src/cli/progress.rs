//! CLI-specific progress handling for tripcost-fetch
//!
//! Tracks distance-matrix requests issued during a route run.

use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tripcost_fetch::ProgressCallback;

/// Creates a progress bar counting sub-queries
pub fn create_progress_bar(total_requests: u64) -> ProgressBar {
    let pb = ProgressBar::new(total_requests);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} requests ETA: {eta}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Progress manager for a route run
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(total_requests: u64, message: &str) -> Self {
        let pb = create_progress_bar(total_requests);

        eprintln!("{message}");

        Self { pb }
    }

    /// Callback that advances the bar as sub-queries complete
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        Arc::new(move |completed, total| {
            if pb.length().unwrap_or(0) != total {
                pb.set_length(total);
            }
            pb.set_position(completed);
            if completed >= total {
                pb.finish_with_message("✅ All requests issued");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_progress_bar() {
        let pb = create_progress_bar(4);
        assert_eq!(pb.length().unwrap(), 4);

        pb.set_position(2);
        pb.finish();
    }

    #[test]
    fn test_callback_tracks_requests() {
        let manager = ProgressManager::new(0, "Test run");
        let callback = manager.callback();

        callback(1, 4);
        assert_eq!(manager.pb.length().unwrap(), 4);
        assert_eq!(manager.pb.position(), 1);

        callback(4, 4);
        assert!(manager.pb.is_finished());
    }
}
