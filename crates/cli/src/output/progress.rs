//! Progress bar utilities for uploads
//!
//! The object store reports upload progress as a percentage, so bars here
//! count from 0 to 100 rather than in bytes.

use std::sync::Arc;

use mys3_core::ProgressFn;

use super::OutputConfig;

/// Progress bar wrapper
///
/// Handles progress display based on output configuration.
/// In quiet or JSON mode, progress is suppressed.
#[derive(Debug, Clone)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a percentage bar labelled with `message`
    pub fn percent(config: &OutputConfig, message: &str) -> Self {
        let bar = if config.quiet || config.json || config.no_progress {
            None
        } else {
            let bar = indicatif::ProgressBar::new(100);
            bar.set_style(
                indicatif::ProgressStyle::default_bar()
                    .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos:>3}%")
                    .expect("valid template")
                    .progress_chars("#>-"),
            );
            bar.set_message(message.to_string());
            Some(bar)
        };

        Self { bar }
    }

    /// Update progress
    pub fn set_position(&self, pos: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(pos);
        }
    }

    /// Callback feeding percentages reported by the object store into this bar
    pub fn callback(&self) -> ProgressFn {
        let bar = self.clone();
        Arc::new(move |percent| bar.set_position(u64::from(percent.min(100))))
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Check if progress bar is visible
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }

    #[cfg(test)]
    fn position(&self) -> Option<u64> {
        self.bar.as_ref().map(|b| b.position())
    }
}
