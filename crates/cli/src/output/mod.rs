//! Output formatting utilities
//!
//! This module provides formatters for CLI output in both human-readable
//! and JSON formats. It also handles progress bars and colored output.

mod formatter;
mod listing;
mod progress;

pub use formatter::Formatter;
pub use listing::{BucketView, CredentialView, ListingView};
pub use progress::ProgressBar;

use mys3_core::Config;

/// Output configuration derived from CLI flags and config defaults
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress bar
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}

impl OutputConfig {
    /// Fill in settings the flags left off from the config file
    pub fn with_defaults(mut self, config: &Config) -> Self {
        self.json |= config.defaults.output == "json";
        self.no_color |= config.defaults.color == "never";
        self.no_progress |= !config.defaults.progress;
        self
    }
}
