//! Spinner shown while waiting for the first compile.

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Spinner for a task of unknown duration. Hidden when stderr is not a
/// terminal.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let pb = if console::user_attended_stderr() {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_strings(&["◐", "◓", "◑", "◒", "●"]));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Self { pb }
    }

    pub fn set_message(&self, message: &str) {
        self.pb.set_message(message.to_string());
    }

    /// Stop and replace the spinner with a success line.
    pub fn finish(self, message: &str) {
        self.pb
            .finish_with_message(format!("{} {}", "✓".green().bold(), message));
    }

    /// Stop and remove the spinner without a message.
    pub fn clear(self) {
        self.pb.finish_and_clear();
    }
}
