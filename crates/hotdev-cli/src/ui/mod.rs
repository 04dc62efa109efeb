//! Terminal output for the hotdev CLI.
//!
//! Status lines go to stderr so that stdout stays clean for `check` output.
//!
//! ```no_run
//! use hotdev_cli::ui;
//!
//! ui::init_colors();
//! let spinner = ui::Spinner::new("Compiling...");
//! spinner.finish("Compiled");
//! ui::success("Ready");
//! ```

mod messages;
mod spinner;

pub use messages::{error, info, success, warning};
pub use spinner::Spinner;

use owo_colors::OwoColorize;
use std::time::Duration;

/// Whether colored output should be used on stderr.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

/// Apply the color decision to `owo-colors` and `console`.
pub fn init_colors() {
    let enabled = should_use_color();
    console::set_colors_enabled_stderr(enabled);
    owo_colors::set_override(enabled);
}

/// Format a duration as `850ms` or `1.25s`.
pub fn format_duration(duration: Duration) -> String {
    let ms = duration.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Print one `url -> source` mapping line to stdout.
pub fn print_mapping(public_path: &str, source: &str, output_path: &str) {
    println!(
        "  {} {} {} {}",
        public_path.cyan().bold(),
        "->".dimmed(),
        source,
        format!("({})", output_path).dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(1250)), "1.25s");
    }
}
