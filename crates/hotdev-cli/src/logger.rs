//! Logging setup for the hotdev CLI.
//!
//! Session and compiler events are emitted with `tracing` by the core crate;
//! this installs the subscriber that prints them.
//!
//! # Example
//!
//! ```rust,no_run
//! use hotdev_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("Starting dev server");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "hotdev=debug,hotdev_cli=debug";
const QUIET_FILTER: &str = "hotdev=error,hotdev_cli=error";
const DEFAULT_FILTER: &str = "hotdev=info,hotdev_cli=info";

/// Pick the log filter.
///
/// 1. `--verbose`: debug for hotdev crates
/// 2. `--quiet`: errors only
/// 3. `RUST_LOG`, if set and valid
/// 4. info for hotdev crates
pub fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the global tracing subscriber. Call once, early in `main`.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Initialize the global tracing subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Whether log output should be colored.
///
/// `NO_COLOR` disables colors, `FORCE_COLOR` forces them, otherwise the
/// terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
