//! Command implementations for the hotdev CLI.
//!
//! - [`dev`] - mirror, watch and serve
//! - [`check`] - configuration validation
//!
//! Each command provides an `execute` function taking its parsed arguments.

pub mod check;
pub mod dev;

pub use check::execute as check_execute;
pub use dev::execute as dev_execute;
