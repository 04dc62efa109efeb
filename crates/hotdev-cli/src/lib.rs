//! hotdev CLI - serve a source directory from memory while it changes.
//!
//! The CLI mirrors one or more source directories into a hotdev session's
//! in-memory store, watches them for changes, and serves the result over
//! HTTP together with a live build event stream.
//!
//! - [`cli`] - argument definitions
//! - [`commands`] - `dev` and `check`
//! - [`config`] - `hotdev.config.json` loading
//! - [`mirror`] - the directory mirroring compiler
//! - [`watcher`] - file system watching
//! - [`error`], [`logger`], [`ui`] - ambient plumbing

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod mirror;
pub mod ui;
pub mod watcher;

pub use error::{CliError, Result, ResultExt};
