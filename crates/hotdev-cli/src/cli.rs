//! Command-line interface definition.
//!
//! - `hotdev dev` - mirror, watch and serve
//! - `hotdev check` - validate the configuration and print the mappings

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// hotdev - serve watched build output from memory
#[derive(Parser, Debug)]
#[command(
    name = "hotdev",
    version,
    about = "Serve watched build output from memory with live reload events"
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the development server
    ///
    /// Mirrors the configured sources into memory, recompiles on change and
    /// serves the output with an event stream for live reload.
    Dev(DevArgs),

    /// Validate configuration
    ///
    /// Loads hotdev.config.json, validates it and prints how URLs map onto
    /// sources.
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct DevArgs {
    /// Path to the config file (defaults to ./hotdev.config.json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Port to listen on; the next free port within +10 is used if taken
    #[arg(short, long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Working directory that sources are resolved against
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Compile on request instead of on change
    #[arg(long)]
    pub lazy: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// Path to the config file (defaults to ./hotdev.config.json)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
