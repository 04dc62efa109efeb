//! Check command implementation.
//!
//! Loads and validates the configuration without starting anything, then
//! prints how URLs map onto sources.

use crate::cli::CheckArgs;
use crate::config::CliConfig;
use crate::error::Result;
use crate::ui;
use hotdev::{IndexFile, PublicPathMapping};

/// Execute the check command.
///
/// Missing source directories are reported as warnings; the mirror compiler
/// reports them as compile errors at run time.
pub async fn execute(args: CheckArgs) -> Result<()> {
    ui::info("Checking configuration...");

    let config = CliConfig::load_with(args.config.as_deref(), None, None)?;
    config.validate()?;
    let session = config.session_config()?;

    println!("Mappings:");
    for source in config.mirror_sources() {
        let mapping = PublicPathMapping::from(&source.target);
        let public_path = mapping.public_path.as_deref().unwrap_or("/");
        ui::print_mapping(
            public_path,
            &source.source.display().to_string(),
            &mapping.output_path.display().to_string(),
        );
        if !source.source.is_dir() {
            ui::warning(&format!(
                "Source directory does not exist yet: {}",
                source.source.display()
            ));
        }
    }

    println!("Session:");
    println!("  mode: {}", if session.lazy { "lazy" } else { "watch" });
    println!("  event stream: {}", session.hmr_path);
    println!("  heartbeat: {}ms", session.heartbeat);
    match &session.index {
        IndexFile::Disabled => println!("  index: disabled"),
        IndexFile::Name(name) => println!("  index: {}", name),
    }
    println!("  server-side render: {}", session.server_side_render);
    println!("  port: {}", config.port);

    ui::success("Configuration is valid!");
    Ok(())
}
