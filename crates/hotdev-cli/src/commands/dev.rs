//! Development server command.
//!
//! 1. Load and validate configuration
//! 2. Create the session around a [`MirrorCompiler`] and start it
//! 3. Wait for the first compile (skipped in lazy mode)
//! 4. Serve until Ctrl+C, then close the session

use crate::cli::DevArgs;
use crate::config::CliConfig;
use crate::error::{CliError, Result};
use crate::mirror::MirrorCompiler;
use crate::ui;
use hotdev::Hotdev;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// How many ports above the requested one are tried.
const PORT_ATTEMPTS: u16 = 10;

/// Execute the dev command.
pub async fn execute(args: DevArgs) -> Result<()> {
    ui::info("Starting development server...");

    let config = CliConfig::load(&args)?;
    config.validate()?;
    let session_config = config.session_config()?;

    let sources = config.mirror_sources();
    for source in &sources {
        ui::info(&format!(
            "Mirroring {} into {}",
            source.source.display(),
            source.target.output_path.display()
        ));
    }

    let compiler = MirrorCompiler::new(sources);
    let hotdev = Hotdev::new(&session_config, Arc::new(compiler))?;
    hotdev.start()?;

    if session_config.lazy {
        ui::info("Lazy mode: compiling on request");
    } else {
        let spinner = ui::Spinner::new("Compiling...");
        tokio::select! {
            result = hotdev.ready() => match result {
                Some(result) if result.has_errors() => {
                    spinner.clear();
                    ui::warning("Initial compile finished with errors");
                }
                Some(result) => spinner.finish(&format!(
                    "Compiled in {}",
                    ui::format_duration(std::time::Duration::from_millis(result.time_ms()))
                )),
                None => spinner.clear(),
            },
            _ = tokio::signal::ctrl_c() => {
                spinner.clear();
                hotdev.close();
                ui::info("Stopped before the first compile finished");
                return Ok(());
            }
        }
    }

    let listener = bind(config.port).await?;
    let addr = listener.local_addr()?;
    ui::success(&format!("Serving on http://{}", addr));
    ui::info(&format!(
        "Build events on http://{}{}",
        addr,
        hotdev.settings().hmr_path
    ));
    ui::info("Press Ctrl+C to stop");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = hotdev.router().layer(cors);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            ui::info("Shutting down development server...");
        })
        .await;

    hotdev.close();
    served.map_err(|e| CliError::Server(e.to_string()))?;

    ui::success("Development server stopped");
    Ok(())
}

/// Bind `127.0.0.1:port`, falling back to the next free port.
async fn bind(port: u16) -> Result<TcpListener> {
    if port < 1024 {
        ui::warning(&format!(
            "Port {} is in privileged range, may require root access",
            port
        ));
    }

    for offset in 0..=PORT_ATTEMPTS {
        let candidate = port.saturating_add(offset);
        let addr = SocketAddr::from(([127, 0, 0, 1], candidate));
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                if offset > 0 {
                    ui::warning(&format!(
                        "Port {} is busy, using port {} instead",
                        port, candidate
                    ));
                }
                return Ok(listener);
            }
            Err(e) => tracing::debug!("Port {} unavailable: {}", candidate, e),
        }
    }

    Err(CliError::Server(format!(
        "No free port between {} and {}",
        port,
        port.saturating_add(PORT_ATTEMPTS)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bind_falls_back_when_taken() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let listener = bind(port).await.unwrap();
        let bound = listener.local_addr().unwrap().port();
        assert_ne!(bound, port);
        assert!(bound > port && bound <= port.saturating_add(PORT_ATTEMPTS));
    }
}
