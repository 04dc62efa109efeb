//! hotdev - serve watch-mode build output straight from memory.
//!
//! A [`Hotdev`] session sits between an external [`Compiler`] and an HTTP
//! server. The compiler writes its output into an in-memory [`MemoryFs`] and
//! reports its lifecycle through [`CompileHooks`]; the session tracks whether
//! the output is current and holds requests back while it is not.
//!
//! # Architecture
//!
//! - [`state`] - compile state machine and the queue of waiting requests
//! - [`store`] - hierarchical in-memory artifact store
//! - [`resolve`] - request URL to store path mapping
//! - [`range`] - single byte range support
//! - [`events`] - server-sent build notifications with heartbeat
//! - [`coordinator`] - per-request decisions: serve, wait or pass on
//! - [`server`] - axum middleware and event-stream endpoint
//! - [`config`] - configuration and its validated form
//!
//! # Example
//!
//! ```rust,no_run
//! use hotdev::{Compiler, Hotdev, HotdevConfig};
//! use std::sync::Arc;
//!
//! async fn serve(compiler: Arc<dyn Compiler>) -> hotdev::Result<()> {
//!     let hotdev = Hotdev::new(&HotdevConfig::default(), compiler)?;
//!     hotdev.start()?;
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, hotdev.router()).await?;
//!     Ok(())
//! }
//! ```

pub mod compiler;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod mime;
pub mod range;
pub mod resolve;
pub mod server;
pub mod session;
pub mod state;
pub mod stats;
pub mod store;

pub use compiler::{BundleTarget, CompileContext, Compiler, Watching};
pub use config::{HotdevConfig, IndexFile, LazyFilter, Settings, WatchOptions};
pub use coordinator::{AssetRequest, Outcome};
pub use error::{CompilerError, ConfigError, HotdevError, Result, StoreError};
pub use events::{Action, EventStream, Payload};
pub use resolve::{AssetResolver, PublicPathMapping, ResolvedAsset};
pub use session::{CompileHooks, Hotdev};
pub use state::{CompileState, CompileStatus};
pub use stats::{BundleStats, CompileResult};
pub use store::MemoryFs;
