//! The compiler seam.
//!
//! A [`Compiler`] writes its output into the session's [`MemoryFs`] and
//! reports its lifecycle through [`CompileHooks`]:
//!
//! - `on_invalid` when sources changed, or right before a run
//! - `on_start` when a compile begins
//! - `on_done` with the finished [`CompileResult`]
//!
//! Diagnostics travel inside the result. A compile with errors still calls
//! `on_done`.

use crate::config::WatchOptions;
use crate::error::CompilerError;
use crate::session::CompileHooks;
use crate::stats::CompileResult;
use crate::store::MemoryFs;
use std::path::PathBuf;

/// Where one bundle is written and the URL prefix it is served under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleTarget {
    pub name: Option<String>,
    pub public_path: Option<String>,
    /// Absolute directory in the artifact store
    pub output_path: PathBuf,
}

impl BundleTarget {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            public_path: None,
            output_path: output_path.into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_public_path(mut self, public_path: impl Into<String>) -> Self {
        self.public_path = Some(public_path.into());
        self
    }
}

/// Everything a compiler needs to report back to the session.
#[derive(Clone)]
pub struct CompileContext {
    /// Output file system shared with the request path
    pub output: MemoryFs,
    pub hooks: CompileHooks,
}

/// An external compiler driven by the session.
pub trait Compiler: Send + Sync + 'static {
    /// The default output mapping.
    fn output(&self) -> BundleTarget;

    /// Per-bundle mappings of a multi-bundle compiler, tried before
    /// [`output`](Compiler::output).
    fn bundles(&self) -> Vec<BundleTarget> {
        Vec::new()
    }

    /// Start watch mode. Compiles keep coming until the handle is closed.
    fn watch(
        &self,
        options: &WatchOptions,
        ctx: CompileContext,
    ) -> Result<Box<dyn Watching>, CompilerError>;

    /// Start one compile. Completion is reported through the hooks, so this
    /// may return before the compile has finished.
    fn run(&self, ctx: CompileContext) -> Result<(), CompilerError>;

    /// Human-readable rendering of a result for the log.
    fn format_stats(&self, result: &CompileResult, _options: &serde_json::Value) -> String {
        result.summary()
    }
}

/// A running watch.
pub trait Watching: Send {
    /// Force a recompile as if sources changed.
    fn invalidate(&self);

    /// Stop watching. Hooks that still fire afterwards are ignored by a
    /// closed session.
    fn close(self: Box<Self>);
}
