//! Shared test compiler.
//!
//! `TestCompiler` writes a fixed set of files into the store. Watch mode only
//! captures the context so the test can drive the hooks; `run` compiles
//! synchronously, the way a fast one-shot compiler would.

#![allow(dead_code)]

use bytes::Bytes;
use hotdev::{
    BundleStats, BundleTarget, CompileContext, CompileResult, Compiler, CompilerError,
    WatchOptions, Watching,
};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub struct TestCompiler {
    output: BundleTarget,
    bundles: Vec<BundleTarget>,
    files: Mutex<Vec<(String, Bytes)>>,
    ctx: Mutex<Option<CompileContext>>,
    runs: AtomicUsize,
    failing_runs: AtomicUsize,
    compiles: AtomicUsize,
    pub invalidations: Arc<AtomicUsize>,
}

impl TestCompiler {
    pub fn new(output: BundleTarget) -> Self {
        Self {
            output,
            bundles: Vec::new(),
            files: Mutex::new(Vec::new()),
            ctx: Mutex::new(None),
            runs: AtomicUsize::new(0),
            failing_runs: AtomicUsize::new(0),
            compiles: AtomicUsize::new(0),
            invalidations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_bundles(mut self, bundles: Vec<BundleTarget>) -> Self {
        self.bundles = bundles;
        self
    }

    /// Absolute store path and content written on every compile.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.set_file(path, content);
        self
    }

    pub fn set_file(&self, path: &str, content: &str) {
        let mut files = self.files.lock();
        files.retain(|(p, _)| p != path);
        files.push((path.to_string(), Bytes::from(content.to_string())));
    }

    /// Make the next `count` calls to `run` fail without compiling.
    pub fn fail_runs(&self, count: usize) {
        self.failing_runs.store(count, Ordering::SeqCst);
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn ctx(&self) -> CompileContext {
        self.ctx.lock().clone().expect("compiler was never started")
    }

    /// Write all files and build the result, without touching the hooks.
    pub fn emit(&self, ctx: &CompileContext) -> CompileResult {
        let n = self.compiles.fetch_add(1, Ordering::SeqCst);
        let mut stats = BundleStats::new(format!("{:020x}", n + 1)).with_time(5);
        for (index, (path, content)) in self.files.lock().iter().enumerate() {
            if let Some(parent) = Path::new(path).parent() {
                ctx.output.create_dir_all(parent).unwrap();
            }
            ctx.output.write(path, content.clone()).unwrap();
            stats = stats.with_module(index.to_string(), path.clone());
        }
        CompileResult::single(stats)
    }

    /// A full compile through the captured hooks.
    pub fn compile(&self) {
        let ctx = self.ctx();
        ctx.hooks.on_start();
        let result = self.emit(&ctx);
        ctx.hooks.on_done(result);
    }
}

struct TestWatching {
    invalidations: Arc<AtomicUsize>,
}

impl Watching for TestWatching {
    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }

    fn close(self: Box<Self>) {}
}

impl Compiler for TestCompiler {
    fn output(&self) -> BundleTarget {
        self.output.clone()
    }

    fn bundles(&self) -> Vec<BundleTarget> {
        self.bundles.clone()
    }

    fn watch(
        &self,
        _options: &WatchOptions,
        ctx: CompileContext,
    ) -> Result<Box<dyn Watching>, CompilerError> {
        *self.ctx.lock() = Some(ctx);
        Ok(Box::new(TestWatching {
            invalidations: Arc::clone(&self.invalidations),
        }))
    }

    fn run(&self, ctx: CompileContext) -> Result<(), CompilerError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_runs
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(CompilerError::Run("compiler unavailable".to_string()));
        }
        *self.ctx.lock() = Some(ctx.clone());
        ctx.hooks.on_invalid();
        ctx.hooks.on_start();
        let result = self.emit(&ctx);
        ctx.hooks.on_done(result);
        Ok(())
    }
}

/// Let spawned tasks (the deferred flush, waiting requests) make progress.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
