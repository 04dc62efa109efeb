//! The directory mirroring compiler.
//!
//! [`MirrorCompiler`] is the [`Compiler`] the CLI drives: each compile copies
//! every non-ignored file of each source directory into the artifact store
//! below the bundle's output path, replacing whatever the previous compile
//! left there. Watch mode recompiles on file changes.

use crate::config::MirrorSource;
use crate::watcher::{should_ignore, FileChange, FileWatcher};
use hotdev::{
    BundleStats, BundleTarget, CompileContext, CompileResult, Compiler, CompilerError, MemoryFs,
    WatchOptions, Watching,
};
use std::collections::BTreeMap;
use std::path::{Component, Path};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

/// Length of the hex bundle hash.
const HASH_LEN: usize = 20;

/// Mirrors source directories into the artifact store.
#[derive(Debug, Clone)]
pub struct MirrorCompiler {
    sources: Arc<Vec<MirrorSource>>,
    ignored: Arc<Vec<String>>,
}

impl MirrorCompiler {
    pub fn new(sources: Vec<MirrorSource>) -> Self {
        Self {
            sources: Arc::new(sources),
            ignored: Arc::new(Vec::new()),
        }
    }

    /// Patterns skipped by every compile, in addition to hidden files.
    pub fn with_ignored(mut self, ignored: Vec<String>) -> Self {
        self.ignored = Arc::new(ignored);
        self
    }

    pub fn sources(&self) -> &[MirrorSource] {
        &self.sources
    }
}

impl Compiler for MirrorCompiler {
    fn output(&self) -> BundleTarget {
        self.sources
            .first()
            .map(|source| source.target.clone())
            .unwrap_or_else(|| BundleTarget::new("/"))
    }

    fn bundles(&self) -> Vec<BundleTarget> {
        if self.sources.len() < 2 {
            return Vec::new();
        }
        self.sources.iter().map(|s| s.target.clone()).collect()
    }

    fn watch(
        &self,
        options: &WatchOptions,
        ctx: CompileContext,
    ) -> Result<Box<dyn Watching>, CompilerError> {
        let runtime = Handle::try_current().map_err(|e| CompilerError::Watch(e.to_string()))?;

        let mut ignored = self.ignored.as_ref().clone();
        ignored.extend(options.ignored.iter().cloned());
        let ignored = Arc::new(ignored);

        let mut roots = Vec::new();
        for source in self.sources.iter() {
            if source.source.is_dir() {
                roots.push(source.source.clone());
            } else {
                tracing::warn!("Not watching missing source {}", source.source.display());
            }
        }

        let poll = options.poll.map(Duration::from_millis);
        let (watcher, changes) = FileWatcher::new(roots, ignored.as_ref().clone(), poll)
            .map_err(|e| CompilerError::Watch(e.to_string()))?;

        let (trigger, triggers) = mpsc::unbounded_channel();
        let task = runtime.spawn(watch_loop(
            self.sources.clone(),
            ignored,
            ctx,
            changes,
            triggers,
            Duration::from_millis(options.aggregate_timeout),
        ));

        Ok(Box::new(MirrorWatching {
            _watcher: watcher,
            task,
            trigger,
        }))
    }

    fn run(&self, ctx: CompileContext) -> Result<(), CompilerError> {
        let sources = self.sources.clone();
        let ignored = self.ignored.clone();
        let job = move || {
            ctx.hooks.on_invalid();
            ctx.hooks.on_start();
            let result = compile(&sources, &ignored, &ctx.output);
            ctx.hooks.on_done(result);
        };

        match Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn_blocking(job);
            }
            Err(_) => job(),
        }
        Ok(())
    }

    fn format_stats(&self, result: &CompileResult, _options: &serde_json::Value) -> String {
        let mut lines = Vec::new();
        for bundle in result.bundles() {
            let name = bundle.name.as_deref().unwrap_or("mirror");
            lines.push(format!(
                "{}: {} files, hash {}",
                name,
                bundle.modules.len(),
                bundle.hash
            ));
            lines.extend(bundle.errors.iter().map(|e| format!("  error: {}", e)));
            lines.extend(bundle.warnings.iter().map(|w| format!("  warning: {}", w)));
        }
        lines.join("\n")
    }
}

/// Compile on start, then once per burst of changes.
async fn watch_loop(
    sources: Arc<Vec<MirrorSource>>,
    ignored: Arc<Vec<String>>,
    ctx: CompileContext,
    mut changes: mpsc::Receiver<FileChange>,
    mut triggers: mpsc::UnboundedReceiver<()>,
    aggregate: Duration,
) {
    compile_async(&sources, &ignored, &ctx).await;

    loop {
        tokio::select! {
            change = changes.recv() => {
                if change.is_none() {
                    break;
                }
            }
            trigger = triggers.recv() => {
                if trigger.is_none() {
                    break;
                }
            }
        }

        ctx.hooks.on_invalid();

        let deadline = tokio::time::sleep(aggregate);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => break,
                Some(_) = changes.recv() => {}
                Some(_) = triggers.recv() => {}
            }
        }

        compile_async(&sources, &ignored, &ctx).await;
    }
}

async fn compile_async(
    sources: &Arc<Vec<MirrorSource>>,
    ignored: &Arc<Vec<String>>,
    ctx: &CompileContext,
) {
    ctx.hooks.on_start();

    let sources = sources.clone();
    let ignored = ignored.clone();
    let output = ctx.output.clone();
    match tokio::task::spawn_blocking(move || compile(&sources, &ignored, &output)).await {
        Ok(result) => ctx.hooks.on_done(result),
        Err(e) => tracing::error!("Compile task failed: {}", e),
    }
}

/// A running watch. Dropping it stops the watch loop.
pub struct MirrorWatching {
    _watcher: FileWatcher,
    task: JoinHandle<()>,
    trigger: mpsc::UnboundedSender<()>,
}

impl Watching for MirrorWatching {
    fn invalidate(&self) {
        let _ = self.trigger.send(());
    }

    fn close(self: Box<Self>) {}
}

impl Drop for MirrorWatching {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Mirror every source into `output` and describe the result.
pub fn compile(sources: &[MirrorSource], ignored: &[String], output: &MemoryFs) -> CompileResult {
    CompileResult::multi(
        sources
            .iter()
            .map(|source| compile_bundle(source, ignored, output))
            .collect(),
    )
}

fn compile_bundle(source: &MirrorSource, ignored: &[String], output: &MemoryFs) -> BundleStats {
    let started = Instant::now();
    let target = &source.target.output_path;
    let mut hasher = blake3::Hasher::new();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    let mut modules = BTreeMap::new();

    let _ = output.remove_dir_all(target);
    if let Err(e) = output.create_dir_all(target) {
        errors.push(e.to_string());
    }

    if !source.source.is_dir() {
        errors.push(format!(
            "Source directory not found: {}",
            source.source.display()
        ));
    } else {
        let walker = WalkDir::new(&source.source)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || !entry
                        .path()
                        .strip_prefix(&source.source)
                        .is_ok_and(|rel| should_ignore(rel, ignored))
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    errors.push(e.to_string());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&source.source) else {
                continue;
            };
            let rel_name = slash_path(rel);

            let content = match std::fs::read(entry.path()) {
                Ok(content) => content,
                Err(e) => {
                    errors.push(format!("Failed to read {}: {}", rel_name, e));
                    continue;
                }
            };

            hasher.update(rel_name.as_bytes());
            hasher.update(&[0]);
            hasher.update(&content);
            if content.is_empty() {
                warnings.push(format!("Empty file: {}", rel_name));
            }

            let dest = target.join(rel);
            let written = match dest.parent() {
                Some(parent) => output.create_dir_all(parent),
                None => Ok(()),
            }
            .and_then(|()| output.write(&dest, content));
            if let Err(e) = written {
                errors.push(format!("Failed to write {}: {}", rel_name, e));
                continue;
            }

            modules.insert(modules.len().to_string(), rel_name);
        }
    }

    let hash = hasher.finalize().to_hex();
    let mut stats = BundleStats::new(&hash.as_str()[..HASH_LEN]);
    stats.name = source.target.name.clone();
    stats.time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    stats.warnings = warnings;
    stats.errors = errors;
    stats.modules = modules;
    stats
}

fn slash_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
