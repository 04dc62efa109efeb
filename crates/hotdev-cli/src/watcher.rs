//! File system watching for the mirror compiler.
//!
//! Watches every source directory recursively and forwards relevant changes
//! through a channel. Bursts are not debounced here; the mirror compiler
//! aggregates them for `watchOptions.aggregateTimeout`.

use crate::error::{CliError, Result};
use notify::{Config, Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Change events are dropped, not queued, once this many are pending.
const CHANNEL_CAPACITY: usize = 256;

/// File change event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    /// Get the path affected by this change.
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Recursive watcher over one or more roots.
///
/// Dropping it stops watching.
pub struct FileWatcher {
    _watcher: Box<dyn Watcher + Send>,
    roots: Vec<PathBuf>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Start watching `roots`.
    ///
    /// `poll` selects a polling watcher with that interval instead of native
    /// file events. Every root must exist.
    pub fn new(
        roots: Vec<PathBuf>,
        ignore_patterns: Vec<String>,
        poll: Option<Duration>,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if let Some(missing) = roots.iter().find(|root| !root.exists()) {
            return Err(CliError::FileNotFound(missing.clone()));
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let watched = roots.clone();

        let handler = move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("File watcher error: {}", e);
                    return;
                }
            };
            for path in &event.paths {
                if is_ignored(path, &watched, &ignore_patterns) {
                    continue;
                }
                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path.clone()),
                    EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };
                tracing::debug!("File changed: {}", change.path().display());
                let _ = tx.try_send(change);
            }
        };

        let mut watcher: Box<dyn Watcher + Send> = match poll {
            Some(interval) => Box::new(PollWatcher::new(
                handler,
                Config::default().with_poll_interval(interval),
            )?),
            None => Box::new(notify::recommended_watcher(handler)?),
        };

        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }

        Ok((
            Self {
                _watcher: watcher,
                roots,
            },
            rx,
        ))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Paths outside every root are ignored, the rest go through
/// [`should_ignore`] relative to their root.
fn is_ignored(path: &Path, roots: &[PathBuf], patterns: &[String]) -> bool {
    roots
        .iter()
        .find_map(|root| path.strip_prefix(root).ok())
        .is_none_or(|rel| should_ignore(rel, patterns))
}

/// Check a root-relative path against the ignore patterns.
///
/// `*.ext` matches by suffix; any other pattern matches a leading or inner
/// path segment. Hidden files and directories are always ignored.
pub fn should_ignore(rel_path: &Path, patterns: &[String]) -> bool {
    let path_str = rel_path.to_string_lossy();

    for pattern in patterns {
        if let Some(ext) = pattern.strip_prefix('*') {
            if path_str.ends_with(ext) {
                return true;
            }
        } else if contains_segments(rel_path, Path::new(pattern.trim_end_matches('/'))) {
            return true;
        }
    }

    rel_path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
    })
}

/// Whether the components of `pattern` appear as a contiguous run in `path`.
fn contains_segments(path: &Path, pattern: &Path) -> bool {
    let wanted: Vec<_> = pattern.components().collect();
    if wanted.is_empty() {
        return false;
    }
    let components: Vec<_> = path.components().collect();
    components.windows(wanted.len()).any(|run| run == wanted.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_ignore_directory_pattern() {
        let patterns = vec!["node_modules".to_string()];
        assert!(should_ignore(Path::new("node_modules/pkg/index.js"), &patterns));
        assert!(should_ignore(Path::new("web/node_modules/pkg/index.js"), &patterns));
        assert!(!should_ignore(Path::new("src/index.js"), &patterns));
    }

    #[test]
    fn test_should_ignore_whole_segments_only() {
        let patterns = vec!["src".to_string(), "web/dist/".to_string()];
        assert!(should_ignore(Path::new("src/x.js"), &patterns));
        assert!(should_ignore(Path::new("pkg/src/x.js"), &patterns));
        assert!(!should_ignore(Path::new("srcfoo/x.js"), &patterns));
        assert!(!should_ignore(Path::new("lib/mysrc/x.js"), &patterns));
        assert!(should_ignore(Path::new("web/dist/app.js"), &patterns));
        assert!(!should_ignore(Path::new("web/distant/app.js"), &patterns));
    }

    #[test]
    fn test_should_ignore_extension() {
        let patterns = vec!["*.log".to_string()];
        assert!(should_ignore(Path::new("debug.log"), &patterns));
        assert!(!should_ignore(Path::new("src/index.js"), &patterns));
    }

    #[test]
    fn test_should_ignore_hidden_files() {
        assert!(should_ignore(Path::new(".git/config"), &[]));
        assert!(should_ignore(Path::new(".env"), &[]));
        assert!(should_ignore(Path::new("src/.hidden/file.js"), &[]));
        assert!(!should_ignore(Path::new("src/file.js"), &[]));
    }

    #[test]
    fn test_outside_roots_ignored() {
        let roots = vec![PathBuf::from("/project/web"), PathBuf::from("/project/docs")];
        assert!(is_ignored(Path::new("/other/file.js"), &roots, &[]));
        assert!(!is_ignored(Path::new("/project/docs/intro.md"), &roots, &[]));
    }

    #[test]
    fn test_missing_root() {
        let err = FileWatcher::new(vec![PathBuf::from("/no/such/dir")], vec![], None).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(_)));
    }

    #[test]
    fn test_file_change_path() {
        let path = PathBuf::from("/project/src/index.js");
        assert_eq!(FileChange::Modified(path.clone()).path(), path.as_path());
        assert_eq!(FileChange::Created(path.clone()).path(), path.as_path());
        assert_eq!(FileChange::Removed(path.clone()).path(), path.as_path());
    }
}
