//! In-memory artifact store.
//!
//! The compiler writes its output here instead of to disk; requests read from
//! it. The store is a tree of directories and files behind a single
//! `parking_lot::RwLock`, and [`MemoryFs`] is a cheap handle around it, so the
//! compiler side and the request side each hold their own clone.

use crate::error::StoreError;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone)]
enum Node {
    File(Bytes),
    Dir(BTreeMap<String, Node>),
}

impl Node {
    fn empty_dir() -> Self {
        Node::Dir(BTreeMap::new())
    }
}

/// Result of [`MemoryFs::stat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    is_dir: bool,
    len: u64,
}

impl Metadata {
    pub fn is_file(&self) -> bool {
        !self.is_dir
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    /// Content length for files, number of entries for directories.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Shared in-memory file system.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    root: Arc<RwLock<Node>>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    /// Create an empty store containing only the root directory.
    pub fn new() -> Self {
        Self {
            root: Arc::new(RwLock::new(Node::empty_dir())),
        }
    }

    /// Stat a path.
    pub fn stat(&self, path: impl AsRef<Path>) -> Result<Metadata> {
        let path = path.as_ref();
        let parts = split(path)?;
        let root = self.root.read();
        match lookup(&root, &parts).ok_or_else(|| StoreError::NotFound(path.to_path_buf()))? {
            Node::File(content) => Ok(Metadata {
                is_dir: false,
                len: content.len() as u64,
            }),
            Node::Dir(entries) => Ok(Metadata {
                is_dir: true,
                len: entries.len() as u64,
            }),
        }
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.stat(path).is_ok()
    }

    pub fn is_file(&self, path: impl AsRef<Path>) -> bool {
        self.stat(path).map(|meta| meta.is_file()).unwrap_or(false)
    }

    /// Read a file's content.
    ///
    /// Returns a cheap clone of the stored bytes; later writes to the same
    /// path do not affect content already handed out.
    pub fn read(&self, path: impl AsRef<Path>) -> Result<Bytes> {
        let path = path.as_ref();
        let parts = split(path)?;
        let root = self.root.read();
        match lookup(&root, &parts) {
            Some(Node::File(content)) => Ok(content.clone()),
            Some(Node::Dir(_)) => Err(StoreError::IsADirectory(path.to_path_buf())),
            None => Err(StoreError::NotFound(path.to_path_buf())),
        }
    }

    /// List the entry names of a directory, sorted.
    pub fn read_dir(&self, path: impl AsRef<Path>) -> Result<Vec<String>> {
        let path = path.as_ref();
        let parts = split(path)?;
        let root = self.root.read();
        match lookup(&root, &parts) {
            Some(Node::Dir(entries)) => Ok(entries.keys().cloned().collect()),
            Some(Node::File(_)) => Err(StoreError::NotADirectory(path.to_path_buf())),
            None => Err(StoreError::NotFound(path.to_path_buf())),
        }
    }

    /// Create a directory and all missing parents.
    pub fn create_dir_all(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let parts = split(path)?;
        let mut root = self.root.write();
        let mut current = &mut *root;
        for part in parts {
            let Node::Dir(entries) = current else {
                return Err(StoreError::NotADirectory(path.to_path_buf()));
            };
            current = entries.entry(part).or_insert_with(Node::empty_dir);
        }
        match current {
            Node::Dir(_) => Ok(()),
            Node::File(_) => Err(StoreError::NotADirectory(path.to_path_buf())),
        }
    }

    /// Write a file. The parent directory must already exist.
    pub fn write(&self, path: impl AsRef<Path>, content: impl Into<Bytes>) -> Result<()> {
        let path = path.as_ref();
        let mut parts = split(path)?;
        let name = parts
            .pop()
            .ok_or_else(|| StoreError::IsADirectory(path.to_path_buf()))?;
        let mut root = self.root.write();
        let parent = lookup_mut(&mut root, &parts)
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))?;
        let Node::Dir(entries) = parent else {
            return Err(StoreError::NotADirectory(path.to_path_buf()));
        };
        if let Some(Node::Dir(_)) = entries.get(&name) {
            return Err(StoreError::IsADirectory(path.to_path_buf()));
        }
        entries.insert(name, Node::File(content.into()));
        Ok(())
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.remove(path, |node| match node {
            Node::File(_) => Ok(()),
            Node::Dir(_) => Err(StoreError::IsADirectory(path.to_path_buf())),
        })
    }

    /// Remove a directory and everything below it.
    pub fn remove_dir_all(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if split(path)?.is_empty() {
            // The root itself is emptied rather than removed.
            *self.root.write() = Node::empty_dir();
            return Ok(());
        }
        self.remove(path, |node| match node {
            Node::Dir(_) => Ok(()),
            Node::File(_) => Err(StoreError::NotADirectory(path.to_path_buf())),
        })
    }

    /// Remove an empty directory.
    pub fn remove_dir(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.remove(path, |node| match node {
            Node::Dir(entries) if entries.is_empty() => Ok(()),
            Node::Dir(_) => Err(StoreError::DirectoryNotEmpty(path.to_path_buf())),
            Node::File(_) => Err(StoreError::NotADirectory(path.to_path_buf())),
        })
    }

    fn remove(&self, path: &Path, check: impl FnOnce(&Node) -> Result<()>) -> Result<()> {
        let mut parts = split(path)?;
        let name = parts
            .pop()
            .ok_or_else(|| StoreError::InvalidPath(path.to_path_buf()))?;
        let mut root = self.root.write();
        let Some(Node::Dir(entries)) = lookup_mut(&mut root, &parts) else {
            return Err(StoreError::NotFound(path.to_path_buf()));
        };
        let node = entries
            .get(&name)
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))?;
        check(node)?;
        entries.remove(&name);
        Ok(())
    }
}

/// Split an absolute path into its normal components.
fn split(path: &Path) -> Result<Vec<String>> {
    if !path.has_root() {
        return Err(StoreError::InvalidPath(path.to_path_buf()));
    }
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => return Err(StoreError::InvalidPath(path.to_path_buf())),
            Component::Normal(name) => parts.push(name.to_string_lossy().into_owned()),
        }
    }
    Ok(parts)
}

fn lookup<'a>(root: &'a Node, parts: &[String]) -> Option<&'a Node> {
    parts.iter().try_fold(root, |node, part| match node {
        Node::Dir(entries) => entries.get(part),
        Node::File(_) => None,
    })
}

fn lookup_mut<'a>(root: &'a mut Node, parts: &[String]) -> Option<&'a mut Node> {
    parts.iter().try_fold(root, |node, part| match node {
        Node::Dir(entries) => entries.get_mut(part),
        Node::File(_) => None,
    })
}

/// Join a `/`-separated relative path onto `base`, refusing to leave it.
///
/// Empty and `.` segments are skipped; a `..` that would climb above `base`
/// yields `None`.
pub fn join_within(base: &Path, relative: &str) -> Option<PathBuf> {
    let mut segments: Vec<&str> = Vec::new();
    for segment in relative.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    let mut joined = base.to_path_buf();
    joined.extend(segments);
    Some(joined)
}
