//! Configuration for the hotdev CLI.
//!
//! `hotdev.config.json` describes which source directories are mirrored, where
//! their output lives in the in-memory store and under which URL prefix it is
//! served. The `hotdev` section is passed to the core session unchanged.
//!
//! ```json
//! {
//!   "source": "public",
//!   "outputPath": "/dist",
//!   "publicPath": "/assets/",
//!   "port": 3000,
//!   "hotdev": { "index": "index.html", "heartbeat": 10000 }
//! }
//! ```
//!
//! Multi-bundle projects list their bundles instead of a single `source`:
//!
//! ```json
//! {
//!   "bundles": [
//!     { "name": "client", "source": "web", "outputPath": "/client", "publicPath": "/static/" },
//!     { "name": "docs", "source": "docs", "outputPath": "/docs", "publicPath": "/docs/" }
//!   ],
//!   "hotdev": {}
//! }
//! ```

mod loading;
mod validation;

#[cfg(test)]
mod tests;

use hotdev::{BundleTarget, HotdevConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "hotdev.config.json";

pub fn default_output_path() -> PathBuf {
    PathBuf::from("/dist")
}

pub fn default_port() -> u16 {
    3000
}

/// One mirrored bundle of a multi-bundle project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BundleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Source directory, relative to the working directory
    pub source: PathBuf,

    /// Absolute directory in the in-memory store
    pub output_path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,
}

/// Complete CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CliConfig {
    /// Source directory of a single-bundle project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,

    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bundles: Vec<BundleConfig>,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Session options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotdev: Option<HotdevConfig>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            source: None,
            output_path: default_output_path(),
            public_path: None,
            bundles: Vec::new(),
            port: default_port(),
            cwd: None,
            hotdev: None,
        }
    }
}

/// A bundle with its source resolved to an absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSource {
    pub source: PathBuf,
    pub target: BundleTarget,
}

impl CliConfig {
    /// Directory that relative sources are resolved against.
    pub fn root(&self) -> PathBuf {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match &self.cwd {
            Some(dir) => resolve_against(&cwd, dir),
            None => cwd,
        }
    }

    /// Every mirrored bundle, sources made absolute. A single `source` becomes
    /// one unnamed bundle.
    pub fn mirror_sources(&self) -> Vec<MirrorSource> {
        let root = self.root();

        if self.bundles.is_empty() {
            return self
                .source
                .iter()
                .map(|source| {
                    let mut target = BundleTarget::new(&self.output_path);
                    target.public_path = self.public_path.clone();
                    MirrorSource {
                        source: resolve_against(&root, source),
                        target,
                    }
                })
                .collect();
        }

        self.bundles
            .iter()
            .map(|bundle| MirrorSource {
                source: resolve_against(&root, &bundle.source),
                target: BundleTarget {
                    name: bundle.name.clone(),
                    public_path: bundle.public_path.clone(),
                    output_path: bundle.output_path.clone(),
                },
            })
            .collect()
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
