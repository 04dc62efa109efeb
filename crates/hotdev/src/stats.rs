//! Compile result snapshots.
//!
//! A [`CompileResult`] is produced once per finished compile by the compiler
//! and never mutated afterwards. Multi-bundle compilers report one
//! [`BundleStats`] per bundle; single-bundle compilers report exactly one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary of one compiled bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleStats {
    /// Bundle name, if the compiler names its bundles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Content hash of the whole bundle
    pub hash: String,

    /// Elapsed compile time in milliseconds
    pub time_ms: u64,

    #[serde(default)]
    pub warnings: Vec<String>,

    #[serde(default)]
    pub errors: Vec<String>,

    /// Module id -> module name
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl BundleStats {
    pub fn new(hash: impl Into<String>) -> Self {
        Self {
            name: None,
            hash: hash.into(),
            time_ms: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
            modules: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_time(mut self, time_ms: u64) -> Self {
        self.time_ms = time_ms;
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_module(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.modules.insert(id.into(), name.into());
        self
    }
}

/// Immutable snapshot of a finished compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    bundles: Vec<BundleStats>,
}

impl CompileResult {
    /// Result of a single-bundle compiler.
    pub fn single(stats: BundleStats) -> Self {
        Self {
            bundles: vec![stats],
        }
    }

    /// Result of a multi-bundle compiler, one entry per child compilation.
    pub fn multi(bundles: Vec<BundleStats>) -> Self {
        Self { bundles }
    }

    pub fn bundles(&self) -> &[BundleStats] {
        &self.bundles
    }

    /// Hash of the first bundle.
    pub fn hash(&self) -> Option<&str> {
        self.bundles.first().map(|b| b.hash.as_str())
    }

    /// Longest bundle compile time.
    pub fn time_ms(&self) -> u64 {
        self.bundles.iter().map(|b| b.time_ms).max().unwrap_or(0)
    }

    pub fn has_errors(&self) -> bool {
        self.bundles.iter().any(|b| !b.errors.is_empty())
    }

    pub fn has_warnings(&self) -> bool {
        self.bundles.iter().any(|b| !b.warnings.is_empty())
    }

    /// Plain-text rendering used when the compiler has no formatter of its own.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for bundle in &self.bundles {
            if let Some(name) = &bundle.name {
                out.push_str(&format!("[{}] ", name));
            }
            out.push_str(&format!(
                "hash {} in {}ms, {} modules",
                bundle.hash,
                bundle.time_ms,
                bundle.modules.len()
            ));
            for error in &bundle.errors {
                out.push_str("\n  error: ");
                out.push_str(error);
            }
            for warning in &bundle.warnings {
                out.push_str("\n  warning: ");
                out.push_str(warning);
            }
            out.push('\n');
        }
        out
    }
}
