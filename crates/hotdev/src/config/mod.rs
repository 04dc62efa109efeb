//! Configuration for a hotdev session.
//!
//! [`HotdevConfig`] is the serde-facing shape (camelCase, unknown fields
//! rejected). It is validated exactly once, by [`HotdevConfig::validate`],
//! into [`Settings`], which is what the session reads at request time.

mod defaults;
mod validation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use defaults::*;
pub use validation::{LazyFilter, Settings};

/// Watch tuning forwarded to the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WatchOptions {
    /// Delay in milliseconds before a burst of changes triggers a rebuild
    #[serde(default = "default_aggregate_timeout")]
    pub aggregate_timeout: u64,

    /// Poll interval in milliseconds; unset means native file events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<u64>,

    /// Path patterns excluded from watching
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            aggregate_timeout: default_aggregate_timeout(),
            poll: None,
            ignored: Vec::new(),
        }
    }
}

/// Which file serves a directory request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IndexSetting", into = "IndexSetting")]
pub enum IndexFile {
    /// Directory requests are passed on
    Disabled,
    /// Directory requests serve this file from the directory
    Name(String),
}

impl Default for IndexFile {
    fn default() -> Self {
        IndexFile::Name(DEFAULT_INDEX.to_string())
    }
}

impl IndexFile {
    pub fn name(&self) -> Option<&str> {
        match self {
            IndexFile::Disabled => None,
            IndexFile::Name(name) => Some(name),
        }
    }
}

/// Accepts `true`, `false` or a file name.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum IndexSetting {
    Flag(bool),
    Name(String),
}

impl From<IndexSetting> for IndexFile {
    fn from(setting: IndexSetting) -> Self {
        match setting {
            IndexSetting::Flag(true) => IndexFile::default(),
            IndexSetting::Flag(false) => IndexFile::Disabled,
            IndexSetting::Name(name) => IndexFile::Name(name),
        }
    }
}

impl From<IndexFile> for IndexSetting {
    fn from(index: IndexFile) -> Self {
        match index {
            IndexFile::Disabled => IndexSetting::Flag(false),
            IndexFile::Name(name) => IndexSetting::Name(name),
        }
    }
}

/// Session options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HotdevConfig {
    #[serde(default)]
    pub watch_options: WatchOptions,

    /// Event stream heartbeat interval in milliseconds
    #[serde(default = "default_heartbeat")]
    pub heartbeat: u64,

    /// Path of the event stream endpoint
    #[serde(default = "default_hmr_path")]
    pub hmr_path: String,

    /// Compile on request instead of on change
    #[serde(default)]
    pub lazy: bool,

    /// Lazy mode only: filename template (e.g. `[name].js`) limiting which
    /// requests trigger a rebuild
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default)]
    pub index: IndexFile,

    /// Extra headers added to every served asset
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// Content types by file extension, checked before the built-in table
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mime_types: BTreeMap<String, String>,

    /// Hold passed-on requests until the build is valid and hand them the
    /// latest compile result
    #[serde(default)]
    pub server_side_render: bool,

    /// Opaque options for the compiler's stats formatter
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub stats_options: serde_json::Value,
}

impl Default for HotdevConfig {
    fn default() -> Self {
        Self {
            watch_options: WatchOptions::default(),
            heartbeat: default_heartbeat(),
            hmr_path: default_hmr_path(),
            lazy: false,
            filename: None,
            index: IndexFile::default(),
            headers: BTreeMap::new(),
            mime_types: BTreeMap::new(),
            server_side_render: false,
            stats_options: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: HotdevConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HotdevConfig::default());
        assert_eq!(config.heartbeat, 10_000);
        assert_eq!(config.hmr_path, "/__webpack_hmr");
        assert_eq!(config.watch_options.aggregate_timeout, 100);
        assert_eq!(config.index.name(), Some("index.html"));
    }

    #[test]
    fn test_camel_case_fields() {
        let config: HotdevConfig = serde_json::from_str(
            r#"{
                "watchOptions": { "aggregateTimeout": 300, "poll": 1000, "ignored": ["node_modules"] },
                "hmrPath": "/__events",
                "mimeTypes": { "mdx": "text/markdown" },
                "serverSideRender": true,
                "statsOptions": { "colors": true }
            }"#,
        )
        .unwrap();
        assert_eq!(config.watch_options.aggregate_timeout, 300);
        assert_eq!(config.watch_options.poll, Some(1000));
        assert_eq!(config.hmr_path, "/__events");
        assert_eq!(config.mime_types["mdx"], "text/markdown");
        assert!(config.server_side_render);
        assert_eq!(config.stats_options["colors"], true);
    }

    #[test]
    fn test_index_setting_forms() {
        let disabled: HotdevConfig = serde_json::from_str(r#"{ "index": false }"#).unwrap();
        assert_eq!(disabled.index, IndexFile::Disabled);

        let enabled: HotdevConfig = serde_json::from_str(r#"{ "index": true }"#).unwrap();
        assert_eq!(enabled.index.name(), Some("index.html"));

        let named: HotdevConfig = serde_json::from_str(r#"{ "index": "main.html" }"#).unwrap();
        assert_eq!(named.index.name(), Some("main.html"));

        let json = serde_json::to_value(&disabled).unwrap();
        assert_eq!(json["index"], false);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<HotdevConfig, _> = serde_json::from_str(r#"{ "hmr": "/x" }"#);
        assert!(result.is_err());
    }
}
