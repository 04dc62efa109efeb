use crate::config::{HotdevConfig, IndexFile, WatchOptions};
use crate::error::{ConfigError, Result};
use axum::http::{HeaderName, HeaderValue};
use regex::Regex;
use std::collections::BTreeMap;
use std::time::Duration;

/// Validated session settings, built once by [`HotdevConfig::validate`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub watch_options: WatchOptions,
    pub heartbeat: Duration,
    pub hmr_path: String,
    pub lazy: bool,
    pub lazy_filter: Option<LazyFilter>,
    pub index: IndexFile,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    /// Lowercase extension (no dot) -> content type
    pub mime_types: BTreeMap<String, String>,
    pub server_side_render: bool,
    pub stats_options: serde_json::Value,
}

/// Filename template compiled for lazy-mode matching.
///
/// `[placeholder]` segments match any non-empty text, everything else
/// matches literally; a leading `/` on the tested path is optional.
#[derive(Debug, Clone)]
pub struct LazyFilter {
    template: String,
    pattern: Regex,
}

impl LazyFilter {
    pub fn new(template: &str) -> Result<Self> {
        let escaped = regex::escape(template);
        // regex::escape turns "[name]" into "\[name\]".
        let placeholder = Regex::new(r"\\\[[A-Za-z]+\\\]").map_err(invalid_filename(template))?;
        let source = placeholder.replace_all(&escaped, ".+");
        let pattern = Regex::new(&format!("^/?{}$", source)).map_err(invalid_filename(template))?;
        Ok(Self {
            template: template.to_string(),
            pattern,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.is_match(path)
    }
}

fn invalid_filename(template: &str) -> impl FnOnce(regex::Error) -> crate::error::HotdevError + '_ {
    move |e| {
        ConfigError::InvalidValue {
            field: "filename".to_string(),
            value: template.to_string(),
            hint: format!("Not a usable filename template: {}", e),
        }
        .into()
    }
}

impl HotdevConfig {
    /// Validate the configuration and compile it into [`Settings`].
    pub fn validate(&self) -> Result<Settings> {
        if self.heartbeat == 0 {
            return Err(ConfigError::InvalidValue {
                field: "heartbeat".to_string(),
                value: "0".to_string(),
                hint: "Heartbeat interval must be at least 1 millisecond".to_string(),
            }
            .into());
        }

        if !self.hmr_path.starts_with('/') {
            return Err(ConfigError::InvalidValue {
                field: "hmrPath".to_string(),
                value: self.hmr_path.clone(),
                hint: "Event stream path must start with '/'".to_string(),
            }
            .into());
        }

        if self.watch_options.poll == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "watchOptions.poll".to_string(),
                value: "0".to_string(),
                hint: "Poll interval must be at least 1 millisecond".to_string(),
            }
            .into());
        }

        if let IndexFile::Name(name) = &self.index {
            if name.is_empty() || name.contains('/') {
                return Err(ConfigError::InvalidValue {
                    field: "index".to_string(),
                    value: name.clone(),
                    hint: "Index must be a plain file name, true or false".to_string(),
                }
                .into());
            }
        }

        let lazy_filter = match &self.filename {
            Some(template) if !self.lazy => {
                return Err(ConfigError::InvalidValue {
                    field: "filename".to_string(),
                    value: template.clone(),
                    hint: "filename only applies in lazy mode; set lazy: true".to_string(),
                }
                .into());
            }
            Some(template) => Some(LazyFilter::new(template)?),
            None => None,
        };

        let mut headers = Vec::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            let header_name = HeaderName::try_from(name.as_str()).map_err(|e| {
                ConfigError::InvalidValue {
                    field: format!("headers.{}", name),
                    value: name.clone(),
                    hint: format!("Not a valid header name: {}", e),
                }
            })?;
            let header_value = HeaderValue::try_from(value.as_str()).map_err(|e| {
                ConfigError::InvalidValue {
                    field: format!("headers.{}", name),
                    value: value.clone(),
                    hint: format!("Not a valid header value: {}", e),
                }
            })?;
            headers.push((header_name, header_value));
        }

        let mut mime_types = BTreeMap::new();
        for (extension, content_type) in &self.mime_types {
            let key = extension.trim_start_matches('.').to_ascii_lowercase();
            if key.is_empty() || key.contains('/') {
                return Err(ConfigError::InvalidValue {
                    field: format!("mimeTypes.{}", extension),
                    value: extension.clone(),
                    hint: "Keys are file extensions such as \"mdx\" or \".mdx\"".to_string(),
                }
                .into());
            }
            let usable = content_type.contains('/')
                && HeaderValue::try_from(format!("{}; charset=UTF-8", content_type)).is_ok();
            if !usable {
                return Err(ConfigError::InvalidValue {
                    field: format!("mimeTypes.{}", extension),
                    value: content_type.clone(),
                    hint: "Values are content types such as \"text/markdown\"".to_string(),
                }
                .into());
            }
            mime_types.insert(key, content_type.clone());
        }

        Ok(Settings {
            watch_options: self.watch_options.clone(),
            heartbeat: Duration::from_millis(self.heartbeat),
            hmr_path: self.hmr_path.clone(),
            lazy: self.lazy,
            lazy_filter,
            index: self.index.clone(),
            headers,
            mime_types,
            server_side_render: self.server_side_render,
            stats_options: self.stats_options.clone(),
        })
    }
}
