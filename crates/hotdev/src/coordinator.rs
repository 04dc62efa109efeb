//! Request handling against the compile state and the artifact store.
//!
//! [`Hotdev::handle`] decides for one request whether it is served from the
//! store or passed on to the next handler, waiting for a valid build first
//! when one is in progress.

use crate::range;
use crate::resolve::ResolvedAsset;
use crate::session::Hotdev;
use crate::stats::CompileResult;
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Method, Response, StatusCode};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error};

/// Minimum run of lowercase hex digits that marks a content-hashed file name.
const HASH_LEN: usize = 10;

/// The parts of an HTTP request the coordinator looks at.
#[derive(Debug, Clone)]
pub struct AssetRequest {
    pub method: Method,
    /// Raw request target, as received
    pub url: String,
    pub headers: HeaderMap,
}

impl AssetRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            url: parts.uri.to_string(),
            headers: parts.headers.clone(),
        }
    }
}

/// What became of a request.
#[derive(Debug)]
pub enum Outcome {
    /// Answered from the artifact store
    Served(Response<Bytes>),
    /// Not ours; in server-side-render mode carries the latest result
    PassThrough(Option<Arc<CompileResult>>),
}

impl Outcome {
    pub fn is_served(&self) -> bool {
        matches!(self, Outcome::Served(_))
    }
}

enum Lookup {
    File(PathBuf),
    NotFound,
}

impl Hotdev {
    /// Serve `request` from the build output, or pass it on.
    pub async fn handle(&self, request: &AssetRequest) -> Outcome {
        if request.method != Method::GET {
            return self.pass_through().await;
        }

        let Some(asset) = self.resolver().resolve(&request.url) else {
            debug!(url = %request.url, "not a build asset");
            return self.pass_through().await;
        };

        if !self.rebuild_on_request(&asset) {
            return Outcome::PassThrough(self.passed_result());
        }

        // Content-hashed files never change, so a stored copy is good enough.
        if is_hashed(&asset.path) && self.store().is_file(&asset.path) {
            if let Some(response) = self.serve(&asset.path, request) {
                debug!(path = %asset.path.display(), "served hashed asset");
                return Outcome::Served(response);
            }
        }

        if !self.is_closed() {
            self.ready().await;
        }

        match self.lookup(&asset.path) {
            Lookup::File(path) => match self.serve(&path, request) {
                Some(response) => Outcome::Served(response),
                None => self.pass_through().await,
            },
            Lookup::NotFound => {
                debug!(path = %asset.path.display(), "not in build output");
                self.pass_through().await
            }
        }
    }

    async fn pass_through(&self) -> Outcome {
        if !self.settings().server_side_render {
            return Outcome::PassThrough(None);
        }
        if self.is_closed() {
            return Outcome::PassThrough(self.latest());
        }
        Outcome::PassThrough(self.ready().await)
    }

    /// Result handed on without waiting, for requests that cannot wait.
    fn passed_result(&self) -> Option<Arc<CompileResult>> {
        if self.settings().server_side_render {
            self.latest()
        } else {
            None
        }
    }

    /// Lazy mode: compile for a request whose artifact is missing.
    ///
    /// Returns `false` when the compile could not be started.
    fn rebuild_on_request(&self, asset: &ResolvedAsset) -> bool {
        let settings = self.settings();
        if !settings.lazy {
            return true;
        }
        if let Some(filter) = &settings.lazy_filter {
            if !filter.matches(&asset.relative) {
                return true;
            }
        }
        if let Lookup::File(_) = self.lookup(&asset.path) {
            return true;
        }
        match self.rebuild() {
            Ok(()) => true,
            Err(e) => {
                error!("Lazy rebuild failed: {}", e);
                false
            }
        }
    }

    fn lookup(&self, path: &Path) -> Lookup {
        let Ok(metadata) = self.store().stat(path) else {
            return Lookup::NotFound;
        };
        if metadata.is_file() {
            return Lookup::File(path.to_path_buf());
        }

        let Some(index) = self.settings().index.name() else {
            return Lookup::NotFound;
        };
        let candidate = path.join(index);
        if self.store().is_file(&candidate) {
            Lookup::File(candidate)
        } else {
            Lookup::NotFound
        }
    }

    fn serve(&self, path: &Path, request: &AssetRequest) -> Option<Response<Bytes>> {
        let content = self.store().read(path).ok()?;
        let range_header = request
            .headers
            .get(header::RANGE)
            .and_then(|value| value.to_str().ok());
        let ranged = range::apply(content, range_header, StatusCode::OK);

        let mut response = Response::new(ranged.body);
        *response.status_mut() = ranged.status;

        let headers = response.headers_mut();
        for (name, value) in ranged.headers {
            headers.insert(name, value);
        }
        let content_type = format!(
            "{}; charset=UTF-8",
            crate::mime::lookup(path, &self.settings().mime_types)
        );
        if let Ok(value) = HeaderValue::try_from(content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        let length = response.body().len() as u64;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        for (name, value) in &self.settings().headers {
            headers.insert(name.clone(), value.clone());
        }

        Some(response)
    }
}

/// Whether the file name contains a content hash.
fn is_hashed(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let mut run = 0;
    for c in name.chars() {
        if c.is_ascii_digit() || ('a'..='f').contains(&c) {
            run += 1;
            if run >= HASH_LEN {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}
