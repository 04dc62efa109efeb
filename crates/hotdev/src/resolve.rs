//! Request URL to artifact path resolution.
//!
//! A request is mapped onto the store by stripping the bundle's public path
//! and joining the percent-decoded remainder onto its output path. Requests
//! for another host, or outside the public path, are not ours to answer.

use crate::compiler::BundleTarget;
use crate::store::join_within;
use percent_encoding::percent_decode_str;
use std::path::PathBuf;
use url::Url;

/// Public path prefix and the store directory it serves from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPathMapping {
    pub public_path: Option<String>,
    pub output_path: PathBuf,
}

impl From<&BundleTarget> for PublicPathMapping {
    fn from(target: &BundleTarget) -> Self {
        Self {
            public_path: target.public_path.clone(),
            output_path: target.output_path.clone(),
        }
    }
}

/// A request that maps into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// Absolute store path; may be a directory
    pub path: PathBuf,
    /// Decoded path below the public path, as requested
    pub relative: String,
}

/// Host and path of a request URL or public path.
#[derive(Debug, Default, PartialEq, Eq)]
struct UrlParts {
    host: Option<String>,
    pathname: String,
}

impl UrlParts {
    fn parse(raw: &str) -> Self {
        if raw.starts_with("//") {
            return Self::from_absolute(&format!("http:{}", raw)).unwrap_or_default();
        }
        if has_scheme(raw) {
            if let Some(parts) = Self::from_absolute(raw) {
                return parts;
            }
        }
        let end = raw.find(['?', '#']).unwrap_or(raw.len());
        Self {
            host: None,
            pathname: raw[..end].to_string(),
        }
    }

    fn from_absolute(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        Some(Self {
            host: url.host_str().map(str::to_ascii_lowercase),
            pathname: url.path().to_string(),
        })
    }
}

fn has_scheme(raw: &str) -> bool {
    raw.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

/// Maps request URLs onto store paths for one or more bundles.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    default: PublicPathMapping,
    bundles: Vec<PublicPathMapping>,
}

impl AssetResolver {
    pub fn new(default: PublicPathMapping) -> Self {
        Self {
            default,
            bundles: Vec::new(),
        }
    }

    /// Per-bundle mappings, tried in order before the default.
    pub fn with_bundles(mut self, bundles: Vec<PublicPathMapping>) -> Self {
        self.bundles = bundles;
        self
    }

    pub fn default_mapping(&self) -> &PublicPathMapping {
        &self.default
    }

    pub fn bundles(&self) -> &[PublicPathMapping] {
        &self.bundles
    }

    fn select(&self, url: &str) -> &PublicPathMapping {
        self.bundles
            .iter()
            .find(|mapping| {
                mapping
                    .public_path
                    .as_deref()
                    .is_some_and(|prefix| url.starts_with(prefix))
            })
            .unwrap_or(&self.default)
    }

    /// Resolve a raw request URL. `None` means the request is not for us.
    pub fn resolve(&self, url: &str) -> Option<ResolvedAsset> {
        let mapping = self.select(url);
        let prefix = UrlParts::parse(mapping.public_path.as_deref().unwrap_or("/"));
        let request = UrlParts::parse(url);

        if let (Some(ours), Some(theirs)) = (&prefix.host, &request.host) {
            if ours != theirs {
                return None;
            }
        }

        if let Some(public_path) = &mapping.public_path {
            if prefix.host == request.host && !url.starts_with(public_path.as_str()) {
                return None;
            }
        }

        // Outside the prefix the request falls back to the output directory.
        let remainder = request
            .pathname
            .strip_prefix(prefix.pathname.as_str())
            .unwrap_or("");

        if request.host.is_none() && prefix.host.is_some() && !url.starts_with(&prefix.pathname) {
            return None;
        }

        let relative = percent_decode_str(remainder).decode_utf8().ok()?.into_owned();
        let path = join_within(&mapping.output_path, &relative)?;
        Some(ResolvedAsset { path, relative })
    }
}
