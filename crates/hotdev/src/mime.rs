//! Content type lookup by file extension.

use std::collections::BTreeMap;
use std::path::Path;

/// Like [`content_type`], but `custom` (lowercase extension -> type) is
/// consulted first.
pub fn lookup<'a>(path: &Path, custom: &'a BTreeMap<String, String>) -> &'a str {
    if !custom.is_empty() {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        if let Some(content_type) = extension.and_then(|ext| custom.get(&ext)) {
            return content_type;
        }
    }
    content_type(path)
}

/// Determine the MIME type of a path from its extension.
///
/// Unknown or missing extensions map to `application/octet-stream`.
pub fn content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "html" | "htm" => "text/html",
        "js" | "mjs" | "cjs" => "application/javascript",
        "json" | "map" => "application/json",
        "css" => "text/css",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
