//! Byte range handling for served assets.
//!
//! Only single ranges are honoured. A header that cannot be parsed at all, or
//! that asks for several ranges, is ignored and the full content is served
//! with the caller's status.

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use bytes::Bytes;

/// An inclusive byte range within content of known size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

/// Outcome of parsing a `Range` header against a content length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRange {
    /// Not a `<unit>=<ranges>` header
    Malformed,
    /// Syntactically fine but no range overlaps the content
    Unsatisfiable,
    /// Satisfiable ranges, in header order
    Ranges(Vec<ByteRange>),
}

/// Parse a `Range` header value for content of `size` bytes.
///
/// Individual ranges that are invalid (non-numeric, start after end, start
/// past the content) are dropped; if none remain the header is
/// unsatisfiable. The end of a range is clamped to the last byte.
pub fn parse_range(size: u64, header: &str) -> ParsedRange {
    let Some((unit, specs)) = header.split_once('=') else {
        return ParsedRange::Malformed;
    };
    if unit.trim() != "bytes" {
        return ParsedRange::Unsatisfiable;
    }

    let ranges: Vec<ByteRange> = specs
        .split(',')
        .filter_map(|spec| parse_spec(size, spec.trim()))
        .collect();

    if ranges.is_empty() {
        ParsedRange::Unsatisfiable
    } else {
        ParsedRange::Ranges(ranges)
    }
}

fn parse_spec(size: u64, spec: &str) -> Option<ByteRange> {
    let (start, end) = spec.split_once('-')?;
    let last = size.checked_sub(1)?;
    let (start, end) = match (start.trim(), end.trim()) {
        // "-500": the last 500 bytes
        ("", suffix) => {
            let suffix: u64 = suffix.parse().ok()?;
            if suffix == 0 {
                return None;
            }
            (size.saturating_sub(suffix), last)
        }
        // "500-": from 500 to the end
        (start, "") => (start.parse().ok()?, last),
        (start, end) => (start.parse().ok()?, end.parse::<u64>().ok()?.min(last)),
    };
    (start <= end).then_some(ByteRange { start, end })
}

/// Body, status and headers after range handling.
#[derive(Debug, Clone)]
pub struct Ranged {
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
    pub body: Bytes,
}

/// Apply an optional `Range` header to `content`.
///
/// `status` is used whenever the header does not lead to a 206 or 416.
/// Unsatisfiable ranges produce an empty body.
pub fn apply(content: Bytes, range: Option<&str>, status: StatusCode) -> Ranged {
    let mut headers = vec![(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"))];
    let size = content.len() as u64;

    let Some(range) = range else {
        return Ranged {
            status,
            headers,
            body: content,
        };
    };

    match parse_range(size, range) {
        ParsedRange::Unsatisfiable => {
            headers.push((header::CONTENT_RANGE, content_range(format!("bytes */{}", size))));
            Ranged {
                status: StatusCode::RANGE_NOT_SATISFIABLE,
                headers,
                body: Bytes::new(),
            }
        }
        ParsedRange::Ranges(ranges) if ranges.len() == 1 => {
            let ByteRange { start, end } = ranges[0];
            headers.push((
                header::CONTENT_RANGE,
                content_range(format!("bytes {}-{}/{}", start, end, size)),
            ));
            Ranged {
                status: StatusCode::PARTIAL_CONTENT,
                headers,
                body: content.slice(start as usize..=end as usize),
            }
        }
        ParsedRange::Malformed | ParsedRange::Ranges(_) => Ranged {
            status,
            headers,
            body: content,
        },
    }
}

fn content_range(value: String) -> HeaderValue {
    // Digits, spaces, '-', '/', '*' and "bytes" only.
    HeaderValue::try_from(value).unwrap_or_else(|_| HeaderValue::from_static("bytes */0"))
}
