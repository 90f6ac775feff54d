//! HTTP cache control module
//!
//! Validator generation from file metadata and conditional request handling
//! (`If-None-Match`, `If-Modified-Since`).

use hyper::header::{
    HeaderMap, HeaderValue, CACHE_CONTROL, ETAG, EXPIRES, LAST_MODIFIED, PRAGMA,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Conditional request headers relevant to cache validation
#[derive(Debug, Clone, Default)]
pub struct ConditionalHeaders {
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

/// Cache control policy applied to plain file responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Browser may cache for `max-age` seconds, then must revalidate
    Revalidate(u64),
    /// Anti-cache headers, no validators
    #[default]
    Disabled,
}

impl CachePolicy {
    /// Convert to Cache-Control header value
    pub fn to_header_value(self) -> String {
        match self {
            Self::Revalidate(max_age) => format!("public, max-age={max_age}, must-revalidate"),
            Self::Disabled => "no-cache, no-store, must-revalidate".to_string(),
        }
    }
}

/// Outcome of cache negotiation for one file
#[derive(Debug)]
pub struct Negotiation {
    /// Cache headers to put on the response, whatever its status
    pub headers: HeaderMap,
    /// True when the client copy is fresh and a 304 should be sent
    pub not_modified: bool,
}

/// Milliseconds since the epoch, pre-epoch times clamp to zero
pub fn unix_millis(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Generate the quoted validator `"<mtime_ms>-<size>"`
pub fn generate_etag(modified: SystemTime, size: u64) -> String {
    format!("\"{}-{size}\"", unix_millis(modified))
}

/// Exact comparison of the client's `If-None-Match` against our validator
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| client_etag == etag)
}

/// True when the file was not modified after the client's date.
///
/// Comparison is at millisecond precision. An unparseable date never
/// produces a 304.
pub fn not_modified_since(modified: SystemTime, if_modified_since: Option<&str>) -> bool {
    let Some(raw) = if_modified_since else {
        return false;
    };
    match httpdate::parse_http_date(raw.trim()) {
        Ok(client_date) => unix_millis(modified) <= unix_millis(client_date),
        Err(_) => false,
    }
}

/// Compute response cache headers and decide 200 vs 304
pub fn negotiate(
    policy: CachePolicy,
    modified: SystemTime,
    size: u64,
    conditional: &ConditionalHeaders,
) -> Negotiation {
    let mut headers = HeaderMap::new();

    match policy {
        CachePolicy::Disabled => {
            headers.insert(
                CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-store, must-revalidate"),
            );
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(EXPIRES, HeaderValue::from_static("0"));
            Negotiation {
                headers,
                not_modified: false,
            }
        }
        CachePolicy::Revalidate(_) => {
            let etag = generate_etag(modified, size);
            let last_modified = httpdate::fmt_http_date(modified);

            // Both values are plain ASCII built above
            if let Ok(v) = HeaderValue::from_str(&etag) {
                headers.insert(ETAG, v);
            }
            if let Ok(v) = HeaderValue::from_str(&last_modified) {
                headers.insert(LAST_MODIFIED, v);
            }
            if let Ok(v) = HeaderValue::from_str(&policy.to_header_value()) {
                headers.insert(CACHE_CONTROL, v);
            }

            let not_modified = check_etag_match(conditional.if_none_match.as_deref(), &etag)
                || not_modified_since(modified, conditional.if_modified_since.as_deref());

            Negotiation {
                headers,
                not_modified,
            }
        }
    }
}
