//! Request resolution
//!
//! Turns an incoming request into a filesystem candidate under the served
//! root, or decides that the request is not ours (delegate), is malformed
//! (404) or escapes the root (403).

use hyper::header::{HeaderName, IF_MODIFIED_SINCE, IF_NONE_MATCH};
use hyper::HeaderMap;
use percent_encoding::percent_decode_str;
use std::path::{Path, PathBuf};

use crate::config::StaticConfig;
use crate::http::ConditionalHeaders;
use crate::logger;
use crate::pipeline::{OriginalUri, ServerRequest};

/// Request context carried from the resolver to the file and listing stages
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Request path without its trailing slash, `/` for the site root
    pub page_path: String,
    /// Decoded path below the URL prefix, `/` at the prefix root
    pub relative_path: String,
    pub query: Option<String>,
    /// Absolute filesystem path, always inside the root
    pub candidate: PathBuf,
    pub conditional: ConditionalHeaders,
}

impl RequestContext {
    /// True when the request targets the prefix root itself
    pub fn at_prefix_root(&self) -> bool {
        self.relative_path == "/"
    }
}

#[derive(Debug)]
pub enum Resolution {
    /// Not for this handler, pass to the next stage
    Delegate,
    /// Candidate escapes the root
    Forbidden,
    /// Path cannot name a file (undecodable)
    NotFound,
    Candidate(RequestContext),
}

pub fn resolve(config: &StaticConfig, req: &ServerRequest) -> Resolution {
    if !config.allows_method(req.method()) {
        return Resolution::Delegate;
    }

    let uri = if config.use_original_url {
        req.extensions()
            .get::<OriginalUri>()
            .map_or(req.uri(), |original| &original.0)
    } else {
        req.uri()
    };

    let path = uri.path();
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    let page_path = if trimmed.is_empty() { "/" } else { trimmed }.to_string();

    let Some(rest) = strip_prefix_segments(&page_path, &config.url_prefix) else {
        return Resolution::Delegate;
    };

    if let Some(first) = rest.first() {
        let decoded = percent_decode_str(first).decode_utf8_lossy();
        if config.is_reserved(first) || config.is_reserved(&decoded) {
            return Resolution::Delegate;
        }
    }

    let encoded = format!("/{}", rest.join("/"));
    let Ok(relative_path) = percent_decode_str(&encoded).decode_utf8() else {
        return Resolution::NotFound;
    };
    let relative_path = relative_path.into_owned();

    let candidate = join_normalized(&config.root, &relative_path);
    if !candidate.starts_with(&config.root) {
        logger::log_warning(&format!(
            "Path traversal attempt blocked: {} -> {}",
            uri.path(),
            candidate.display()
        ));
        return Resolution::Forbidden;
    }

    Resolution::Candidate(RequestContext {
        page_path,
        relative_path,
        query: uri.query().map(ToString::to_string),
        candidate,
        conditional: conditional_headers(req.headers()),
    })
}

/// Segments of `path` left after matching `prefix` position by position
fn strip_prefix_segments<'a>(path: &'a str, prefix: &str) -> Option<Vec<&'a str>> {
    let path_segments: Vec<&str> = path.split('/').collect();
    let prefix_segments: Vec<&str> = prefix.split('/').collect();

    if prefix_segments.len() > path_segments.len() {
        return None;
    }
    if prefix_segments
        .iter()
        .zip(&path_segments)
        .any(|(expected, actual)| expected != actual)
    {
        return None;
    }

    let rest = &path_segments[prefix_segments.len()..];
    // Site root "/" splits into two empty segments
    Some(rest.iter().copied().filter(|s| !s.is_empty()).collect())
}

/// Join `relative` onto `root` segment by segment.
///
/// `..` is applied lexically and may climb above `root`; the caller checks
/// containment afterwards.
pub fn join_normalized(root: &Path, relative: &str) -> PathBuf {
    let mut out = root.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            name => out.push(name),
        }
    }
    out
}

fn conditional_headers(headers: &HeaderMap) -> ConditionalHeaders {
    let header = |name: HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };
    ConditionalHeaders {
        if_none_match: header(IF_NONE_MATCH),
        if_modified_since: header(IF_MODIFIED_SINCE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticOptions;
    use hyper::body::Bytes;
    use hyper::{Method, Request};

    fn config(options: StaticOptions) -> StaticConfig {
        StaticConfig::from_options("/srv/app", options, None).unwrap()
    }

    fn get(uri: &str) -> ServerRequest {
        Request::builder().uri(uri).body(Bytes::new()).unwrap()
    }

    fn candidate(resolution: Resolution) -> RequestContext {
        match resolution {
            Resolution::Candidate(ctx) => ctx,
            other => panic!("expected candidate, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_paths() {
        let cfg = config(StaticOptions::default());

        let ctx = candidate(resolve(&cfg, &get("/")));
        assert_eq!(ctx.page_path, "/");
        assert_eq!(ctx.relative_path, "/");
        assert!(ctx.at_prefix_root());
        assert_eq!(ctx.candidate, PathBuf::from("/srv/app"));

        let ctx = candidate(resolve(&cfg, &get("/docs/?sort=size")));
        assert_eq!(ctx.page_path, "/docs");
        assert_eq!(ctx.relative_path, "/docs");
        assert_eq!(ctx.query.as_deref(), Some("sort=size"));
        assert_eq!(ctx.candidate, PathBuf::from("/srv/app/docs"));
    }

    #[test]
    fn test_decoding_happens_after_prefix_match() {
        let cfg = config(StaticOptions {
            url_prefix: Some("/files".to_string()),
            ..Default::default()
        });

        let ctx = candidate(resolve(&cfg, &get("/files/my%20doc.txt")));
        assert_eq!(ctx.relative_path, "/my doc.txt");
        assert_eq!(ctx.candidate, PathBuf::from("/srv/app/my doc.txt"));

        let ctx = candidate(resolve(&cfg, &get("/files")));
        assert!(ctx.at_prefix_root());

        assert!(matches!(resolve(&cfg, &get("/%66iles/a")), Resolution::Delegate));
        assert!(matches!(resolve(&cfg, &get("/filesx/a")), Resolution::Delegate));
        assert!(matches!(resolve(&cfg, &get("/")), Resolution::Delegate));
    }

    #[test]
    fn test_traversal_is_forbidden() {
        let cfg = config(StaticOptions::default());
        assert!(matches!(
            resolve(&cfg, &get("/../etc/passwd")),
            Resolution::Forbidden
        ));
        assert!(matches!(
            resolve(&cfg, &get("/%2e%2e/%2e%2e/etc/passwd")),
            Resolution::Forbidden
        ));
        assert!(matches!(
            resolve(&cfg, &get("/..%2Fapp-evil/secret")),
            Resolution::Forbidden
        ));

        let ctx = candidate(resolve(&cfg, &get("/a/../b")));
        assert_eq!(ctx.candidate, PathBuf::from("/srv/app/b"));
    }

    #[test]
    fn test_invalid_utf8_is_not_found() {
        let cfg = config(StaticOptions::default());
        assert!(matches!(resolve(&cfg, &get("/%ff%fe")), Resolution::NotFound));
    }

    #[test]
    fn test_method_and_reserved_delegate() {
        let cfg = config(StaticOptions {
            urls_reserved: Some(vec!["/api".to_string()]),
            ..Default::default()
        });

        let post = Request::builder()
            .method(Method::POST)
            .uri("/index.html")
            .body(Bytes::new())
            .unwrap();
        assert!(matches!(resolve(&cfg, &post), Resolution::Delegate));
        assert!(matches!(resolve(&cfg, &get("/api/users")), Resolution::Delegate));
        assert!(matches!(resolve(&cfg, &get("/api")), Resolution::Delegate));
        assert!(matches!(resolve(&cfg, &get("/docs/api")), Resolution::Candidate(_)));
    }

    #[test]
    fn test_original_uri_preference() {
        let mut req = get("/rewritten.html");
        req.extensions_mut()
            .insert(OriginalUri("/original.html".parse().unwrap()));

        let cfg = config(StaticOptions::default());
        let ctx = candidate(resolve(&cfg, &req));
        assert_eq!(ctx.candidate, PathBuf::from("/srv/app/original.html"));

        let cfg = config(StaticOptions {
            use_original_url: Some(false),
            ..Default::default()
        });
        let ctx = candidate(resolve(&cfg, &req));
        assert_eq!(ctx.candidate, PathBuf::from("/srv/app/rewritten.html"));
    }

    #[test]
    fn test_conditional_headers_extracted() {
        let cfg = config(StaticOptions::default());
        let req = Request::builder()
            .uri("/a.txt")
            .header(IF_NONE_MATCH, "\"1-2\"")
            .body(Bytes::new())
            .unwrap();
        let ctx = candidate(resolve(&cfg, &req));
        assert_eq!(ctx.conditional.if_none_match.as_deref(), Some("\"1-2\""));
        assert!(ctx.conditional.if_modified_since.is_none());
    }
}
