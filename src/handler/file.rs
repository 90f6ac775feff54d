//! File serving: template dispatch, cache negotiation and streaming

use hyper::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use std::fs::Metadata;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tokio::fs::File;

use super::resolve::RequestContext;
use super::template::template_extension;
use crate::config::StaticConfig;
use crate::http::response::{log_build_error, STREAM_FAILURE_TEXT, TEMPLATE_FAILURE_TEXT};
use crate::http::{self, body, cache, mime, Body};
use crate::logger;
use crate::pipeline::{Next, ServerRequest};

/// Serve a regular file whose metadata was already fetched by the dispatcher
pub async fn serve_file(
    config: &StaticConfig,
    ctx: &RequestContext,
    req: ServerRequest,
    next: Next<'_>,
    path: &Path,
    meta: &Metadata,
) -> Response<Body> {
    if let Some(template) = &config.template {
        if template_extension(path).is_some_and(|ext| template.handles(ext)) {
            return match template.renderer.render(req, next, path).await {
                Ok(resp) => resp,
                Err(e) => {
                    logger::log_error(&format!(
                        "Template rendering failed for '{}': {e}",
                        path.display()
                    ));
                    http::build_500_response(TEMPLATE_FAILURE_TEXT)
                }
            };
        }
    }

    let size = meta.len();
    let modified = meta.modified().unwrap_or(UNIX_EPOCH);
    let negotiation = cache::negotiate(config.cache, modified, size, &ctx.conditional);
    if negotiation.not_modified {
        return http::build_304_response(negotiation.headers);
    }

    // The file may have disappeared or lost its permissions since the stat
    let file = match File::open(path).await {
        Ok(file) => file,
        Err(e) => {
            logger::log_warning(&format!("Cannot open '{}': {e}", path.display()));
            return http::build_404_response();
        }
    };

    let body = match body::file_stream(file, path).await {
        Ok(body) => body,
        Err(e) => {
            logger::log_error(&format!("Failed to read file '{}': {e}", path.display()));
            return http::build_500_response(STREAM_FAILURE_TEXT);
        }
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, mime::content_type(path))
        .header(CONTENT_LENGTH, size);
    if let Some(disposition) = content_disposition(path) {
        builder = builder.header(CONTENT_DISPOSITION, disposition);
    }
    if let Some(headers) = builder.headers_mut() {
        headers.extend(negotiation.headers);
    }

    builder.body(body).unwrap_or_else(|e| {
        log_build_error("file", &e);
        Response::new(body::empty())
    })
}

/// `inline; filename="<name>"` with embedded quotes escaped
fn content_disposition(path: &Path) -> Option<HeaderValue> {
    let name = path.file_name()?.to_string_lossy();
    let value = format!("inline; filename=\"{}\"", name.replace('"', "\\\""));
    match HeaderValue::from_bytes(value.as_bytes()) {
        Ok(v) => Some(v),
        Err(e) => {
            logger::log_warning(&format!(
                "Skipping Content-Disposition for '{}': {e}",
                path.display()
            ));
            None
        }
    }
}
