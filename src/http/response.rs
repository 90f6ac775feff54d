//! HTTP response building module
//!
//! Canned responses used by the static handler and the pipeline fallback.
//! Builder failures are logged and degrade to an empty response instead of
//! panicking on the request path.

use hyper::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Response, StatusCode};

use super::body::{self, Body};

/// Fixed page for every not-found outcome
pub const NOT_FOUND_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta http-equiv="X-UA-Compatible" content="IE=edge">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>URL not found</title>
</head>
<body>
<h1>Not Found</h1>
<h3>The requested URL was not found on this server.</h3>
</body>
</html>
"#;

/// Page returned (with 200) when a confirmed directory cannot be read
pub const DIRECTORY_ERROR_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Error</title>
</head>
<body>
<h1>Error Reading Directory</h1>
<p>Unable to access directory contents.</p>
</body>
</html>
"#;

pub const TEMPLATE_FAILURE_TEXT: &str = "Internal Server Error - Template Rendering Failed";
pub const STREAM_FAILURE_TEXT: &str = "Error reading file";

/// Build 404 Not Found response with the fixed HTML page
pub fn build_404_response() -> Response<Body> {
    build_text_like(StatusCode::NOT_FOUND, "text/html; charset=utf-8", NOT_FOUND_PAGE)
}

/// Build 403 Forbidden response
pub fn build_403_response() -> Response<Body> {
    build_text_like(StatusCode::FORBIDDEN, "text/plain; charset=utf-8", "Forbidden")
}

/// Build 500 response with a fixed plain-text message
pub fn build_500_response(message: &'static str) -> Response<Body> {
    build_text_like(
        StatusCode::INTERNAL_SERVER_ERROR,
        "text/plain; charset=utf-8",
        message,
    )
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Body> {
    build_text_like(
        StatusCode::PAYLOAD_TOO_LARGE,
        "text/plain; charset=utf-8",
        "413 Payload Too Large",
    )
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<Body> {
    build_text_like(
        StatusCode::BAD_REQUEST,
        "text/plain; charset=utf-8",
        "400 Bad Request",
    )
}

/// Plain 404 used when no pipeline stage produced a response
pub fn build_fallback_response() -> Response<Body> {
    build_text_like(StatusCode::NOT_FOUND, "text/plain; charset=utf-8", "404 Not Found")
}

/// Build 200 HTML response
pub fn build_html_response(content: String) -> Response<Body> {
    let content_length = content.len();
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .header(CONTENT_LENGTH, content_length)
        .body(body::full(content))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(body::empty())
        })
}

/// Build 304 Not Modified response carrying the cache headers
pub fn build_304_response(cache_headers: HeaderMap) -> Response<Body> {
    let mut resp = Response::new(body::empty());
    *resp.status_mut() = StatusCode::NOT_MODIFIED;
    *resp.headers_mut() = cache_headers;
    resp
}

fn build_text_like(status: StatusCode, content_type: &str, text: &'static str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, text.len())
        .body(body::full(text))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            let mut resp = Response::new(body::full(text));
            *resp.status_mut() = status;
            resp
        })
}

/// Log response build error
pub(crate) fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn text_of(resp: Response<Body>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_404_page() {
        let resp = build_404_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let text = text_of(resp).await;
        assert!(text.contains("<title>URL not found</title>"));
        assert!(text.contains("<h1>Not Found</h1>"));
    }

    #[tokio::test]
    async fn test_403_is_plain_text() {
        let resp = build_403_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            resp.headers()[CONTENT_TYPE].to_str().unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(text_of(resp).await, "Forbidden");
    }

    #[tokio::test]
    async fn test_html_response_length() {
        let resp = build_html_response("<p>hi</p>".to_string());
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_LENGTH], "9");
    }
}
