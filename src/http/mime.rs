//! MIME type detection module
//!
//! Thin layer over `mime_guess`: the response path wants a header value and
//! always gets one, the directory listing wants a label and shows `unknown`
//! when the extension is not recognised.

use std::path::Path;

/// Content-Type header value for a file
///
/// # Examples
/// ```
/// use static_webserver::http::mime::content_type;
/// assert_eq!(content_type("a.txt".as_ref()), "text/plain");
/// assert_eq!(content_type("blob".as_ref()), "application/octet-stream");
/// ```
pub fn content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Mime label for a directory listing row, `None` when unknown
pub fn lookup(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_types() {
        assert_eq!(content_type(Path::new("index.html")), "text/html");
        assert_eq!(content_type(Path::new("style.css")), "text/css");
        assert_eq!(content_type(Path::new("a.txt")), "text/plain");
        assert_eq!(content_type(Path::new("data.json")), "application/json");
        assert_eq!(content_type(Path::new("logo.png")), "image/png");
    }

    #[test]
    fn test_unknown_extension() {
        assert_eq!(
            content_type(Path::new("file.xyzunknown")),
            "application/octet-stream"
        );
        assert_eq!(lookup(Path::new("file.xyzunknown")), None);
        assert_eq!(lookup(Path::new("README")), None);
    }

    #[test]
    fn test_lookup_known() {
        assert_eq!(lookup(Path::new("/srv/site/a.txt")).as_deref(), Some("text/plain"));
    }
}
