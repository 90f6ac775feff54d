//! Construction-time errors
//!
//! Everything that can be wrong with a handler configuration is reported once,
//! when the handler is built. Nothing in here is produced per request.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StaticConfigError {
    #[error("root directory must be a non-empty path")]
    EmptyRoot,

    #[error("root directory must be an absolute path, got '{0}'")]
    RelativeRoot(PathBuf),

    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("url prefix must be empty or start with '/', got '{0}'")]
    InvalidUrlPrefix(String),

    #[error("reserved url must start with '/' and name a single segment, got '{0}'")]
    InvalidReservedUrl(String),

    #[error("invalid index pattern '{pattern}': {source}")]
    InvalidIndexPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
