//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! handler logic: body type, cache negotiation, MIME lookup and canned responses.

pub mod body;
pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use body::Body;
pub use cache::{CachePolicy, ConditionalHeaders};
pub use response::{
    build_304_response, build_400_response, build_403_response, build_404_response,
    build_413_response, build_500_response, build_fallback_response, build_html_response,
};
