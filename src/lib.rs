//! Static directory server
//!
//! A static file handler that plugs into a small middleware pipeline, plus
//! the hyper/tokio server that hosts it.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod pipeline;
pub mod server;

pub use config::{Config, StaticConfig, StaticOptions};
pub use error::StaticConfigError;
pub use handler::{Matcher, StaticHandler, TemplateRenderer};
pub use pipeline::{Middleware, Next, OriginalUri, Pipeline, ServerRequest};
