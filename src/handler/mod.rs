//! Static file handler
//!
//! A pipeline stage serving files below a root directory. Requests are
//! resolved to a candidate path, then dispatched on what is found there:
//! regular files are streamed (or handed to a template renderer), directories
//! get their index file or a generated listing.

pub mod file;
pub mod index;
pub mod listing;
pub mod resolve;
pub mod template;

use async_trait::async_trait;
use hyper::Response;
use std::sync::Arc;
use tokio::fs;

use crate::config::StaticConfig;
use crate::http::{self, Body};
use crate::pipeline::{Middleware, Next, ServerRequest};
use resolve::Resolution;

pub use index::Matcher;
pub use template::{RenderError, TemplateRenderer};

/// Static file serving stage
#[derive(Debug, Clone)]
pub struct StaticHandler {
    config: Arc<StaticConfig>,
}

impl StaticHandler {
    pub fn new(config: StaticConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

#[async_trait]
impl Middleware for StaticHandler {
    async fn handle(&self, req: ServerRequest, next: Next<'_>) -> Response<Body> {
        let ctx = match resolve::resolve(&self.config, &req) {
            Resolution::Delegate => return next.run(req).await,
            Resolution::Forbidden => return http::build_403_response(),
            Resolution::NotFound => return http::build_404_response(),
            Resolution::Candidate(ctx) => ctx,
        };

        // Follows symlinks; any failure (missing, permissions, loop) is a 404
        let Ok(meta) = fs::metadata(&ctx.candidate).await else {
            return http::build_404_response();
        };

        if meta.is_dir() {
            if !self.config.show_dir_contents {
                return http::build_404_response();
            }
            if let Some((index_path, index_meta)) =
                index::find_index(&ctx.candidate, &self.config.index).await
            {
                return file::serve_file(&self.config, &ctx, req, next, &index_path, &index_meta)
                    .await;
            }
            return listing::render_listing(&self.config, &ctx).await;
        }

        if meta.is_file() {
            return file::serve_file(&self.config, &ctx, req, next, &ctx.candidate, &meta).await;
        }

        http::build_404_response()
    }
}
