//! Request pipeline
//!
//! A minimal middleware chain: every stage gets the request and a `Next`
//! continuation for the remaining stages. A stage either answers the request
//! itself or hands it on untouched by calling `next.run(req)`. When the chain
//! is exhausted a plain 404 is returned.

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::{Request, Response, Uri};
use std::sync::Arc;

use crate::http::{self, Body};

/// Request type seen by pipeline stages (body already collected)
pub type ServerRequest = Request<Bytes>;

/// Request URI before any rewriting stage changed it.
///
/// Stages that rewrite `req.uri()` insert this extension first (if it is not
/// there yet) so later stages can still see what the client asked for.
#[derive(Debug, Clone)]
pub struct OriginalUri(pub Uri);

/// One stage of the pipeline
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, req: ServerRequest, next: Next<'_>) -> Response<Body>;
}

/// Continuation over the remaining stages
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub const fn new(stages: &'a [Arc<dyn Middleware>]) -> Self {
        Self { stages }
    }

    /// Continuation with no stages left
    pub const fn end() -> Self {
        Self { stages: &[] }
    }

    /// Run the remaining stages
    pub async fn run(self, req: ServerRequest) -> Response<Body> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(req, Next::new(rest)).await,
            None => http::build_fallback_response(),
        }
    }
}

/// Ordered list of stages
#[derive(Default, Clone)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    #[must_use]
    pub fn with(mut self, stage: impl Middleware + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Dispatch a request through all stages
    pub async fn dispatch(&self, req: ServerRequest) -> Response<Body> {
        Next::new(&self.stages).run(req).await
    }
}
