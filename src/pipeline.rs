//! The hand-off between routing and whatever handles a routed request.
//!
//! After a successful lookup the router writes [`BackendUpstream`] into the
//! request extensions and calls the next [`PipelineStage`]. The stage reads
//! the upstream back with [`BackendUpstream::from_request`].

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

/// `host:port` of the upstream selected for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendUpstream(pub String);

impl BackendUpstream {
    #[must_use]
    pub fn from_request<B>(req: &Request<B>) -> Option<&str> {
        req.extensions().get::<Self>().map(|u| u.0.as_str())
    }
}

// async_trait is required here because stages are held as Arc<dyn PipelineStage>
// and native async fn in traits (Rust 1.75+) does not support dyn dispatch.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    async fn handle(&self, req: Request<Body>) -> Response;
}
