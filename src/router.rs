//! Per-request routing: host → key → lookup → next stage or error.
//!
//! [`HostRouter::serve_one`] runs a single pass with no retries:
//!
//! | Outcome | Response |
//! |---------|----------|
//! | host has no routing key | `400 Invalid host` |
//! | store failure | `502 Database error` |
//! | no row for key | `404 Not found` |
//! | row found | [`BackendUpstream`] set, next stage's response |
//!
//! Error bodies are static; causes are only logged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;
use crate::key::extract_key;
use crate::pipeline::{BackendUpstream, PipelineStage};
use crate::store::Resolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InvalidHost,
    NotFound,
    StoreFailure,
}

impl Rejection {
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidHost => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::StoreFailure => StatusCode::BAD_GATEWAY,
        }
    }

    #[must_use]
    pub const fn body(self) -> &'static str {
        match self {
            Self::InvalidHost => "Invalid host",
            Self::NotFound => "Not found",
            Self::StoreFailure => "Database error",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}

#[derive(Debug, Default)]
pub struct RouteStats {
    pub routed: AtomicU64,
    pub invalid_host: AtomicU64,
    pub not_found: AtomicU64,
    pub store_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub routed: u64,
    pub invalid_host: u64,
    pub not_found: u64,
    pub store_errors: u64,
}

impl RouteStats {
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            routed: self.routed.load(Ordering::Relaxed),
            invalid_host: self.invalid_host.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

pub struct HostRouter {
    resolver: Arc<Resolver>,
    next: Arc<dyn PipelineStage>,
    stats: RouteStats,
}

impl HostRouter {
    #[must_use]
    pub fn new(resolver: Arc<Resolver>, next: Arc<dyn PipelineStage>) -> Self {
        Self {
            resolver,
            next,
            stats: RouteStats::default(),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    #[must_use]
    pub const fn stats(&self) -> &RouteStats {
        &self.stats
    }

    pub async fn serve_one(&self, mut req: Request<Body>) -> Response {
        let Some(key) = request_host(&req).and_then(extract_key) else {
            self.stats.invalid_host.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(host = ?request_host(&req), "invalid host header");
            return Rejection::InvalidHost.into_response();
        };

        match self.resolver.resolve(&key).await {
            Ok(target) => {
                let upstream = target.to_string();
                tracing::debug!(key = %key, upstream = %upstream, "route resolved");
                self.stats.routed.fetch_add(1, Ordering::Relaxed);
                req.extensions_mut().insert(BackendUpstream(upstream));
                self.next.handle(req).await
            }
            Err(ResolveError::NotFound) => {
                self.stats.not_found.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, "no route for key");
                Rejection::NotFound.into_response()
            }
            Err(ResolveError::Store(e)) => {
                self.stats.store_errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(key = %key, error = %e, "database query failed");
                Rejection::StoreFailure.into_response()
            }
        }
    }
}

/// `Host` header, or the URI authority for HTTP/2 requests that omit it.
/// A `Host` header that is not visible ASCII yields `None`.
fn request_host<B>(req: &Request<B>) -> Option<&str> {
    match req.headers().get(header::HOST) {
        Some(value) => value.to_str().ok(),
        None => req.uri().authority().map(|a| a.as_str()),
    }
}
