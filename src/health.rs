//! `GET /_sqlrouter/health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload containing the server
//! version and commit, uptime, lookup store pool state, and cumulative routing
//! outcome counters. Responds `503` once the store has been closed.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::router::StatsSnapshot;
use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub commit: String,
    pub uptime_seconds: u64,
    pub store: StoreHealth,
    pub stats: StatsSnapshot,
}

#[derive(Serialize, Deserialize)]
pub struct StoreHealth {
    pub open: bool,
    pub connections: u32,
    pub idle: usize,
}

pub async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let resolver = state.router.resolver();
    let open = !resolver.is_closed();

    let (status, label) = if open {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded")
    };

    let body = HealthResponse {
        status: label.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        commit: env!("SQLROUTER_GIT_SHORT").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        store: StoreHealth {
            open,
            connections: resolver.pool_size(),
            idle: resolver.idle_connections(),
        },
        stats: state.router.stats().snapshot(),
    };

    (status, Json(body))
}
