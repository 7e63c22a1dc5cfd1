//! Forwarding stage for routed requests.
//!
//! [`ProxyStage`] is the [`PipelineStage`] run after a successful lookup.
//! It reads the [`BackendUpstream`] the router published, rewrites headers
//! ([`headers`]), sends the request over the shared pooled client and
//! relays the upstream response.

pub mod headers;

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use http_body_util::{BodyExt, Full};

use crate::config::model::ProxyConfig;
use crate::pipeline::{BackendUpstream, PipelineStage};
use crate::server::HttpClient;

pub struct ProxyStage {
    client: HttpClient,
    config: ProxyConfig,
}

impl ProxyStage {
    #[must_use]
    pub const fn new(client: HttpClient, config: ProxyConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PipelineStage for ProxyStage {
    async fn handle(&self, req: Request<Body>) -> Response {
        let correlation_id = req
            .headers()
            .get("x-correlation-id")
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);

        let Some(upstream) = BackendUpstream::from_request(&req).map(str::to_owned) else {
            tracing::error!(correlation_id = %correlation_id, "no backend upstream on request");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        };

        let client_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        let (parts, body) = req.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!(correlation_id = %correlation_id, error = %e, "failed to read request body");
                return (StatusCode::BAD_REQUEST, "Invalid request body").into_response();
            }
        };

        let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
        let target_url =
            match url::Url::parse(&format!("{}://{upstream}{path_and_query}", self.config.scheme)) {
                Ok(u) => u,
                Err(e) => {
                    tracing::error!(
                        correlation_id = %correlation_id,
                        upstream = %upstream,
                        error = %e,
                        "invalid upstream URL"
                    );
                    return (StatusCode::BAD_GATEWAY, "Upstream error").into_response();
                }
            };

        let forwarded_headers = headers::build_forwarded_headers(
            &parts.headers,
            client_ip.as_deref(),
            &target_url,
            &self.config,
            &correlation_id,
        );

        let mut req_builder = hyper::Request::builder()
            .method(parts.method.clone())
            .uri(target_url.as_str());
        for (key, value) in &forwarded_headers {
            req_builder = req_builder.header(key, value);
        }

        let upstream_req = match req_builder.body(Full::new(body)) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(correlation_id = %correlation_id, error = %e, "failed to build upstream request");
                return (StatusCode::BAD_GATEWAY, "Upstream error").into_response();
            }
        };

        tracing::info!(
            correlation_id = %correlation_id,
            method = %parts.method,
            path = %parts.uri.path(),
            upstream = %upstream,
            "forwarding request"
        );

        let timeout = Duration::from_millis(self.config.timeout);
        let response = match tokio::time::timeout(timeout, self.client.request(upstream_req)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    upstream = %upstream,
                    error = %e,
                    "upstream request failed"
                );
                return (StatusCode::BAD_GATEWAY, "Upstream error").into_response();
            }
            Err(_) => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    upstream = %upstream,
                    timeout_ms = self.config.timeout,
                    "upstream request timed out"
                );
                return (StatusCode::GATEWAY_TIMEOUT, "Upstream timed out").into_response();
            }
        };

        let status = response.status();
        let mut resp_headers = response.headers().clone();
        let body_bytes = match response.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::error!(
                    correlation_id = %correlation_id,
                    upstream = %upstream,
                    error = %e,
                    "failed to read upstream body"
                );
                return (StatusCode::BAD_GATEWAY, "Upstream error").into_response();
            }
        };

        headers::strip_response_hop_by_hop(&mut resp_headers);
        let mut builder = Response::builder().status(status);
        for (key, value) in &resp_headers {
            builder = builder.header(key, value);
        }
        builder
            .header("x-correlation-id", &correlation_id)
            .body(Body::from(body_bytes))
            .unwrap_or_else(|e| {
                tracing::error!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "failed to build response"
                );
                StatusCode::BAD_GATEWAY.into_response()
            })
    }
}
