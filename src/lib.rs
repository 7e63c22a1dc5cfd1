//! sqlrouter is a host-based reverse proxy whose routing table lives in an
//! embedded SQLite database.
//!
//! Every request's host is reduced to a routing key (its first label),
//! which is bound to a single prepared query against a read-only,
//! pooled store. A matching row yields the upstream `host:port` that the
//! proxy stage forwards to; a malformed host, missing row or store
//! failure ends the request with 400, 404 or 502.
//!
//! # Architecture
//!
//! - [`key`] -- Routing key extraction from the request host.
//! - [`store`] -- The [`Resolver`](store::Resolver): store provisioning,
//!   per-request lookup, and teardown.
//! - [`query`] -- Lexical checks on lookup query text.
//! - [`router`] -- Maps lookup outcomes onto HTTP responses and hands
//!   routed requests to the next stage.
//! - [`pipeline`] -- The [`PipelineStage`](pipeline::PipelineStage)
//!   capability and the published upstream slot.
//! - [`proxy`] -- The forwarding stage: header construction and the
//!   pooled upstream client.
//! - [`server`] -- Axum server setup, shared state, graceful shutdown.
//! - [`health`] -- `GET /_sqlrouter/health` handler.
//! - [`config`] -- Config file model, parsing, and validation.
//! - [`cli`] / [`cmd`] -- Command-line parsing and subcommands.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty output.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `sentry-integration` | Sentry error tracking |
//! | `file-backends` | All file format backends |
//! | `full` | All features |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod key;
pub mod logging;
pub mod pipeline;
pub mod proxy;
pub mod query;
pub mod router;
pub mod server;
pub mod store;

#[cfg(feature = "sentry-integration")]
pub mod sentry_integration;
