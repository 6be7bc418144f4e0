//! Health event log service.
//!
//! Accepts batches of health events over HTTP, anonymizes patient
//! identifiers before they reach storage, and serves filtered listings and
//! per-dimension counts back to authenticated clients.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http::server (request id, trace, timeout, limits, metrics)
//!                 │
//!                 ▼
//!              http::auth (bearer token) ──▶ http::handlers ──▶ http::validation
//!                                                │
//!                                                ▼
//!                                        service::HealthLogService
//!                                                │
//!                                                ▼
//!                                  storage::LogStore ──▶ SqliteLogStore ──▶ health_logs
//!
//!   Cross-cutting: config, observability, lifecycle
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod service;
pub mod storage;

pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{Application, Shutdown};
pub use service::HealthLogService;
