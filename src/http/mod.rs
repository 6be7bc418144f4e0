//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout, body limit, metrics)
//!     → auth.rs (bearer token check on API routes)
//!     → handlers.rs (extract payload)
//!     → validation.rs (field checks, conversion to storage types)
//!     → HealthLogService
//!     → error.rs (one status/body mapping for every failure)
//! ```

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod validation;

pub use error::ApiError;
pub use server::{build_router, AppState, HttpServer};
