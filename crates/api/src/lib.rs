//! HTTP API layer for peersup.
//!
//! This crate provides the REST API consumed by the mobile apps:
//!
//! - **Endpoints**: sessions, reschedule requests, notifications, users
//! - **Extractors**: bearer-token authentication
//! - **Middleware**: auth, logging, CORS
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
