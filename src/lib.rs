//! API gateway for the queue-booking services.
//!
//! Routes `/api/v1/...` requests to the user and department services by
//! longest path prefix, streaming bodies through untouched, and answers
//! its own health check.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
