//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (CORS, request ID, tracing, panic recovery)
//!     → classify.rs (proxy route or local route, by path only)
//!         proxy → routing (resolve upstream) → proxy::forwarder → relay
//!         local → local.rs (cookies, JSON body limit) → health / 404
//!     → response.rs (errors as JSON)
//!     → Send to client
//! ```

pub mod classify;
pub mod local;
pub mod request;
pub mod response;
pub mod server;

pub use classify::{Classifier, RouteClass};
pub use request::X_REQUEST_ID;
pub use response::GatewayError;
pub use server::{HttpServer, ServerError};
