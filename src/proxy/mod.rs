//! Proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy-route request (body unread)
//!     → routing (resolve upstream)
//!     → forwarder.rs (rewrite headers, stream body)
//!     → progress.rs (pause the deadline while the client is uploading)
//!     → Upstream
//!     → forwarder.rs (relay status, headers, body)
//! ```

pub mod forwarder;
pub mod progress;

pub use forwarder::Forwarder;
