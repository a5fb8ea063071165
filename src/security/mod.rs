//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → trust.rs (resolve client IP/protocol through trusted hops)
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//!     → Forward upstream
//! ```
//!
//! # Design Decisions
//! - Exactly the configured number of hops is trusted
//! - No trust in client-supplied forwarding headers beyond that

pub mod headers;
pub mod trust;

pub use trust::{ClientInfo, Proto};
