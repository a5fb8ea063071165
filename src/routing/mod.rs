//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate prefixes)
//!     → Return: matched Route or NoRouteFound
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Parse upstream base URLs
//!     → Compile prefix matchers
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Longest prefix wins; ties go to the earliest registration

pub mod matcher;
pub mod router;

pub use router::{Route, RouteTable, Upstream};
