//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment matching, capture extraction)
//!     → Return: matched handler + captures, or no match
//!
//! Table construction (at startup):
//!     compiled Route[]
//!     → one handler per path and alias
//!     → sort by specificity
//!     → freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path
//! - Deterministic: same input always matches same route
//! - Most specific pattern wins (static > capture > catch-all)

pub mod matcher;
pub mod router;

pub use matcher::{PathPattern, PatternError};
pub use router::{RouteHandler, RouteMatch, RouteTable};
