//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request URI (/proxy/<token>/<rest>?<query>)
//!     → router.rs (prefix check, token extraction)
//!     → codec (token → TargetOrigin)
//!     → context.rs (ProxyRequestContext with residual path+query)
//! ```
//!
//! # Design Decisions
//! - Router is immutable after construction (shared via Arc, no locks)
//! - Residual path is taken from the raw URI, never percent-decoded or normalized
//! - Token errors are reported before anything touches the network

pub mod context;
pub mod router;

pub use context::ProxyRequestContext;
pub use router::RequestRouter;
