//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → RequestBodyLimitLayer (configured max body size, 413 on excess)
//!     → headers.rs (drop hop-by-hop headers, set Host for the target)
//!     → Dispatcher
//!
//! Upstream response:
//!     → headers.rs (drop hop-by-hop headers)
//!     → Response rewriter
//! ```
//!
//! # Design Decisions
//! - Only end-to-end headers cross the proxy, in both directions
//! - Headers listed in `Connection` are treated as hop-by-hop too

pub mod headers;
