//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request accepted:
//!     → deadline = now + timeouts.upstream_secs
//!     → timeouts.rs bounds the upstream exchange (connect + response head)
//!     → timeouts.rs bounds HTML buffering with the same deadline
//! ```
//!
//! # Design Decisions
//! - Every upstream call has a deadline; expiry is reported as unreachable upstream
//! - No retries: proxied requests are forwarded once, whatever their method

pub mod timeouts;
