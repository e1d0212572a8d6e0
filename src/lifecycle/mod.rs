//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging/metrics → Bind listener → Serve
//!
//! Shutdown:
//!     Ctrl+C / SIGTERM / Shutdown::trigger
//!         → signals.rs resolves the shutdown future
//!         → axum stops accepting and drains in-flight requests
//! ```
//!
//! # Design Decisions
//! - Embedders (and tests) stop the server through `Shutdown`, no signals needed
//! - In-flight proxied requests finish before the server future returns

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
