//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, middleware stack)
//!     → request.rs (request ID assigned and propagated)
//!     → routing (token → ProxyRequestContext)
//!     → proxy::dispatcher (upstream exchange)
//!     → proxy::response (Location + HTML rewriting)
//!     → Send to client
//! ```

pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
