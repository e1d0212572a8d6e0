//! Path-addressed rewriting HTTP proxy.
//!
//! Requests to `/proxy/<token>/<rest>` are forwarded to the origin encoded in
//! `<token>` (URL-safe base64 of the absolute target URL). Redirects and
//! absolute links in HTML are rewritten so browsing stays inside the proxy.

// Core pipeline
pub mod codec;
pub mod error;
pub mod http;
pub mod proxy;
pub mod routing;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use codec::{decode, encode, ProxyToken, TargetOrigin};
pub use config::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
