//! Proxy pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyRequestContext + inbound request
//!     → dispatcher.rs (outbound request, hop-by-hop stripped, no redirects followed)
//!     → upstream response (status, headers, body)
//!     → response.rs (Location + HTML rewriting via a Rewriter strategy)
//!     → client response
//! ```
//!
//! # Design Decisions
//! - Dispatcher errors end the request; rewrite errors never do
//! - The rewriting strategy sits behind the `Rewriter` trait
//! - One upstream deadline covers the exchange and any HTML buffering

pub mod dispatcher;
pub mod response;
pub mod rewriter;

pub use dispatcher::Dispatcher;
pub use response::ResponseRewriter;
pub use rewriter::{RewriteError, RewriteRule, Rewriter, UrlRewriter};
