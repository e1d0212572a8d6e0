//! Request router: `/<prefix>/<token>/<rest>` → ProxyRequestContext.
//!
//! # Responsibilities
//! - Recognize paths under the configured prefix
//! - Extract the token segment and decode it
//! - Preserve the remainder of the path and the query byte-for-byte
//!
//! # Design Decisions
//! - Prefix matching is literal and case-sensitive
//! - No normalization: `..`, `//` and percent-escapes are the upstream's business

use axum::http::Uri;

use crate::codec::{self, ProxyToken};
use crate::error::ProxyError;
use crate::routing::context::ProxyRequestContext;

/// Maps inbound URIs under the proxy prefix to request contexts.
#[derive(Debug, Clone)]
pub struct RequestRouter {
    prefix: String,
}

impl RequestRouter {
    /// Create a router for the given prefix segment (e.g. `proxy`).
    /// Surrounding slashes are ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().trim_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the part of `path` after `/<prefix>`, if the path is under the prefix.
    fn strip_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix('/')?.strip_prefix(self.prefix.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }

    /// True when the path belongs to the proxy namespace.
    pub fn matches(&self, path: &str) -> bool {
        self.strip_prefix(path).is_some()
    }

    /// Decode the token and build the request context.
    ///
    /// Paths outside the prefix are reported as `MissingToken`; the HTTP layer
    /// only routes prefixed paths here.
    pub fn route(&self, uri: &Uri) -> Result<ProxyRequestContext, ProxyError> {
        let after_prefix = self.strip_prefix(uri.path()).ok_or(ProxyError::MissingToken)?;
        let after_slash = after_prefix.strip_prefix('/').unwrap_or(after_prefix);

        let (segment, residual) = match after_slash.find('/') {
            Some(idx) => after_slash.split_at(idx),
            None => (after_slash, ""),
        };
        if segment.is_empty() {
            return Err(ProxyError::MissingToken);
        }

        let target = codec::decode(segment)?;

        tracing::trace!(
            token = %segment,
            target = %target,
            residual = %residual,
            "Routed proxy request"
        );

        Ok(ProxyRequestContext::new(
            &self.prefix,
            ProxyToken::from_segment(segment),
            target,
            residual,
            uri.query(),
        ))
    }
}
