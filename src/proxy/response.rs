//! Upstream response transformation.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from the upstream response
//! - Rewrite the `Location` header so redirects stay inside the proxy
//! - Rewrite absolute target URLs in identity-encoded HTML bodies
//!
//! # Design Decisions
//! - Best effort: any rewrite failure leaves that piece of content untouched
//! - Non-HTML bodies are streamed through without buffering
//! - HTML is buffered up to a limit; larger bodies stream through as they are

use std::borrow::Cow;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Response},
};
use futures_util::{stream, StreamExt};
use tokio::time::Instant;

use crate::error::ProxyError;
use crate::observability::metrics;
use crate::proxy::rewriter::{RewriteError, RewriteRule, Rewriter};
use crate::resilience::timeouts;
use crate::routing::ProxyRequestContext;
use crate::security::headers::strip_hop_by_hop;

/// Applies a [`Rewriter`] strategy to upstream responses.
#[derive(Debug, Clone)]
pub struct ResponseRewriter {
    strategy: Arc<dyn Rewriter>,
    max_body_bytes: usize,
}

impl ResponseRewriter {
    pub fn new(strategy: Arc<dyn Rewriter>, max_body_bytes: usize) -> Self {
        Self {
            strategy,
            max_body_bytes,
        }
    }

    /// Transform an upstream response for the client.
    ///
    /// Only fails when the upstream body breaks (or the deadline passes)
    /// while an HTML document is being buffered.
    pub async fn rewrite(
        &self,
        ctx: &ProxyRequestContext,
        response: Response<Body>,
        deadline: Instant,
    ) -> Result<Response<Body>, ProxyError> {
        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);

        let rule = ctx.rewrite_rule();
        if let Err(e) = self.rewrite_location(ctx, &rule, &mut parts.headers) {
            tracing::debug!(error = %e, target = %ctx.target(), "Location left unmodified");
        }

        if !self.should_rewrite_body(&parts.headers) {
            return Ok(Response::from_parts(parts, body));
        }

        let buffered = timeouts::within(deadline, buffer_up_to(body, self.max_body_bytes))
            .await
            .map_err(|e| ProxyError::UpstreamUnreachable(format!("reading HTML body: {}", e)))?
            .map_err(|e| ProxyError::UpstreamUnreachable(format!("reading HTML body: {}", e)))?;

        let bytes = match buffered {
            Buffered::Complete(bytes) => bytes,
            Buffered::Overflow(body) => {
                tracing::debug!(
                    limit = self.max_body_bytes,
                    target = %ctx.target(),
                    "HTML body exceeds rewrite limit, passing through"
                );
                return Ok(Response::from_parts(parts, body));
            }
        };

        let rewritten = match self.rewrite_body(&rule, &bytes) {
            Ok(Cow::Owned(text)) => Some(text),
            Ok(Cow::Borrowed(_)) => None,
            Err(e) => {
                tracing::debug!(error = %e, target = %ctx.target(), "HTML body left unmodified");
                None
            }
        };

        let body = match rewritten {
            Some(text) => {
                metrics::record_rewrite("html");
                parts.headers.remove(header::CONTENT_LENGTH);
                Body::from(text)
            }
            None => Body::from(bytes),
        };
        Ok(Response::from_parts(parts, body))
    }

    fn rewrite_location(
        &self,
        ctx: &ProxyRequestContext,
        rule: &RewriteRule,
        headers: &mut HeaderMap,
    ) -> Result<(), RewriteError> {
        let Some(value) = headers.get(header::LOCATION) else {
            return Ok(());
        };
        let location = value.to_str().map_err(|_| RewriteError::OpaqueLocation)?;

        if let Some(rewritten) = self
            .strategy
            .rewrite_location(rule, location, &ctx.upstream_url())?
        {
            let value =
                HeaderValue::from_str(&rewritten).map_err(|_| RewriteError::InvalidHeaderValue)?;
            tracing::debug!(from = %location, to = %rewritten, "Rewrote Location");
            headers.insert(header::LOCATION, value);
            metrics::record_rewrite("location");
        }
        Ok(())
    }

    fn rewrite_body<'a>(
        &self,
        rule: &RewriteRule,
        bytes: &'a [u8],
    ) -> Result<Cow<'a, str>, RewriteError> {
        let text = std::str::from_utf8(bytes).map_err(|_| RewriteError::NotUtf8)?;
        Ok(self.strategy.rewrite_html(rule, text))
    }

    fn should_rewrite_body(&self, headers: &HeaderMap) -> bool {
        if !is_html(headers) || !is_identity_encoded(headers) {
            return false;
        }
        match declared_length(headers) {
            Some(len) => len <= self.max_body_bytes as u64,
            None => true,
        }
    }
}

/// Media type is `text/html`, ignoring case and parameters.
pub fn is_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case("text/html"))
        .unwrap_or(false)
}

fn is_identity_encoded(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::CONTENT_ENCODING)
        .iter()
        .all(|v| {
            v.to_str()
                .map(|s| s.trim().is_empty() || s.trim().eq_ignore_ascii_case("identity"))
                .unwrap_or(false)
        })
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

enum Buffered {
    Complete(Bytes),
    /// Limit exceeded; the already-read prefix is chained back in front of the rest.
    Overflow(Body),
}

async fn buffer_up_to(body: Body, limit: usize) -> Result<Buffered, axum::Error> {
    let mut data = body.into_data_stream();
    let mut buf: Vec<u8> = Vec::new();

    while let Some(chunk) = data.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            let head = stream::iter([Ok(Bytes::from(buf)), Ok(chunk)]);
            return Ok(Buffered::Overflow(Body::from_stream(head.chain(data))));
        }
        buf.extend_from_slice(&chunk);
    }

    Ok(Buffered::Complete(Bytes::from(buf)))
}
