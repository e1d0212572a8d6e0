//! Upstream dispatcher.
//!
//! # Responsibilities
//! - Build the outbound request from the context and the inbound request
//! - Send it over a pooled hyper client (http or https)
//! - Report connect failures and deadline expiry as `UpstreamUnreachable`
//!
//! # Design Decisions
//! - Redirects are never followed here; they go back to the caller for rewriting
//! - The request body is streamed straight through
//! - Dropping the returned future aborts the upstream exchange

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, Response},
};
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::{TokioExecutor, TokioTimer},
};
use tokio::time::Instant;

use crate::config::TimeoutConfig;
use crate::error::ProxyError;
use crate::resilience::timeouts;
use crate::routing::ProxyRequestContext;
use crate::security::headers::upstream_request_headers;

/// Client used for all upstream traffic. The pool is shared across requests.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Forwards proxied requests to their target origin.
#[derive(Clone)]
pub struct Dispatcher {
    client: UpstreamClient,
}

impl Dispatcher {
    pub fn new(timeouts: &TimeoutConfig) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(Duration::from_secs(timeouts.idle_secs))
            .build(https);

        Self { client }
    }

    /// Send the request upstream and return the raw response.
    pub async fn dispatch(
        &self,
        ctx: &ProxyRequestContext,
        request: Request<Body>,
        deadline: Instant,
    ) -> Result<Response<Body>, ProxyError> {
        let (parts, body) = request.into_parts();
        let uri = ctx.upstream_uri()?;

        let mut outbound = Request::builder()
            .method(parts.method)
            .uri(uri)
            .body(body)
            .map_err(|e| ProxyError::InvalidTarget(e.to_string()))?;
        *outbound.headers_mut() = upstream_request_headers(&parts.headers, ctx.target().authority());

        tracing::debug!(
            method = %outbound.method(),
            uri = %outbound.uri(),
            "Dispatching upstream request"
        );

        let response: Response<Incoming> = timeouts::within(deadline, self.client.request(outbound))
            .await
            .map_err(|e| ProxyError::UpstreamUnreachable(format!("{}: {}", ctx.target(), e)))?
            .map_err(|e| ProxyError::UpstreamUnreachable(format!("{}: {:?}", ctx.target(), e)))?;

        Ok(response.map(Body::new))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
