//! Per-request proxy context.

use axum::http::Uri;
use url::Url;

use crate::codec::{ProxyToken, TargetOrigin};
use crate::error::ProxyError;
use crate::proxy::rewriter::RewriteRule;

/// Everything derived from the inbound path for one proxied request.
///
/// Created by the router, owned by the handler, dropped with the response.
#[derive(Debug, Clone)]
pub struct ProxyRequestContext {
    token: ProxyToken,
    target: TargetOrigin,
    /// Path after the token segment, verbatim. `None` when the inbound path
    /// ends at the token.
    residual_path: Option<String>,
    query: Option<String>,
    /// `/<prefix>/<token>`
    proxy_base: String,
}

impl ProxyRequestContext {
    pub fn new(
        prefix: &str,
        token: ProxyToken,
        target: TargetOrigin,
        residual_path: &str,
        query: Option<&str>,
    ) -> Self {
        let proxy_base = format!("/{}/{}", prefix, token);
        Self {
            token,
            target,
            residual_path: (!residual_path.is_empty()).then(|| residual_path.to_string()),
            query: query.map(str::to_string),
            proxy_base,
        }
    }

    pub fn token(&self) -> &ProxyToken {
        &self.token
    }

    pub fn target(&self) -> &TargetOrigin {
        &self.target
    }

    pub fn proxy_base(&self) -> &str {
        &self.proxy_base
    }

    /// Path and query to request upstream.
    ///
    /// With a residual path the inbound path and query are used verbatim.
    /// Without one the request lands on the URL the token encodes.
    pub fn upstream_path_and_query(&self) -> String {
        match &self.residual_path {
            Some(path) => match &self.query {
                Some(q) => format!("{}?{}", path, q),
                None => path.clone(),
            },
            None => {
                let query = self.query.as_deref().or(self.target.query());
                match query {
                    Some(q) => format!("{}?{}", self.target.path(), q),
                    None => self.target.path().to_string(),
                }
            }
        }
    }

    fn upstream_string(&self) -> String {
        format!(
            "{}://{}{}",
            self.target.scheme(),
            self.target.authority(),
            self.upstream_path_and_query()
        )
    }

    /// Absolute URI for the outbound request.
    pub fn upstream_uri(&self) -> Result<Uri, ProxyError> {
        Uri::try_from(self.upstream_string()).map_err(|e| ProxyError::InvalidTarget(e.to_string()))
    }

    /// The upstream request URL, used as the base for resolving relative
    /// redirects. Falls back to the target itself.
    pub fn upstream_url(&self) -> Url {
        Url::parse(&self.upstream_string()).unwrap_or_else(|_| self.target.as_url().clone())
    }

    pub fn rewrite_rule(&self) -> RewriteRule {
        RewriteRule::new(self.target.hostname(), &self.proxy_base)
    }
}
