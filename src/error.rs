//! Request-level failures and their caller-visible outcomes.
//!
//! Codec and routing failures are answered with 400 before any upstream
//! contact. Dispatcher failures are answered with 500. Bodies are fixed
//! plain-text messages; details only go to the log.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::codec::CodecError;

pub const MISSING_TOKEN_MESSAGE: &str = "Missing target token.";
pub const INVALID_ENCODING_MESSAGE: &str = "Invalid target URL encoding.";
pub const INVALID_TARGET_MESSAGE: &str = "Invalid target URL.";
pub const PROXY_ERROR_MESSAGE: &str = "Proxy error.";

/// Errors that terminate a proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No token segment after the proxy prefix.
    #[error("missing target token")]
    MissingToken,

    /// Token is not valid base64url or not UTF-8.
    #[error("invalid target encoding: {0}")]
    InvalidEncoding(String),

    /// Decoded target is not a usable absolute URL.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// Connect failure, DNS failure, timeout or a broken upstream body.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MissingToken
            | ProxyError::InvalidEncoding(_)
            | ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamUnreachable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed message returned to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            ProxyError::MissingToken => MISSING_TOKEN_MESSAGE,
            ProxyError::InvalidEncoding(_) => INVALID_ENCODING_MESSAGE,
            ProxyError::InvalidTarget(_) => INVALID_TARGET_MESSAGE,
            ProxyError::UpstreamUnreachable(_) => PROXY_ERROR_MESSAGE,
        }
    }
}

impl From<CodecError> for ProxyError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::InvalidEncoding(detail) => ProxyError::InvalidEncoding(detail),
            CodecError::InvalidTarget(detail) => ProxyError::InvalidTarget(detail),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        match &self {
            ProxyError::UpstreamUnreachable(detail) => {
                tracing::error!(error = %detail, "Proxy error");
            }
            other => {
                tracing::debug!(error = %other, "Rejected proxy request");
            }
        }

        let mut response = (self.status(), self.public_message()).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}
