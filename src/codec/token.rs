//! Proxy tokens and target origins.

use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use thiserror::Error;
use url::{Position, Url};

/// Errors produced while decoding a token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Not valid base64 after padding restoration, or not UTF-8.
    #[error("invalid token encoding: {0}")]
    InvalidEncoding(String),

    /// Decoded text is not an absolute http(s) URL with a host.
    #[error("invalid target URL: {0}")]
    InvalidTarget(String),
}

/// An absolute http(s) URL identifying the upstream server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetOrigin(Url);

impl TargetOrigin {
    /// Parse an absolute target URL.
    pub fn parse(input: &str) -> Result<Self, CodecError> {
        let url = Url::parse(input).map_err(|e| CodecError::InvalidTarget(e.to_string()))?;
        Self::from_url(url)
    }

    /// Wrap an already parsed URL, checking it can serve as a target.
    pub fn from_url(url: Url) -> Result<Self, CodecError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CodecError::InvalidTarget(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }
        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(Self(url)),
            _ => Err(CodecError::InvalidTarget("missing host".to_string())),
        }
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Lowercased hostname, without port. IPv6 hosts keep their brackets.
    pub fn hostname(&self) -> &str {
        // from_url guarantees a host
        self.0.host_str().unwrap_or_default()
    }

    /// `host[:port]` as it appears in the URL, without userinfo.
    pub fn authority(&self) -> &str {
        &self.0[Position::BeforeHost..Position::AfterPort]
    }

    /// Base path of the target (at least `/`).
    pub fn path(&self) -> &str {
        self.0.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.0.query()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TargetOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// URL-safe, padding-free token carried as a single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyToken(String);

impl ProxyToken {
    /// Wrap a token taken verbatim from a request path.
    pub fn from_segment(segment: impl Into<String>) -> Self {
        Self(segment.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProxyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode a target into its path-safe token.
pub fn encode(origin: &TargetOrigin) -> ProxyToken {
    ProxyToken(general_purpose::URL_SAFE_NO_PAD.encode(origin.as_str()))
}

/// Decode a token back into its target.
pub fn decode(token: &str) -> Result<TargetOrigin, CodecError> {
    let mut standard: String = token
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while standard.len() % 4 != 0 {
        standard.push('=');
    }

    let bytes = general_purpose::STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| CodecError::InvalidEncoding(e.to_string()))?;
    let text = String::from_utf8(bytes).map_err(|e| CodecError::InvalidEncoding(e.to_string()))?;

    TargetOrigin::parse(&text)
}
