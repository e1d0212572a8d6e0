//! URL rewriting strategies.
//!
//! # Responsibilities
//! - Decide which hosts belong to a proxied target (exact or subdomain)
//! - Rewrite absolute URLs in HTML text to proxy-relative ones
//! - Rewrite `Location` values, resolving relative redirects first
//!
//! # Design Decisions
//! - `Rewriter` is a trait so the scanning strategy can be swapped
//!   (e.g. for an attribute-aware HTML parser) without touching the pipeline
//! - The default strategy is a regex scan: approximate, but it never touches
//!   text that is not URL-shaped and never fails the response

use std::borrow::Cow;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

/// Non-fatal rewrite failures. The affected content passes through unchanged.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("unparsable Location header: {0}")]
    InvalidLocation(#[from] url::ParseError),

    #[error("Location header is not visible ASCII")]
    OpaqueLocation,

    #[error("rewritten Location is not a valid header value")]
    InvalidHeaderValue,

    #[error("HTML body is not valid UTF-8")]
    NotUtf8,
}

/// Which host to match and what to put in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRule {
    host: String,
    proxy_base: String,
}

impl RewriteRule {
    pub fn new(host: &str, proxy_base: &str) -> Self {
        Self {
            host: normalize_host(host),
            proxy_base: proxy_base.to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn proxy_base(&self) -> &str {
        &self.proxy_base
    }

    /// True if `host` is the target host or one of its subdomains.
    ///
    /// The suffix must start at a label boundary: `cdn.example.com` is covered
    /// by `example.com`, `notexample.com` is not.
    pub fn covers(&self, host: &str) -> bool {
        let host = normalize_host(host);
        if host == self.host {
            return true;
        }
        host.len() > self.host.len()
            && host.ends_with(&self.host)
            && host.as_bytes()[host.len() - self.host.len() - 1] == b'.'
    }
}

fn normalize_host(host: &str) -> String {
    host.trim_end_matches('.').to_ascii_lowercase()
}

/// A strategy for rewriting response content.
pub trait Rewriter: Send + Sync + fmt::Debug {
    /// Rewrite URLs pointing at the target inside an HTML document.
    /// Returns `Cow::Borrowed` when nothing changed.
    fn rewrite_html<'a>(&self, rule: &RewriteRule, html: &'a str) -> Cow<'a, str>;

    /// Rewrite a `Location` value. `base` is the URL the response came from.
    ///
    /// `Ok(None)` means the location leaves the target and is kept as is.
    fn rewrite_location(
        &self,
        rule: &RewriteRule,
        location: &str,
        base: &Url,
    ) -> Result<Option<String>, RewriteError>;
}

/// Absolute http(s) URL up to the end of its authority. Stops at path/query/
/// fragment delimiters, at anything that ends a URL inside HTML and at
/// punctuation that cannot appear in a host.
static ABSOLUTE_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)https?://[^\s"'`<>/?#\\(),;&]+"#).expect("valid absolute URL regex")
});

/// Regex scanner for bodies, `url` crate resolution for redirects.
#[derive(Debug, Default, Clone, Copy)]
pub struct UrlRewriter;

impl Rewriter for UrlRewriter {
    fn rewrite_html<'a>(&self, rule: &RewriteRule, html: &'a str) -> Cow<'a, str> {
        let mut out: Option<String> = None;
        let mut last = 0;

        for m in ABSOLUTE_URL_RE.find_iter(html) {
            // "xhttp://" is not the start of a URL
            if preceded_by_scheme_char(html, m.start()) {
                continue;
            }
            let candidate = authority_candidate(html, m.start(), m.end());
            let end = m.start() + candidate.len();
            let Ok(url) = Url::parse(candidate) else {
                continue;
            };
            match url.host_str() {
                Some(host) if rule.covers(host) => {}
                _ => continue,
            }

            let buf = out.get_or_insert_with(|| String::with_capacity(html.len()));
            buf.push_str(&html[last..m.start()]);
            buf.push_str(rule.proxy_base());
            if !html[end..].starts_with('/') {
                buf.push('/');
            }
            last = end;
        }

        match out {
            Some(mut buf) => {
                buf.push_str(&html[last..]);
                Cow::Owned(buf)
            }
            None => Cow::Borrowed(html),
        }
    }

    fn rewrite_location(
        &self,
        rule: &RewriteRule,
        location: &str,
        base: &Url,
    ) -> Result<Option<String>, RewriteError> {
        let resolved = base.join(location.trim())?;
        if !matches!(resolved.scheme(), "http" | "https") {
            return Ok(None);
        }
        match resolved.host_str() {
            Some(host) if rule.covers(host) => {}
            _ => return Ok(None),
        }

        let mut rewritten = String::from(rule.proxy_base());
        rewritten.push_str(resolved.path());
        if let Some(query) = resolved.query() {
            rewritten.push('?');
            rewritten.push_str(query);
        }
        Ok(Some(rewritten))
    }
}

/// The matched URL without sentence punctuation. Trailing dots only belong
/// to the host (as an FQDN root) when a path, query or fragment follows.
fn authority_candidate(text: &str, start: usize, end: usize) -> &str {
    let matched = &text[start..end];
    if text[end..].starts_with(['/', '?', '#']) {
        matched
    } else {
        matched.trim_end_matches('.')
    }
}

fn preceded_by_scheme_char(text: &str, idx: usize) -> bool {
    text[..idx]
        .chars()
        .next_back()
        .map(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        .unwrap_or(false)
}
