//! Target codec subsystem.
//!
//! # Data Flow
//! ```text
//! Absolute origin URL ("https://example.com/")
//!     → token.rs encode (UTF-8 bytes → base64 → URL-safe alphabet, no padding)
//!     → ProxyToken ("aHR0cHM6Ly9leGFtcGxlLmNvbS8")
//!
//! Path segment from /proxy/<token>/...
//!     → token.rs decode (restore alphabet + padding → base64 → UTF-8 → URL parse)
//!     → TargetOrigin
//! ```
//!
//! # Design Decisions
//! - Pure functions, no shared state
//! - Decoding never yields a partial target: it either parses or fails
//! - Only http and https targets are accepted (the dispatcher cannot dial anything else)

pub mod token;

pub use token::{decode, encode, CodecError, ProxyToken, TargetOrigin};
