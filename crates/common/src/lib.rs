//! Common utilities and types shared by the broker-side and client-side
//! OAuth security crates.

#![warn(clippy::pedantic)]

/// Module for common error types
pub mod error;

/// Module for the parsed bearer token model
pub mod token;

/// Module for role extraction from token claims
pub mod roles;

/// Module for option-map parsing helpers
pub mod options;

/// Module for URL normalization and rewriting
pub mod endpoint;

/// Module for secret types that prevent accidental logging
pub mod secret;

pub use error::{ConfigError, TokenParseError};
pub use token::{Token, TokenHeader};
