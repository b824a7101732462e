//! Common error types for the OAuth security crates.

use thiserror::Error;

/// Errors raised while parsing a raw bearer token into a [`crate::Token`].
///
/// Parsing is all-or-nothing: any of these means no token was produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenParseError {
    /// Token size exceeds the maximum allowed before any decoding.
    #[error("token exceeds maximum size")]
    TooLarge,

    /// Not three base64url segments with a decodable header and payload.
    #[error("malformed structure")]
    MalformedStructure,

    /// Payload decoded, but to something other than a JSON object.
    #[error("missing payload")]
    MissingPayload,

    /// A mandatory claim is absent or has the wrong JSON type.
    #[error("missing required claim: {0}")]
    MissingClaim(&'static str),
}

/// Invalid configuration detected while turning an option map into a
/// component configuration. Fatal at configure time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An option is present but its value cannot be used.
    #[error("Invalid value for option '{key}': {reason}")]
    InvalidOption { key: String, reason: String },

    /// The identity provider whitelist is not a JSON array of address pairs.
    #[error("Invalid identity provider whitelist: {0}")]
    InvalidWhitelist(String),

    /// A principal string is not of the form `Type:name`.
    #[error("Invalid principal '{0}': expected 'Type:name'")]
    InvalidPrincipal(String),
}
