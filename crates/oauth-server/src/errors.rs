//! Token validation error types.
//!
//! Validation errors carry enough detail for server-side logs. What reaches
//! the remote client is only the generic [`ValidationError::reason`], wrapped
//! in an [`AuthenticationFailure`].

use security_common::TokenParseError;
use std::fmt;
use thiserror::Error;

/// Coarse classification of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedToken,
    IssuerNotTrusted,
    /// Transient: the identity provider did not answer. Callers may retry
    /// the whole authentication attempt.
    KeySourceUnavailable,
    KeyResolution,
    Signature,
    Claims,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::MalformedToken => "malformed_token",
            ErrorKind::IssuerNotTrusted => "issuer_not_trusted",
            ErrorKind::KeySourceUnavailable => "key_source_unavailable",
            ErrorKind::KeyResolution => "key_resolution",
            ErrorKind::Signature => "signature",
            ErrorKind::Claims => "claims",
        };
        f.write_str(name)
    }
}

/// Token validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Malformed token: {0}")]
    Malformed(#[from] TokenParseError),

    #[error("Issuer is not trusted: {0}")]
    IssuerNotTrusted(String),

    #[error("Identity provider unavailable: {0}")]
    KeySourceUnavailable(String),

    #[error("Cannot resolve verification keys: {0}")]
    KeyResolution(String),

    #[error("Cannot load local keystore: {0}")]
    Keystore(String),

    #[error("No verification key matches kid {kid:?}")]
    KeyNotFound { kid: Option<String> },

    #[error("Signature verification failed")]
    Signature,

    #[error("Invalid claims: {0}")]
    Claims(String),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ValidationError::Malformed(_) => ErrorKind::MalformedToken,
            ValidationError::IssuerNotTrusted(_) => ErrorKind::IssuerNotTrusted,
            ValidationError::KeySourceUnavailable(_) => ErrorKind::KeySourceUnavailable,
            ValidationError::KeyResolution(_)
            | ValidationError::Keystore(_)
            | ValidationError::KeyNotFound { .. } => ErrorKind::KeyResolution,
            ValidationError::Signature => ErrorKind::Signature,
            ValidationError::Claims(_) => ErrorKind::Claims,
        }
    }

    /// Client-safe description. Never includes the underlying cause.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::Malformed(_) => "Cannot verify token with non-JWT structure",
            ValidationError::IssuerNotTrusted(_) => {
                "Token issuer URL is not compliance with whitelist"
            }
            ValidationError::KeySourceUnavailable(_) => {
                "There is no response from Identity Provider with particular URL"
            }
            ValidationError::KeyResolution(_) => {
                "Key selector cannot parse resource which contains public key"
            }
            ValidationError::Keystore(_) => "Cannot obtain public certificate from keystore",
            ValidationError::KeyNotFound { .. } | ValidationError::Claims(_) => {
                "Cannot verify token using wrong algorithm"
            }
            ValidationError::Signature => "Cannot verify token with wrong signature",
        }
    }
}

/// The only failure the authentication entry point returns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Authentication failed: {reason}")]
pub struct AuthenticationFailure {
    pub reason: &'static str,
    pub kind: ErrorKind,
}

impl From<&ValidationError> for AuthenticationFailure {
    fn from(err: &ValidationError) -> Self {
        Self {
            reason: err.reason(),
            kind: err.kind(),
        }
    }
}
