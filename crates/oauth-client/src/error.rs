//! Client login error types.

use security_common::TokenParseError;
use thiserror::Error;

/// Errors that can occur while obtaining a login token.
#[derive(Error, Debug)]
pub enum LoginError {
    /// Login options are unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The SASL mechanism is not OAUTHBEARER.
    #[error("Unexpected SASL mechanism: {0}")]
    UnsupportedMechanism(String),

    /// Transport failure talking to the token endpoint.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// The token endpoint rejected the client credentials (400, 401).
    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// The token endpoint answered with something other than a token
    /// response.
    #[error("Token endpoint cannot be obtained: invalid response from: {0}")]
    InvalidResponse(String),

    /// The token response had no `access_token`.
    #[error("Access token not retrieved from: {0}")]
    MissingAccessToken(String),

    /// The retrieved access token is not a usable JWT.
    #[error("Retrieved access token is invalid: {0}")]
    InvalidToken(#[from] TokenParseError),
}
