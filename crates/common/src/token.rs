//! Parsed bearer token model.
//!
//! A [`Token`] is the immutable result of decoding a compact JWS
//! (`header.payload.signature`) without verifying it. Verification is the
//! broker's job; this module only establishes structure and the claims the
//! rest of the system reads.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE any decoding
//! - The raw token text and `sub` are redacted in Debug output

use crate::error::TokenParseError;
use crate::roles::extract_roles;
use crate::secret::REDACTED;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode_header, Algorithm};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Maximum accepted raw token size in bytes (16KB).
///
/// Identity providers that embed many roles produce tokens well above 8KB,
/// so the limit is looser than for service tokens.
pub const MAX_TOKEN_SIZE_BYTES: usize = 16 * 1024;

/// Header fields the validator needs to select a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared signing algorithm (`alg`).
    pub algorithm: Algorithm,

    /// Key ID (`kid`), if the issuer sets one.
    pub key_id: Option<String>,
}

/// A parsed, not-yet-verified bearer token.
#[derive(Clone)]
pub struct Token {
    raw: String,
    header: TokenHeader,
    claims: Map<String, Value>,
    scopes: BTreeSet<String>,
    roles: BTreeSet<String>,
    subject: String,
    issuer: String,
    issued_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
}

impl Token {
    /// Parse a compact JWS into a token, deriving roles from `roles_path`.
    ///
    /// `roles_path` is a dot-separated path into the claims; an empty path
    /// yields an empty role set.
    ///
    /// # Errors
    ///
    /// - `TooLarge` if `raw` exceeds [`MAX_TOKEN_SIZE_BYTES`]
    /// - `MalformedStructure` if `raw` is not three base64url segments with a
    ///   valid header and JSON payload
    /// - `MissingPayload` if the payload is not a JSON object
    /// - `MissingClaim` if `sub`, `iss` or `exp` is absent
    pub fn parse(raw: &str, roles_path: &str) -> Result<Self, TokenParseError> {
        if raw.len() > MAX_TOKEN_SIZE_BYTES {
            tracing::debug!(
                target: "common.token",
                token_size = raw.len(),
                max_size = MAX_TOKEN_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(TokenParseError::TooLarge);
        }

        let segments: Vec<&str> = raw.split('.').collect();
        let [_, payload_part, _] = segments.as_slice() else {
            tracing::debug!(
                target: "common.token",
                segments = segments.len(),
                "Token rejected: invalid compact JWS format"
            );
            return Err(TokenParseError::MalformedStructure);
        };

        let header = decode_header(raw).map_err(|e| {
            tracing::debug!(target: "common.token", error = %e, "Failed to decode token header");
            TokenParseError::MalformedStructure
        })?;

        let payload_bytes = URL_SAFE_NO_PAD.decode(payload_part).map_err(|e| {
            tracing::debug!(
                target: "common.token",
                error = %e,
                "Failed to decode token payload base64"
            );
            TokenParseError::MalformedStructure
        })?;
        let payload: Value = serde_json::from_slice(&payload_bytes).map_err(|e| {
            tracing::debug!(
                target: "common.token",
                error = %e,
                "Failed to parse token payload JSON"
            );
            TokenParseError::MalformedStructure
        })?;
        let Value::Object(claims) = payload else {
            return Err(TokenParseError::MissingPayload);
        };

        let expires_at = claims
            .get("exp")
            .and_then(epoch_seconds)
            .ok_or(TokenParseError::MissingClaim("exp"))?;
        let issued_at = claims.get("iat").and_then(epoch_seconds);
        let subject = string_claim(&claims, "sub").ok_or(TokenParseError::MissingClaim("sub"))?;
        let issuer = string_claim(&claims, "iss").ok_or(TokenParseError::MissingClaim("iss"))?;
        let scopes = scope_claim(&claims);
        let roles = extract_roles(&claims, roles_path);

        Ok(Self {
            raw: raw.to_string(),
            header: TokenHeader {
                algorithm: header.alg,
                key_id: header.kid,
            },
            claims,
            scopes,
            roles,
            subject,
            issuer,
            issued_at,
            expires_at,
        })
    }

    /// The original compact token text.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    /// Declared signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.header.algorithm
    }

    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.header.key_id.as_deref()
    }

    /// The full decoded payload.
    #[must_use]
    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    /// Scopes from the `scope` claim.
    #[must_use]
    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    /// Roles found at the configured claim path.
    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    /// Principal identity (`sub`).
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer URL (`iss`).
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Custom Debug implementation that redacts the raw token and `sub`.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("raw", &REDACTED)
            .field("header", &self.header)
            .field("subject", &REDACTED)
            .field("issuer", &self.issuer)
            .field("scopes", &self.scopes)
            .field("roles", &self.roles)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

fn string_claim(claims: &Map<String, Value>, name: &str) -> Option<String> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}

/// Epoch seconds may be serialized as integers or floats.
#[allow(clippy::cast_possible_truncation)]
fn epoch_seconds(value: &Value) -> Option<DateTime<Utc>> {
    let secs = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.trunc() as i64))?;
    DateTime::from_timestamp(secs, 0)
}

/// `scope` is either an array of strings or a single string taken whole.
fn scope_claim(claims: &Map<String, Value>) -> BTreeSet<String> {
    match claims.get("scope") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect(),
        Some(Value::String(scope)) => BTreeSet::from([scope.clone()]),
        _ => BTreeSet::new(),
    }
}

// =============================================================================
// Tests
// =============================================================================
