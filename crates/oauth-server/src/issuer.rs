//! Trusted issuer resolution.
//!
//! Tokens name their issuer in the `iss` claim. Only issuers listed in the
//! configured whitelist are trusted; a match is mapped to the address the
//! broker should use to reach the identity provider, which may differ from
//! the externally visible one.

use crate::errors::ValidationError;
use serde::Deserialize;
use security_common::ConfigError;

/// One whitelist entry: an identity provider reachable at `internal` and
/// known to clients as `external`. At least one address is present.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssuerWhitelistEntry {
    #[serde(default)]
    pub internal: Option<String>,
    #[serde(default)]
    pub external: Option<String>,
}

impl IssuerWhitelistEntry {
    fn matches(&self, issuer: &str) -> bool {
        self.internal.as_deref() == Some(issuer) || self.external.as_deref() == Some(issuer)
    }

    fn base_url(&self) -> Option<&str> {
        self.internal.as_deref().or(self.external.as_deref())
    }
}

/// Parse the `idpWhitelist` option.
///
/// The value is a JSON array of `{internal, external}` objects. JAAS option
/// strings are commonly written with single quotes, so if strict parsing
/// fails the value is retried with single-quoted strings rewritten as
/// double-quoted ones. An absent or empty value yields an empty whitelist.
///
/// # Errors
///
/// Returns `ConfigError::InvalidWhitelist` if the value is not such an array
/// or an entry has neither address.
pub fn parse_whitelist(raw: Option<&str>) -> Result<Vec<IssuerWhitelistEntry>, ConfigError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Vec::new());
    };

    let entries: Vec<IssuerWhitelistEntry> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(strict_err) => serde_json::from_str(&requote_single_quoted(raw))
            .map_err(|_| ConfigError::InvalidWhitelist(strict_err.to_string()))?,
    };

    if let Some(position) = entries.iter().position(|e| e.base_url().is_none()) {
        return Err(ConfigError::InvalidWhitelist(format!(
            "entry {position} has neither 'internal' nor 'external' address"
        )));
    }

    Ok(entries)
}

/// Rewrite `'...'` string literals as `"..."`.
///
/// Only quotes that open or close a string are replaced. Apostrophes inside
/// double-quoted strings are kept, and `"` inside a single-quoted string is
/// escaped. An apostrophe inside a single-quoted string ends it, so a value
/// like `'o'brien'` stays invalid JSON and is rejected.
fn requote_single_quoted(raw: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Outside,
        Double,
        Single,
    }

    let mut out = String::with_capacity(raw.len());
    let mut state = State::Outside;
    let mut escaped = false;

    for c in raw.chars() {
        if escaped {
            out.push(c);
            escaped = false;
            continue;
        }
        match (state, c) {
            (State::Double | State::Single, '\\') => {
                out.push(c);
                escaped = true;
            }
            (State::Outside, '"') => {
                out.push(c);
                state = State::Double;
            }
            (State::Double, '"') => {
                out.push(c);
                state = State::Outside;
            }
            (State::Outside, '\'') => {
                out.push('"');
                state = State::Single;
            }
            (State::Single, '\'') => {
                out.push('"');
                state = State::Outside;
            }
            (State::Single, '"') => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// Strict allow-list resolver from token issuer to identity provider URL.
#[derive(Debug, Clone, Default)]
pub struct IssuerResolver {
    entries: Vec<IssuerWhitelistEntry>,
}

impl IssuerResolver {
    pub fn new(entries: Vec<IssuerWhitelistEntry>) -> Self {
        Self { entries }
    }

    /// Build a resolver straight from the whitelist option value.
    ///
    /// # Errors
    ///
    /// See [`parse_whitelist`].
    pub fn from_json(raw: Option<&str>) -> Result<Self, ConfigError> {
        parse_whitelist(raw).map(Self::new)
    }

    /// Resolve `issuer` to the base URL of a trusted identity provider.
    ///
    /// Either address of an entry may match, compared exactly. On a match
    /// the internal address is preferred.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::IssuerNotTrusted` if no entry matches,
    /// including when the whitelist is empty.
    pub fn resolve(&self, issuer: &str) -> Result<String, ValidationError> {
        let resolved = self
            .entries
            .iter()
            .find(|entry| entry.matches(issuer))
            .and_then(IssuerWhitelistEntry::base_url);

        match resolved {
            Some(base_url) => {
                tracing::trace!(
                    target: "server.issuer",
                    issuer = %issuer,
                    resolved = %base_url,
                    "Issuer resolved from whitelist"
                );
                Ok(base_url.to_string())
            }
            None => {
                tracing::debug!(
                    target: "server.issuer",
                    issuer = %issuer,
                    whitelist_size = self.entries.len(),
                    "Issuer not found in whitelist"
                );
                Err(ValidationError::IssuerNotTrusted(issuer.to_string()))
            }
        }
    }
}
