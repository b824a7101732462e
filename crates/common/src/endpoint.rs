//! URL helpers for identity provider endpoints.
//!
//! Issuer URLs come from token claims and configuration, and discovery
//! documents advertise endpoints relative to hosts the broker may not be
//! able to reach. Everything that ends up in an outbound request passes
//! through [`normalize_url`].

use url::{ParseError, Url};

/// Parse and normalize an absolute URL.
///
/// Dot segments are resolved and repeated slashes in the path are collapsed,
/// so `http://idp//realms/./master` becomes `http://idp/realms/master`.
///
/// # Errors
///
/// Returns the parse error if `raw` is not an absolute URL.
pub fn normalize_url(raw: &str) -> Result<String, ParseError> {
    let mut url = Url::parse(raw.trim())?;

    if url.path().contains("//") {
        let mut collapsed = String::with_capacity(url.path().len());
        for ch in url.path().chars() {
            if ch == '/' && collapsed.ends_with('/') {
                continue;
            }
            collapsed.push(ch);
        }
        url.set_path(&collapsed);
    }

    Ok(url.to_string())
}

/// Append `path` to `base` and normalize the result.
///
/// Unlike RFC 3986 reference resolution, the base path is kept: an issuer of
/// `http://idp/realms/master` joined with `/protocol/certs` yields
/// `http://idp/realms/master/protocol/certs`.
///
/// # Errors
///
/// Returns the parse error if the concatenation is not an absolute URL.
pub fn join_url(base: &str, path: &str) -> Result<String, ParseError> {
    normalize_url(&format!("{base}{path}"))
}

/// Replace the host and port of `target` with those of `source`.
///
/// Used when a discovery document advertises an internal address that is
/// only reachable through the issuer's externally visible host.
///
/// # Errors
///
/// Returns the parse error if either URL cannot be parsed or `source` has no
/// host.
pub fn replace_host_and_port(target: &str, source: &str) -> Result<String, ParseError> {
    let source = Url::parse(source)?;
    let mut target = Url::parse(target)?;

    let host = source.host_str().ok_or(ParseError::EmptyHost)?;
    target.set_host(Some(host))?;
    target
        .set_port(source.port())
        .map_err(|()| ParseError::InvalidPort)?;

    Ok(target.to_string())
}
