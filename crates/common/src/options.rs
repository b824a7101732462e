//! Option-map parsing helpers.
//!
//! Broker plugins receive their configuration as a flat string map. These
//! helpers apply defaults and strict validation so that a bad value fails at
//! configure time instead of surfacing as odd behavior per request.
//!
//! An absent key and a key with an empty (or whitespace-only) value are
//! treated the same: the default applies.

use crate::error::ConfigError;
use crate::secret::SecretString;
use std::collections::HashMap;

/// Option map as handed over by the host.
pub type Options = HashMap<String, String>;

/// Non-empty, trimmed value of `key`, if any.
#[must_use]
pub fn get_raw<'a>(options: &'a Options, key: &str) -> Option<&'a str> {
    options
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// String option with a default.
#[must_use]
pub fn get_string(options: &Options, key: &str, default: &str) -> String {
    get_raw(options, key).unwrap_or(default).to_string()
}

/// Secret option; the value never leaves a [`SecretString`].
#[must_use]
pub fn get_secret(options: &Options, key: &str) -> Option<SecretString> {
    get_raw(options, key).map(SecretString::from)
}

/// Non-negative integer option with a default.
///
/// # Errors
///
/// Returns `ConfigError::InvalidOption` if the value is not a non-negative
/// integer.
pub fn get_u64(options: &Options, key: &str, default: u64) -> Result<u64, ConfigError> {
    match get_raw(options, key) {
        None => Ok(default),
        Some(value) => value.parse::<u64>().map_err(|e| ConfigError::InvalidOption {
            key: key.to_string(),
            reason: format!("'{value}' is not a non-negative integer: {e}"),
        }),
    }
}

/// Strictly positive integer option with a default.
///
/// # Errors
///
/// Returns `ConfigError::InvalidOption` if the value is not an integer
/// greater than zero.
pub fn get_positive_u64(options: &Options, key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = get_u64(options, key, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidOption {
            key: key.to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(value)
}

/// Boolean option with a default. Only `true` and `false` are accepted,
/// ignoring case.
///
/// # Errors
///
/// Returns `ConfigError::InvalidOption` for any other value.
pub fn get_bool(options: &Options, key: &str, default: bool) -> Result<bool, ConfigError> {
    match get_raw(options, key) {
        None => Ok(default),
        Some(value) if value.eq_ignore_ascii_case("true") => Ok(true),
        Some(value) if value.eq_ignore_ascii_case("false") => Ok(false),
        Some(value) => Err(ConfigError::InvalidOption {
            key: key.to_string(),
            reason: format!("'{value}' is not 'true' or 'false'"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::secret::ExposeSecret;

    fn options(pairs: &[(&str, &str)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_absent_and_empty_use_default() {
        let opts = options(&[("clockSkew", ""), ("blank", "   ")]);

        assert_eq!(get_u64(&opts, "clockSkew", 10).unwrap(), 10);
        assert_eq!(get_u64(&opts, "missing", 7).unwrap(), 7);
        assert_eq!(get_string(&opts, "blank", "fallback"), "fallback");
        assert!(get_raw(&opts, "blank").is_none());
    }

    #[test]
    fn test_integer_values_are_trimmed_and_parsed() {
        let opts = options(&[("jwksSizeLimit", " 1024 ")]);
        assert_eq!(get_u64(&opts, "jwksSizeLimit", 51200).unwrap(), 1024);
    }

    #[test]
    fn test_invalid_integer_is_rejected() {
        let opts = options(&[("clockSkew", "-1"), ("timeout", "ten")]);

        let err = get_u64(&opts, "clockSkew", 10).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { ref key, .. } if key == "clockSkew"));
        assert!(get_u64(&opts, "timeout", 1000).is_err());
    }

    #[test]
    fn test_positive_rejects_zero() {
        let opts = options(&[("jwksReadTimeout", "0")]);
        assert!(get_positive_u64(&opts, "jwksReadTimeout", 1000).is_err());
        assert_eq!(get_positive_u64(&opts, "absent", 1000).unwrap(), 1000);
    }

    #[test]
    fn test_bool_is_case_insensitive_and_strict() {
        let opts = options(&[("a", "TRUE"), ("b", "False"), ("c", "yes")]);

        assert!(get_bool(&opts, "a", false).unwrap());
        assert!(!get_bool(&opts, "b", true).unwrap());
        assert!(get_bool(&opts, "c", false).is_err());
        assert!(get_bool(&opts, "d", true).unwrap());
    }

    #[test]
    fn test_secret_option() {
        let opts = options(&[("keystorePassword", "changeit")]);

        let secret = get_secret(&opts, "keystorePassword").unwrap();
        assert_eq!(secret.expose_secret(), "changeit");
        assert!(!format!("{secret:?}").contains("changeit"));
        assert!(get_secret(&opts, "clientSecret").is_none());
    }
}
