//! Broker-side configuration.
//!
//! Each component is configured once from the host's option map. The
//! resulting values are immutable; engines are built from them, so nothing
//! can be called before configuration has succeeded. Sensitive values are
//! held as [`SecretString`] and never appear in Debug output.

use crate::issuer::{parse_whitelist, IssuerWhitelistEntry};
use security_common::options::{
    get_bool, get_positive_u64, get_raw, get_secret, get_string, get_u64, Options,
};
use security_common::secret::SecretString;
use security_common::ConfigError;
use std::collections::{BTreeSet, HashMap};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const CLOCK_SKEW: &str = "clockSkew";
pub const JWKS_CONNECTION_TIMEOUT: &str = "jwksConnectionTimeout";
pub const JWKS_READ_TIMEOUT: &str = "jwksReadTimeout";
pub const JWKS_SIZE_LIMIT: &str = "jwksSizeLimit";
pub const IDP_WHITELIST: &str = "idpWhitelist";
pub const TOKEN_ROLES_PATH: &str = "tokenRolesPath";
pub const JWK_SOURCE_TYPE: &str = "jwkSourceType";
pub const KEYSTORE_PATH: &str = "keystorePath";
pub const KEYSTORE_PASSWORD: &str = "keystorePassword";
pub const KEYSTORE_TYPE: &str = "keystoreType";
pub const ALLOW_EVERYONE_IF_NO_ACL_FOUND: &str = "allow.everyone.if.no.acl.found";
pub const SUPER_USERS: &str = "super.users";
pub const AUDIT_LOGS_ENABLED: &str = "auditLogsEnabled";

/// Environment variable enabling the JWKS host rewrite.
pub const REPLACE_INTERNAL_HOST_ENABLED: &str = "REPLACE_INTERNAL_HOST_ENABLED";

/// Default clock skew tolerance in seconds.
pub const DEFAULT_CLOCK_SKEW_SECONDS: u64 = 10;

/// Default JWKS connect and read timeouts in milliseconds.
pub const DEFAULT_JWKS_TIMEOUT_MS: u64 = 1000;

/// Default maximum discovery/JWKS response size in bytes.
pub const DEFAULT_JWKS_SIZE_LIMIT: u64 = 51_200;

pub const DEFAULT_TOKEN_ROLES_PATH: &str = "resource_access.account.roles";
pub const DEFAULT_KEYSTORE_PATH: &str = "/opt/kafka/config/public_certs.jks";
pub const DEFAULT_KEYSTORE_TYPE: &str = "JKS";

/// Format of the local keystore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeystoreType {
    /// A JSON Web Key Set document.
    Jwks,
    /// A directory of `<alias>.pem` public keys.
    Pem,
    /// A password-protected PKCS#12 store of trusted certificates.
    Pkcs12,
    /// A Java keystore. Read as PKCS#12, which the JVM also accepts under
    /// this type; a file in the legacy binary JKS format is rejected.
    Jks,
    /// Any other format. Rejected when a token is validated, not at
    /// configure time.
    Unsupported(String),
}

impl KeystoreType {
    fn parse(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "JWKS" | "JSON" => KeystoreType::Jwks,
            "PEM" => KeystoreType::Pem,
            "PKCS12" | "P12" => KeystoreType::Pkcs12,
            "JKS" => KeystoreType::Jks,
            _ => KeystoreType::Unsupported(value.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeystoreSettings {
    pub path: PathBuf,
    pub password: Option<SecretString>,
    pub store_type: KeystoreType,
}

/// Where verification keys come from.
#[derive(Debug, Clone)]
pub enum KeySourceSettings {
    /// Discover `jwks_uri` per issuer and fetch keys remotely.
    Jwks,
    /// One local keystore shared by every issuer.
    Keystore(KeystoreSettings),
}

/// HTTP limits applied to every discovery and JWKS request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpLimits {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub size_limit: usize,
}

/// Token validator configuration.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Tolerance for `exp`/`nbf` checks, in seconds.
    pub clock_skew_seconds: u64,
    pub http: HttpLimits,
    pub whitelist: Vec<IssuerWhitelistEntry>,
    pub roles_path: String,
    pub key_source: KeySourceSettings,
    /// Rewrite the discovered JWKS host/port to the issuer's.
    pub replace_internal_host: bool,
}

impl ValidatorConfig {
    /// Load configuration from the option map and the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for any invalid option.
    pub fn from_options(options: &Options) -> Result<Self, ConfigError> {
        Self::from_options_and_env(options, &env::vars().collect())
    }

    /// Load configuration from the option map and an explicit environment
    /// (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for any invalid option.
    pub fn from_options_and_env(
        options: &Options,
        vars: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let clock_skew_seconds = get_u64(options, CLOCK_SKEW, DEFAULT_CLOCK_SKEW_SECONDS)?;
        let connect_timeout =
            get_positive_u64(options, JWKS_CONNECTION_TIMEOUT, DEFAULT_JWKS_TIMEOUT_MS)?;
        let read_timeout = get_positive_u64(options, JWKS_READ_TIMEOUT, DEFAULT_JWKS_TIMEOUT_MS)?;
        let size_limit = get_positive_u64(options, JWKS_SIZE_LIMIT, DEFAULT_JWKS_SIZE_LIMIT)?;
        let size_limit = usize::try_from(size_limit).map_err(|_| ConfigError::InvalidOption {
            key: JWKS_SIZE_LIMIT.to_string(),
            reason: "value too large for this platform".to_string(),
        })?;

        let whitelist = parse_whitelist(get_raw(options, IDP_WHITELIST))?;
        let roles_path = get_string(options, TOKEN_ROLES_PATH, DEFAULT_TOKEN_ROLES_PATH);

        let key_source = match get_raw(options, JWK_SOURCE_TYPE) {
            None => KeySourceSettings::Jwks,
            Some(value) if value.eq_ignore_ascii_case("jwks") => KeySourceSettings::Jwks,
            Some(value) if value.eq_ignore_ascii_case("keystore") => {
                KeySourceSettings::Keystore(KeystoreSettings {
                    path: PathBuf::from(get_string(options, KEYSTORE_PATH, DEFAULT_KEYSTORE_PATH)),
                    password: get_secret(options, KEYSTORE_PASSWORD),
                    store_type: KeystoreType::parse(&get_string(
                        options,
                        KEYSTORE_TYPE,
                        DEFAULT_KEYSTORE_TYPE,
                    )),
                })
            }
            Some(value) => {
                return Err(ConfigError::InvalidOption {
                    key: JWK_SOURCE_TYPE.to_string(),
                    reason: format!("'{value}' is not 'jwks' or 'keystore'"),
                })
            }
        };

        let replace_internal_host = vars
            .get(REPLACE_INTERNAL_HOST_ENABLED)
            .is_some_and(|value| value == "true");

        let config = Self {
            clock_skew_seconds,
            http: HttpLimits {
                connect_timeout: Duration::from_millis(connect_timeout),
                read_timeout: Duration::from_millis(read_timeout),
                size_limit,
            },
            whitelist,
            roles_path,
            key_source,
            replace_internal_host,
        };

        tracing::debug!(target: "server.validator", config = ?config, "Validator configured");
        Ok(config)
    }
}

/// Authorization engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizerConfig {
    pub allow_everyone_if_no_acl_found: bool,
    /// Superusers as `Type:name` strings, compared exactly.
    pub super_users: BTreeSet<String>,
}

impl AuthorizerConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if the default-policy flag is not a boolean or a
    /// superuser entry is not of the form `Type:name`.
    pub fn from_options(options: &Options) -> Result<Self, ConfigError> {
        let allow_everyone_if_no_acl_found =
            get_bool(options, ALLOW_EVERYONE_IF_NO_ACL_FOUND, false)?;
        let super_users = parse_super_users(get_raw(options, SUPER_USERS).unwrap_or_default())?;

        Ok(Self {
            allow_everyone_if_no_acl_found,
            super_users,
        })
    }
}

/// Split a `;`-separated superuser list, trimming entries and skipping
/// empty ones.
fn parse_super_users(raw: &str) -> Result<BTreeSet<String>, ConfigError> {
    raw.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((kind, name)) if !kind.is_empty() && !name.is_empty() => Ok(entry.to_string()),
            _ => Err(ConfigError::InvalidPrincipal(entry.to_string())),
        })
        .collect()
}

/// Audit configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditConfig {
    pub enabled: bool,
}

impl AuditConfig {
    /// # Errors
    ///
    /// Returns `ConfigError` if `auditLogsEnabled` is not a boolean.
    pub fn from_options(options: &Options) -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: get_bool(options, AUDIT_LOGS_ENABLED, false)?,
        })
    }
}
