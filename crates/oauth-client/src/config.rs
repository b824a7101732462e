//! Login configuration from JAAS-style options.

use crate::error::LoginError;
use security_common::endpoint::normalize_url;
use security_common::options::{get_raw, get_secret, Options};
use security_common::secret::{SecretString, REDACTED};
use std::time::Duration;

pub const TOKEN_ENDPOINT: &str = "tokenEndpoint";
pub const CLIENT_ID: &str = "clientId";
pub const CLIENT_SECRET: &str = "clientSecret";

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client credentials and the endpoint to exchange them at.
#[derive(Clone)]
pub struct LoginConfig {
    /// Normalized token endpoint URL.
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub http_timeout: Duration,
}

impl std::fmt::Debug for LoginConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginConfig")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &REDACTED)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl LoginConfig {
    #[must_use]
    pub fn new(token_endpoint: String, client_id: String, client_secret: SecretString) -> Self {
        Self {
            token_endpoint,
            client_id,
            client_secret,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Read the login options.
    ///
    /// Returns `Ok(None)` when any of the three options is absent: such a
    /// login cannot establish client connections, which is not an error.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::Configuration` if the token endpoint is not a
    /// valid URL.
    pub fn from_options(options: &Options) -> Result<Option<Self>, LoginError> {
        let token_endpoint = get_raw(options, TOKEN_ENDPOINT)
            .map(|raw| {
                normalize_url(raw).map_err(|e| {
                    LoginError::Configuration(format!("Invalid token endpoint: {raw}: {e}"))
                })
            })
            .transpose()?;
        let client_id = get_raw(options, CLIENT_ID);
        let client_secret = get_secret(options, CLIENT_SECRET);

        match (token_endpoint, client_id, client_secret) {
            (Some(token_endpoint), Some(client_id), Some(client_secret)) => Ok(Some(Self::new(
                token_endpoint,
                client_id.to_string(),
                client_secret,
            ))),
            _ => {
                tracing::debug!(
                    target: "client.login",
                    "This login cannot be used to establish client connections"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use security_common::secret::ExposeSecret;

    fn options(pairs: &[(&str, &str)]) -> Options {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_complete_options() {
        let config = LoginConfig::from_options(&options(&[
            (TOKEN_ENDPOINT, "http://idp:8080/realms/kafka//protocol/openid-connect/token"),
            (CLIENT_ID, "kafka-producer"),
            (CLIENT_SECRET, "s3cr3t"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(
            config.token_endpoint,
            "http://idp:8080/realms/kafka/protocol/openid-connect/token"
        );
        assert_eq!(config.client_id, "kafka-producer");
        assert_eq!(config.client_secret.expose_secret(), "s3cr3t");
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
    }

    #[test]
    fn test_missing_option_means_not_configured() {
        let missing_secret = options(&[(TOKEN_ENDPOINT, "http://idp/token"), (CLIENT_ID, "c")]);
        assert!(LoginConfig::from_options(&missing_secret).unwrap().is_none());

        let empty_endpoint =
            options(&[(TOKEN_ENDPOINT, ""), (CLIENT_ID, "c"), (CLIENT_SECRET, "s")]);
        assert!(LoginConfig::from_options(&empty_endpoint).unwrap().is_none());
    }

    #[test]
    fn test_invalid_endpoint_is_an_error() {
        let result = LoginConfig::from_options(&options(&[
            (TOKEN_ENDPOINT, "not a url"),
            (CLIENT_ID, "c"),
            (CLIENT_SECRET, "s"),
        ]));

        assert!(matches!(result, Err(LoginError::Configuration(_))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = LoginConfig::new(
            "http://idp/token".to_string(),
            "client".to_string(),
            SecretString::from("super-secret"),
        );

        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }
}
