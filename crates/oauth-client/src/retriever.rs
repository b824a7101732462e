//! Access token retrieval with the OAuth 2.0 client credentials grant.
//!
//! # Security
//!
//! - The client secret is sent only in the `Authorization: Basic` header
//! - The access token is returned as a `SecretString` and never logged
//! - Error bodies from the token endpoint are logged at trace level only

use crate::config::{LoginConfig, DEFAULT_CONNECT_TIMEOUT};
use crate::error::LoginError;
use async_trait::async_trait;
use security_common::secret::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

/// Source of access tokens for client logins.
#[async_trait]
pub trait TokenRetriever: Send + Sync {
    /// Obtain a fresh access token.
    async fn retrieve_access_token(&self) -> Result<SecretString, LoginError>;

    /// The endpoint tokens are obtained from, for diagnostics.
    fn endpoint(&self) -> &str;
}

/// Token endpoint response. Only the access token is used.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Retrieves tokens from an OAuth token endpoint.
pub struct OAuthTokenRetriever {
    config: LoginConfig,
    http: reqwest::Client,
}

impl OAuthTokenRetriever {
    /// # Errors
    ///
    /// Returns `LoginError::Configuration` if the HTTP client cannot be built.
    pub fn new(config: LoginConfig) -> Result<Self, LoginError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| LoginError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { config, http })
    }
}

#[async_trait]
impl TokenRetriever for OAuthTokenRetriever {
    #[instrument(skip_all)]
    async fn retrieve_access_token(&self) -> Result<SecretString, LoginError> {
        let endpoint = &self.config.token_endpoint;

        tracing::debug!(
            target: "client.login",
            client_id = %self.config.client_id,
            url = %endpoint,
            "Requesting token"
        );

        let response = self
            .http
            .post(endpoint)
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(target: "client.login", error = %e, "HTTP request failed");
                LoginError::Http(e.to_string())
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNAUTHORIZED
        {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(target: "client.login", status = %status, "Client credentials rejected");
            tracing::trace!(target: "client.login", body = %body, "Rejection response body");
            return Err(LoginError::AuthenticationRejected(format!("Status {status}")));
        }
        if !status.is_success() {
            tracing::warn!(
                target: "client.login",
                status = %status,
                "Unexpected response from token endpoint"
            );
            return Err(LoginError::Http(format!("Unexpected status: {status}")));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            tracing::warn!(target: "client.login", error = %e, "Failed to parse token response");
            LoginError::InvalidResponse(endpoint.clone())
        })?;

        token_response
            .access_token
            .filter(|token| !token.is_empty())
            .map(SecretString::from)
            .ok_or_else(|| LoginError::MissingAccessToken(endpoint.clone()))
    }

    fn endpoint(&self) -> &str {
        &self.config.token_endpoint
    }
}
