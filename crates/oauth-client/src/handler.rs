//! SASL/OAUTHBEARER login callback.

use crate::config::LoginConfig;
use crate::error::LoginError;
use crate::retriever::{OAuthTokenRetriever, TokenRetriever};
use security_common::options::Options;
use security_common::secret::ExposeSecret;
use security_common::Token;
use std::sync::Arc;
use tracing::instrument;

/// The only SASL mechanism this handler serves.
pub const OAUTHBEARER_MECHANISM: &str = "OAUTHBEARER";

/// Produces the token a client presents at login.
///
/// A handler without a retriever is configured but cannot log in: it yields
/// no token.
pub struct LoginCallbackHandler {
    retriever: Option<Arc<dyn TokenRetriever>>,
}

impl std::fmt::Debug for LoginCallbackHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCallbackHandler")
            .field("endpoint", &self.retriever.as_ref().map(|r| r.endpoint()))
            .finish()
    }
}

impl LoginCallbackHandler {
    /// Configure the handler for `sasl_mechanism` from the login options.
    ///
    /// # Errors
    ///
    /// Returns `LoginError::UnsupportedMechanism` for any mechanism other
    /// than OAUTHBEARER, or a configuration error from the options.
    pub fn configure(sasl_mechanism: &str, options: &Options) -> Result<Self, LoginError> {
        if sasl_mechanism != OAUTHBEARER_MECHANISM {
            return Err(LoginError::UnsupportedMechanism(sasl_mechanism.to_string()));
        }

        let retriever = match LoginConfig::from_options(options)? {
            Some(config) => {
                Some(Arc::new(OAuthTokenRetriever::new(config)?) as Arc<dyn TokenRetriever>)
            }
            None => None,
        };
        Ok(Self { retriever })
    }

    /// A handler that obtains tokens from `retriever`.
    pub fn with_retriever(retriever: Arc<dyn TokenRetriever>) -> Self {
        Self {
            retriever: Some(retriever),
        }
    }

    pub fn is_configured_for_login(&self) -> bool {
        self.retriever.is_some()
    }

    /// Retrieve and parse a login token.
    ///
    /// # Errors
    ///
    /// Returns the retrieval error, or `LoginError::InvalidToken` if the
    /// access token is not a JWT carrying `exp`, `sub` and `iss`.
    #[instrument(skip_all)]
    pub async fn token(&self) -> Result<Option<Token>, LoginError> {
        let Some(retriever) = &self.retriever else {
            return Ok(None);
        };

        let access_token = retriever.retrieve_access_token().await?;
        let token = Token::parse(access_token.expose_secret(), "").map_err(|e| {
            tracing::error!(
                target: "client.login",
                endpoint = %retriever.endpoint(),
                error = %e,
                "Retrieved access token cannot be parsed"
            );
            LoginError::InvalidToken(e)
        })?;

        tracing::info!(
            target: "client.login",
            principal = %token.subject(),
            "Retrieved token"
        );
        Ok(Some(token))
    }
}
