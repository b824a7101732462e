//! Broker principals and their derivation from a connection's
//! authentication context.

use crate::audit::{
    AuditEvent, AuditSink, AuthenticationRecord, ANONYMOUS_AUTHENTICATION_TYPE,
    OAUTH_AUTHENTICATION_TYPE, SSL_AUTHENTICATION_TYPE,
};
use security_common::Token;
use std::fmt;
use std::sync::Arc;

/// Principal type of every authenticated or anonymous identity.
pub const USER_PRINCIPAL_TYPE: &str = "User";
/// Principal type that token-backed identities are matched as in ACLs.
pub const ROLE_PRINCIPAL_TYPE: &str = "Role";
/// Name of the unauthenticated principal.
pub const ANONYMOUS_PRINCIPAL_NAME: &str = "ANONYMOUS";

/// An authenticated identity, optionally backed by a validated token.
#[derive(Debug, Clone)]
pub struct Principal {
    principal_type: String,
    name: String,
    token: Option<Token>,
}

impl Principal {
    pub fn new(principal_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            principal_type: principal_type.into(),
            name: name.into(),
            token: None,
        }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(USER_PRINCIPAL_TYPE, name)
    }

    pub fn anonymous() -> Self {
        Self::user(ANONYMOUS_PRINCIPAL_NAME)
    }

    /// A principal authenticated with `token`.
    pub fn oauth(name: impl Into<String>, token: Token) -> Self {
        Self {
            token: Some(token),
            ..Self::user(name)
        }
    }

    pub fn principal_type(&self) -> &str {
        &self.principal_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.eq_ignore_ascii_case(ANONYMOUS_PRINCIPAL_NAME)
    }

    /// `Type:name`, without roles. This is the form super users are
    /// configured in.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.principal_type, self.name)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.principal_type, self.name)?;
        if let Some(token) = &self.token {
            let roles: Vec<&str> = token.roles().iter().map(String::as_str).collect();
            write!(f, ",Roles:{}", roles.join(","))?;
        }
        Ok(())
    }
}

/// How a connection authenticated.
#[derive(Debug, Clone)]
pub enum AuthenticationContext {
    /// No transport security and no SASL.
    Plaintext,
    /// TLS. `peer` is the verified client certificate subject, if any.
    Tls { peer: Option<String> },
    /// SASL/OAUTHBEARER with a validated token.
    SaslOAuth {
        authorization_id: String,
        token: Token,
    },
    /// Any other SASL mechanism.
    Sasl {
        mechanism: String,
        authorization_id: String,
    },
}

/// Derives principals and records each successful authentication.
pub struct PrincipalBuilder {
    audit: Arc<dyn AuditSink>,
}

impl PrincipalBuilder {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self { audit }
    }

    pub fn build(&self, context: AuthenticationContext, client_address: &str) -> Principal {
        let (principal, authentication_type) = match context {
            AuthenticationContext::Plaintext => {
                (Principal::anonymous(), ANONYMOUS_AUTHENTICATION_TYPE.to_string())
            }
            AuthenticationContext::Tls { peer: Some(peer) } => {
                (Principal::user(peer), SSL_AUTHENTICATION_TYPE.to_string())
            }
            AuthenticationContext::Tls { peer: None } => {
                tracing::debug!(
                    target: "server.authz",
                    "TLS peer is not verified, using anonymous principal"
                );
                (Principal::anonymous(), ANONYMOUS_AUTHENTICATION_TYPE.to_string())
            }
            AuthenticationContext::SaslOAuth {
                authorization_id,
                token,
            } => (
                Principal::oauth(authorization_id, token),
                OAUTH_AUTHENTICATION_TYPE.to_string(),
            ),
            AuthenticationContext::Sasl {
                mechanism,
                authorization_id,
            } => (Principal::user(authorization_id), mechanism),
        };

        tracing::debug!(
            target: "server.authz",
            principal = %principal,
            authentication_type = %authentication_type,
            "Principal built"
        );
        self.audit
            .record(AuditEvent::Authentication(AuthenticationRecord::successful(
                principal.name(),
                &authentication_type,
                Some(client_address.to_string()),
            )));
        principal
    }
}
