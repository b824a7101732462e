//! Bearer token validation.
//!
//! Validation of a parsed [`Token`] runs these steps, each failing with its
//! own [`ValidationError`]:
//!
//! 1. Resolve the issuer against the whitelist
//! 2. Reject symmetric algorithms
//! 3. Get (or create) the issuer's key source
//! 4. Select candidate keys by algorithm and key id
//! 5. Verify the signature, trying candidates until one verifies
//! 6. Verify `exp`/`nbf` within the configured clock skew
//!
//! A validated token is returned unchanged. No step is retried.
//!
//! # Security
//!
//! - Symmetric (HS*) algorithms are rejected: keys come from public sources
//! - The algorithm is pinned to the header's before verification and must
//!   match the key family
//! - Failures reaching the client carry only a generic reason

use crate::audit::{AuditEvent, AuditSink, AuthenticationRecord, OAUTH_AUTHENTICATION_TYPE};
use crate::config::ValidatorConfig;
use crate::errors::{AuthenticationFailure, ValidationError};
use crate::issuer::IssuerResolver;
use crate::keys::KeySourceCache;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use security_common::{Token, TokenParseError};
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;

/// Validates bearer tokens for one configured broker listener.
pub struct TokenValidator {
    clock_skew_seconds: u64,
    roles_path: String,
    issuers: IssuerResolver,
    keys: KeySourceCache,
    audit: Arc<dyn AuditSink>,
}

impl TokenValidator {
    pub fn new(config: &ValidatorConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            clock_skew_seconds: config.clock_skew_seconds,
            roles_path: config.roles_path.clone(),
            issuers: IssuerResolver::new(config.whitelist.clone()),
            keys: KeySourceCache::new(config),
            audit,
        }
    }

    /// Parse a raw token using the configured roles path.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Malformed` if the token cannot be parsed.
    pub fn parse(&self, raw: &str) -> Result<Token, ValidationError> {
        Ok(Token::parse(raw, &self.roles_path)?)
    }

    /// Verify a parsed token's issuer, signature and lifetime.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    #[instrument(skip_all, fields(issuer = %token.issuer()))]
    pub async fn validate(&self, token: Token) -> Result<Token, ValidationError> {
        let issuer_url = self.issuers.resolve(token.issuer())?;

        let algorithm = token.algorithm();
        if matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ValidationError::Claims(format!(
                "symmetric algorithm {algorithm:?} is not accepted"
            )));
        }

        let source = self.keys.get_or_create(&issuer_url).await?;
        let candidates = source.select(algorithm, token.key_id()).await?;
        if candidates.is_empty() {
            return Err(ValidationError::KeyNotFound {
                kid: token.key_id().map(ToString::to_string),
            });
        }

        let mut validation = Validation::new(algorithm);
        validation.leeway = self.clock_skew_seconds;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        for key in &candidates {
            match decode::<Value>(token.raw(), key, &validation) {
                Ok(_) => return Ok(token),
                Err(e) if matches!(e.kind(), JwtErrorKind::InvalidSignature) => {
                    tracing::trace!(
                        target: "server.validator",
                        "Signature did not verify with candidate key, trying next"
                    );
                }
                Err(e) => return Err(map_jwt_error(&e)),
            }
        }

        Err(ValidationError::Signature)
    }

    /// Parse and validate a raw token presented by a client.
    ///
    /// Success is logged with the principal. Failure is logged with its
    /// cause, recorded as a failed authentication in the audit sink, and
    /// returned as a generic [`AuthenticationFailure`].
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailure` if the token is not valid.
    #[instrument(skip_all)]
    pub async fn authenticate(
        &self,
        raw: &str,
        client_address: Option<&str>,
    ) -> Result<Token, AuthenticationFailure> {
        let token = match self.parse(raw) {
            Ok(token) => token,
            Err(e) => return Err(self.fail(&e, None, client_address)),
        };
        let subject = token.subject().to_string();

        match self.validate(token).await {
            Ok(token) => {
                tracing::info!(
                    target: "server.validator",
                    principal = %token.subject(),
                    "Successfully validated token"
                );
                Ok(token)
            }
            Err(e) => Err(self.fail(&e, Some(subject), client_address)),
        }
    }

    fn fail(
        &self,
        err: &ValidationError,
        principal: Option<String>,
        client_address: Option<&str>,
    ) -> AuthenticationFailure {
        tracing::error!(
            target: "server.validator",
            kind = %err.kind(),
            reason = err.reason(),
            error = %err,
            "Token validation failed"
        );
        self.audit
            .record(AuditEvent::Authentication(AuthenticationRecord::failed(
                principal,
                OAUTH_AUTHENTICATION_TYPE,
                err.reason(),
                client_address.map(ToString::to_string),
            )));
        AuthenticationFailure::from(err)
    }
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> ValidationError {
    match err.kind() {
        JwtErrorKind::InvalidSignature | JwtErrorKind::Crypto(_) => ValidationError::Signature,
        JwtErrorKind::ExpiredSignature => ValidationError::Claims("token has expired".to_string()),
        JwtErrorKind::ImmatureSignature => {
            ValidationError::Claims("token is not valid yet".to_string())
        }
        JwtErrorKind::InvalidAlgorithm => {
            ValidationError::Claims("algorithm does not match verification key".to_string())
        }
        JwtErrorKind::InvalidEcdsaKey
        | JwtErrorKind::InvalidRsaKey(_)
        | JwtErrorKind::InvalidKeyFormat => {
            ValidationError::KeyResolution(format!("unusable verification key: {err}"))
        }
        JwtErrorKind::InvalidToken
        | JwtErrorKind::Base64(_)
        | JwtErrorKind::Json(_)
        | JwtErrorKind::Utf8(_) => ValidationError::Malformed(TokenParseError::MalformedStructure),
        _ => ValidationError::Claims(err.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::config::{HttpLimits, KeySourceSettings, KeystoreSettings, KeystoreType};
    use crate::errors::ErrorKind;
    use crate::issuer::parse_whitelist;
    use jsonwebtoken::Header;
    use oauth_test_utils::{TestKeypair, TestTokenBuilder};
    use std::path::Path;
    use std::time::Duration;

    const ISSUER: &str = "http://idp.example.com/realms/kafka";

    fn keystore_config(file: &Path, clock_skew_seconds: u64) -> ValidatorConfig {
        ValidatorConfig {
            clock_skew_seconds,
            http: HttpLimits {
                connect_timeout: Duration::from_millis(1000),
                read_timeout: Duration::from_millis(1000),
                size_limit: 51_200,
            },
            whitelist: parse_whitelist(Some(&format!(r#"[{{"external":"{ISSUER}"}}]"#))).unwrap(),
            roles_path: "resource_access.account.roles".to_string(),
            key_source: KeySourceSettings::Keystore(KeystoreSettings {
                path: file.to_path_buf(),
                password: None,
                store_type: KeystoreType::Jwks,
            }),
            replace_internal_host: false,
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        validator: TokenValidator,
        audit: Arc<MemoryAuditSink>,
        keypair: TestKeypair,
    }

    fn fixture(clock_skew_seconds: u64) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("keys.json");
        let keypair = TestKeypair::new(7, "abc");
        std::fs::write(&file, keypair.jwks_json().to_string()).unwrap();

        let audit = Arc::new(MemoryAuditSink::default());
        let validator =
            TokenValidator::new(&keystore_config(&file, clock_skew_seconds), audit.clone());
        Fixture {
            _dir: dir,
            validator,
            audit,
            keypair,
        }
    }

    fn claims() -> TestTokenBuilder {
        TestTokenBuilder::new().issued_by(ISSUER).for_user("alice")
    }

    // =========================================================================
    // validate
    // =========================================================================

    #[tokio::test]
    async fn test_valid_token_is_returned_unchanged() {
        let f = fixture(10);
        let raw = f.keypair.sign_token(&claims().with_roles(&["producer"]).build());

        let token = f.validator.validate(f.validator.parse(&raw).unwrap()).await.unwrap();

        assert_eq!(token.raw(), raw);
        assert!(token.roles().contains("producer"));
    }

    #[tokio::test]
    async fn test_uppercase_kid_matches_lowercase_key() {
        let f = fixture(10);
        let raw = f.keypair.with_kid("ABC").sign_token(&claims().build());

        assert!(f.validator.validate(f.validator.parse(&raw).unwrap()).await.is_ok());
    }

    #[tokio::test]
    async fn test_expiry_respects_clock_skew() {
        let strict = fixture(0);
        let raw = strict.keypair.sign_token(&claims().expires_in(-1).build());
        let err = strict
            .validator
            .validate(strict.validator.parse(&raw).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Claims);

        let tolerant = fixture(2);
        let raw = tolerant.keypair.sign_token(&claims().expires_in(-1).build());
        assert!(tolerant
            .validator
            .validate(tolerant.validator.parse(&raw).unwrap())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_untrusted_issuer() {
        let f = fixture(10);
        let raw = f
            .keypair
            .sign_token(&claims().issued_by("http://evil.example.com").build());

        let err = f.validator.validate(f.validator.parse(&raw).unwrap()).await.unwrap_err();
        assert!(matches!(err, ValidationError::IssuerNotTrusted(_)));
    }

    #[tokio::test]
    async fn test_symmetric_token_from_untrusted_issuer_is_not_trusted() {
        let f = fixture(10);
        let raw = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims().issued_by("http://evil.example.com").build(),
            &jsonwebtoken::EncodingKey::from_secret(b"shared-secret"),
        )
        .unwrap();

        let err = f.validator.validate(f.validator.parse(&raw).unwrap()).await.unwrap_err();
        assert!(matches!(err, ValidationError::IssuerNotTrusted(_)));
    }

    #[tokio::test]
    async fn test_symmetric_token_from_trusted_issuer_is_rejected() {
        let f = fixture(10);
        let raw = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims().build(),
            &jsonwebtoken::EncodingKey::from_secret(b"shared-secret"),
        )
        .unwrap();

        let err = f.validator.validate(f.validator.parse(&raw).unwrap()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Claims);
    }

    #[tokio::test]
    async fn test_unknown_kid_is_key_not_found() {
        let f = fixture(10);
        let raw = f.keypair.with_kid("other").sign_token(&claims().build());

        let err = f.validator.validate(f.validator.parse(&raw).unwrap()).await.unwrap_err();
        assert!(matches!(
            err,
            ValidationError::KeyNotFound { kid: Some(ref kid) } if kid == "other"
        ));
    }

    #[tokio::test]
    async fn test_wrong_key_is_signature_error() {
        let f = fixture(10);
        let impostor = TestKeypair::new(99, "abc");
        let raw = impostor.sign_token(&claims().build());

        let err = f.validator.validate(f.validator.parse(&raw).unwrap()).await.unwrap_err();
        assert!(matches!(err, ValidationError::Signature));
    }

    #[tokio::test]
    async fn test_token_without_kid_tries_all_keys() {
        let f = fixture(10);
        let raw = f
            .keypair
            .sign_with_header(&Header::new(Algorithm::EdDSA), &claims().build());

        assert!(f.validator.validate(f.validator.parse(&raw).unwrap()).await.is_ok());
    }

    // =========================================================================
    // authenticate
    // =========================================================================

    #[tokio::test]
    async fn test_authenticate_failure_is_audited_with_principal() {
        let f = fixture(0);
        let raw = f.keypair.sign_token(&claims().expires_in(-60).build());

        let failure = f.validator.authenticate(&raw, Some("10.0.0.5")).await.unwrap_err();

        assert_eq!(failure.reason, "Cannot verify token using wrong algorithm");
        let events = f.audit.events();
        assert_eq!(events.len(), 1);
        let extension = events.first().unwrap().extension();
        assert_eq!(extension.get("suser").map(String::as_str), Some("alice"));
        assert_eq!(extension.get("src").map(String::as_str), Some("10.0.0.5"));
        assert_eq!(extension.get("result").map(String::as_str), Some("failed"));
        assert_eq!(
            extension.get("authenticationType").map(String::as_str),
            Some("OAUTHBEARER")
        );
    }

    #[tokio::test]
    async fn test_authenticate_malformed_has_no_principal() {
        let f = fixture(10);

        let failure = f.validator.authenticate("not-a-token", None).await.unwrap_err();

        assert_eq!(failure.reason, "Cannot verify token with non-JWT structure");
        let events = f.audit.events();
        assert!(!events.first().unwrap().extension().contains_key("suser"));
    }

    #[tokio::test]
    async fn test_authenticate_success_is_not_audited_here() {
        let f = fixture(10);
        let raw = f.keypair.sign_token(&claims().build());

        let token = f.validator.authenticate(&raw, None).await.unwrap();

        assert_eq!(token.subject(), "alice");
        assert!(f.audit.events().is_empty());
    }

    #[test]
    fn test_jwt_error_mapping() {
        let expired = jsonwebtoken::errors::Error::from(JwtErrorKind::ExpiredSignature);
        assert_eq!(map_jwt_error(&expired).kind(), ErrorKind::Claims);

        let bad_sig = jsonwebtoken::errors::Error::from(JwtErrorKind::InvalidSignature);
        assert_eq!(map_jwt_error(&bad_sig).kind(), ErrorKind::Signature);

        let bad_key = jsonwebtoken::errors::Error::from(JwtErrorKind::InvalidKeyFormat);
        assert_eq!(map_jwt_error(&bad_key).kind(), ErrorKind::KeyResolution);
    }
}
