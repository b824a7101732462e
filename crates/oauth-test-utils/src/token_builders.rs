//! Builder patterns for test data construction
//!
//! Produces token payloads shaped like the ones identity providers issue,
//! with roles under `resource_access.account.roles` unless told otherwise.

use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Issuer used when a test does not care about it.
pub const TEST_ISSUER: &str = "http://localhost:8090/auth/realms/kafka";

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_scope("email profile")
///     .expires_in(3600)
///     .build();
/// ```
pub struct TestTokenBuilder {
    sub: String,
    iss: String,
    exp: i64,
    iat: i64,
    scope: Option<Value>,
    roles: Vec<String>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            iss: TEST_ISSUER.to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
            scope: None,
            roles: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Set the subject (user/service)
    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the issuer URL
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set the scope as a single string
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Some(Value::String(scope.to_string()));
        self
    }

    /// Set the scope as a JSON array
    pub fn with_scope_list(mut self, scopes: &[&str]) -> Self {
        self.scope = Some(json!(scopes));
        self
    }

    /// Set roles under `resource_access.account.roles`
    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.roles = roles.iter().map(ToString::to_string).collect();
        self
    }

    /// Add an arbitrary top-level claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = timestamp;
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = json!({
            "sub": self.sub,
            "iss": self.iss,
            "exp": self.exp,
            "iat": self.iat,
            "resource_access": {"account": {"roles": self.roles}},
        });
        if let Some(object) = claims.as_object_mut() {
            if let Some(scope) = self.scope {
                object.insert("scope".to_string(), scope);
            }
            object.extend(self.extra);
        }
        claims
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
