//! Authentication and authorization audit records.

use crate::authz::acl::{AclOperation, ResourcePattern};
use crate::principal::Principal;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;

/// Category every record is filed under.
pub const KAFKA_AUDIT_CATEGORY: &str = "kafka.audit";

const USERNAME_TAG: &str = "suser";
const CLIENT_IP_TAG: &str = "src";
const RESULT_TAG: &str = "result";
const TYPE_TAG: &str = "type";
const AUDIT_TYPE_VALUE: &str = "audit_log_type";

/// Placeholder for an absent principal or client address in record names.
const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    AuthenticationEvent,
    AuthenticationFailed,
    AuthorizationEvent,
    AuthorizationFailed,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::AuthenticationEvent => "AUTHENTICATION_EVENT",
            OperationType::AuthenticationFailed => "AUTHENTICATION_FAILED",
            OperationType::AuthorizationEvent => "AUTHORIZATION_EVENT",
            OperationType::AuthorizationFailed => "AUTHORIZATION_FAILED",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extension fields shared by both record kinds.
fn base_extension(
    principal: Option<&str>,
    client_address: Option<&str>,
    successful: bool,
) -> BTreeMap<String, String> {
    let mut extension = BTreeMap::new();
    if let Some(principal) = principal {
        extension.insert(USERNAME_TAG.to_string(), principal.to_string());
    }
    if let Some(client_address) = client_address {
        extension.insert(CLIENT_IP_TAG.to_string(), client_address.to_string());
    }
    extension.insert(
        RESULT_TAG.to_string(),
        if successful { "successful" } else { "failed" }.to_string(),
    );
    extension.insert(TYPE_TAG.to_string(), AUDIT_TYPE_VALUE.to_string());
    extension
}

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRecord {
    pub timestamp: DateTime<Utc>,
    pub operation_type: OperationType,
    pub name: String,
    pub extension: BTreeMap<String, String>,
}

impl AuthenticationRecord {
    pub fn successful(
        principal: &str,
        authentication_type: &str,
        client_address: Option<String>,
    ) -> Self {
        let name = format!(
            "Successful authentication for principal '{principal}' with client IP '{}'",
            client_address.as_deref().unwrap_or(UNKNOWN)
        );
        Self::build(
            Some(principal),
            authentication_type,
            client_address.as_deref(),
            true,
            name,
        )
    }

    pub fn failed(
        principal: Option<String>,
        authentication_type: &str,
        reason: &str,
        client_address: Option<String>,
    ) -> Self {
        let name = format!(
            "Failed authentication for principal '{}' with client IP '{}': {reason}",
            principal.as_deref().unwrap_or(UNKNOWN),
            client_address.as_deref().unwrap_or(UNKNOWN)
        );
        Self::build(
            principal.as_deref(),
            authentication_type,
            client_address.as_deref(),
            false,
            name,
        )
    }

    fn build(
        principal: Option<&str>,
        authentication_type: &str,
        client_address: Option<&str>,
        successful: bool,
        name: String,
    ) -> Self {
        let mut extension = base_extension(principal, client_address, successful);
        extension.insert(
            "authenticationType".to_string(),
            authentication_type.to_string(),
        );
        Self {
            timestamp: Utc::now(),
            operation_type: if successful {
                OperationType::AuthenticationEvent
            } else {
                OperationType::AuthenticationFailed
            },
            name,
            extension,
        }
    }
}

/// Outcome of an authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRecord {
    pub timestamp: DateTime<Utc>,
    pub operation_type: OperationType,
    pub name: String,
    pub extension: BTreeMap<String, String>,
}

impl AuthorizationRecord {
    pub fn new(
        principal: &Principal,
        client_address: &str,
        operation: AclOperation,
        resource: &ResourcePattern,
        allowed: bool,
    ) -> Self {
        let name = format!(
            "Principal '{principal}' with client IP '{client_address}' is {} to perform operation '{operation}' on resource '{resource}'",
            if allowed { "authorized" } else { "unauthorized" }
        );

        let mut extension = base_extension(Some(principal.name()), Some(client_address), allowed);
        extension.insert("operation".to_string(), operation.as_str().to_string());
        extension.insert("resource".to_string(), resource.to_string());

        Self {
            timestamp: Utc::now(),
            operation_type: if allowed {
                OperationType::AuthorizationEvent
            } else {
                OperationType::AuthorizationFailed
            },
            name,
            extension,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::authz::acl::ResourceType;

    fn get<'a>(extension: &'a BTreeMap<String, String>, key: &str) -> Option<&'a str> {
        extension.get(key).map(String::as_str)
    }

    #[test]
    fn test_successful_authentication_record() {
        let record =
            AuthenticationRecord::successful("alice", "OAUTHBEARER", Some("10.0.0.1".to_string()));

        assert_eq!(record.operation_type, OperationType::AuthenticationEvent);
        assert_eq!(
            record.name,
            "Successful authentication for principal 'alice' with client IP '10.0.0.1'"
        );
        assert_eq!(get(&record.extension, "suser"), Some("alice"));
        assert_eq!(get(&record.extension, "src"), Some("10.0.0.1"));
        assert_eq!(get(&record.extension, "result"), Some("successful"));
        assert_eq!(get(&record.extension, "type"), Some("audit_log_type"));
        assert_eq!(get(&record.extension, "authenticationType"), Some("OAUTHBEARER"));
    }

    #[test]
    fn test_failed_authentication_record_without_principal_or_address() {
        let record = AuthenticationRecord::failed(None, "OAUTHBEARER", "bad token", None);

        assert_eq!(record.operation_type, OperationType::AuthenticationFailed);
        assert_eq!(
            record.name,
            "Failed authentication for principal 'unknown' with client IP 'unknown': bad token"
        );
        assert!(!record.extension.contains_key("suser"));
        assert!(!record.extension.contains_key("src"));
        assert_eq!(get(&record.extension, "result"), Some("failed"));
    }

    #[test]
    fn test_authorization_record() {
        let principal = Principal::user("bob");
        let resource = ResourcePattern::literal(ResourceType::Topic, "orders");

        let denied =
            AuthorizationRecord::new(&principal, "10.0.0.9", AclOperation::Write, &resource, false);

        assert_eq!(denied.operation_type, OperationType::AuthorizationFailed);
        assert_eq!(
            denied.name,
            "Principal 'User:bob' with client IP '10.0.0.9' is unauthorized to perform operation 'WRITE' on resource 'ResourcePattern(resourceType=TOPIC, name=orders, patternType=LITERAL)'"
        );
        assert_eq!(get(&denied.extension, "suser"), Some("bob"));
        assert_eq!(get(&denied.extension, "operation"), Some("WRITE"));
        assert_eq!(get(&denied.extension, "result"), Some("failed"));

        let allowed =
            AuthorizationRecord::new(&principal, "10.0.0.9", AclOperation::Read, &resource, true);
        assert_eq!(allowed.operation_type, OperationType::AuthorizationEvent);
        assert!(allowed.name.contains("is authorized"));
    }
}
