//! Principal derivation and authorization working together.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use oauth_server::audit::{AuditEvent, MemoryAuditSink, OperationType};
use oauth_server::authz::{
    AccessControlEntry, AclBinding, AclOperation, AclPermission, Action, InMemoryAclStore,
    PrincipalRef, ResourcePattern, ResourceType,
};
use oauth_server::config::AuthorizerConfig;
use oauth_server::{
    AuthenticationContext, AuthorizationResult, Authorizer, Principal, PrincipalBuilder,
};
use oauth_test_utils::{TestKeypair, TestTokenBuilder};
use security_common::Token;
use std::collections::HashMap;
use std::sync::Arc;

const CLIENT: &str = "192.168.0.10";

fn acl(pattern: ResourcePattern, principal: &str, operation: &str, permission: &str) -> AclBinding {
    AclBinding::new(
        pattern,
        AccessControlEntry::new(
            principal.parse::<PrincipalRef>().unwrap(),
            "*",
            operation.parse::<AclOperation>().unwrap(),
            permission.parse::<AclPermission>().unwrap(),
        ),
    )
}

fn config(pairs: &[(&str, &str)]) -> AuthorizerConfig {
    let options: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    AuthorizerConfig::from_options(&options).unwrap()
}

fn oauth_principal(builder: &PrincipalBuilder, subject: &str, roles: &[&str]) -> Principal {
    let claims = TestTokenBuilder::new().for_user(subject).with_roles(roles).build();
    let raw = TestKeypair::new(3, "k").sign_token(&claims);
    let token = Token::parse(&raw, "resource_access.account.roles").unwrap();
    builder.build(
        AuthenticationContext::SaslOAuth {
            authorization_id: subject.to_string(),
            token,
        },
        CLIENT,
    )
}

struct Broker {
    store: Arc<InMemoryAclStore>,
    authorizer: Authorizer,
    principals: PrincipalBuilder,
    audit: Arc<MemoryAuditSink>,
}

fn broker(config: AuthorizerConfig) -> Broker {
    let audit = Arc::new(MemoryAuditSink::default());
    let store = Arc::new(InMemoryAclStore::default());
    Broker {
        authorizer: Authorizer::new(store.clone(), config, audit.clone()),
        principals: PrincipalBuilder::new(audit.clone()),
        store,
        audit,
    }
}

#[test]
fn test_token_roles_are_matched_as_role_principals() {
    let b = broker(AuthorizerConfig::default());
    b.store.add(acl(
        ResourcePattern::prefixed(ResourceType::Topic, "orders."),
        "Role:producer",
        "WRITE",
        "ALLOW",
    ));
    let alice = oauth_principal(&b.principals, "alice", &["producer", "reader"]);
    let eu_orders = ResourcePattern::literal(ResourceType::Topic, "orders.eu");

    assert!(b.authorizer.authorize(&alice, AclOperation::Write, &eu_orders, CLIENT).is_allowed());
    assert!(b
        .authorizer
        .authorize(&alice, AclOperation::Describe, &eu_orders, CLIENT)
        .is_allowed());
    assert!(!b.authorizer.authorize(&alice, AclOperation::Read, &eu_orders, CLIENT).is_allowed());
}

#[test]
fn test_user_acl_does_not_apply_to_token_principal() {
    let b = broker(AuthorizerConfig::default());
    let orders = ResourcePattern::literal(ResourceType::Topic, "orders");
    b.store.add(acl(orders.clone(), "User:alice", "READ", "ALLOW"));

    let oauth_alice = oauth_principal(&b.principals, "alice", &["consumer"]);
    let scram_alice = b.principals.build(
        AuthenticationContext::Sasl {
            mechanism: "SCRAM-SHA-256".to_string(),
            authorization_id: "alice".to_string(),
        },
        CLIENT,
    );

    assert_eq!(
        b.authorizer.authorize(&oauth_alice, AclOperation::Read, &orders, CLIENT),
        AuthorizationResult::Denied
    );
    assert_eq!(
        b.authorizer.authorize(&scram_alice, AclOperation::Read, &orders, CLIENT),
        AuthorizationResult::Allowed
    );
}

#[test]
fn test_role_deny_beats_other_role_allow() {
    let b = broker(AuthorizerConfig::default());
    let payments = ResourcePattern::literal(ResourceType::Topic, "payments");
    b.store.add(acl(payments.clone(), "Role:consumer", "READ", "ALLOW"));
    let all_topics = ResourcePattern::literal(ResourceType::Topic, "*");
    b.store.add(acl(all_topics, "Role:contractor", "ALL", "DENY"));

    let bob = oauth_principal(&b.principals, "bob", &["consumer", "contractor"]);

    assert_eq!(
        b.authorizer.authorize(&bob, AclOperation::Read, &payments, CLIENT),
        AuthorizationResult::Denied
    );
}

#[test]
fn test_super_users_from_options() {
    let b = broker(config(&[("super.users", "User:admin; User:CN=operator ;")]));
    let cluster = ResourcePattern::literal(ResourceType::Cluster, "kafka-cluster");
    b.store.add(acl(cluster.clone(), "*", "ALL", "DENY"));

    let operator = b.principals.build(
        AuthenticationContext::Tls {
            peer: Some("CN=operator".to_string()),
        },
        CLIENT,
    );
    let admin_with_token = oauth_principal(&b.principals, "admin", &[]);

    assert!(b.authorizer.authorize(&operator, AclOperation::Alter, &cluster, CLIENT).is_allowed());
    assert!(b
        .authorizer
        .authorize(&admin_with_token, AclOperation::Alter, &cluster, CLIENT)
        .is_allowed());
}

#[test]
fn test_default_policy_from_options() {
    let open = broker(config(&[("allow.everyone.if.no.acl.found", "TRUE")]));
    let closed = broker(config(&[]));
    let topic = ResourcePattern::literal(ResourceType::Topic, "unguarded");
    let carol = Principal::user("carol");

    assert!(open.authorizer.authorize(&carol, AclOperation::Read, &topic, CLIENT).is_allowed());
    assert!(!closed.authorizer.authorize(&carol, AclOperation::Read, &topic, CLIENT).is_allowed());
}

#[test]
fn test_plaintext_connection_is_always_denied() {
    let b = broker(config(&[("allow.everyone.if.no.acl.found", "true")]));
    let anonymous = b.principals.build(AuthenticationContext::Plaintext, CLIENT);

    let result = b.authorizer.authorize(
        &anonymous,
        AclOperation::Describe,
        &ResourcePattern::literal(ResourceType::Topic, "t"),
        CLIENT,
    );

    assert_eq!(result, AuthorizationResult::Denied);
}

#[test]
fn test_full_audit_trail() {
    let b = broker(AuthorizerConfig::default());
    let orders = ResourcePattern::literal(ResourceType::Topic, "orders");
    b.store.add(acl(orders.clone(), "Role:producer", "WRITE", "ALLOW"));

    let alice = oauth_principal(&b.principals, "alice", &["producer"]);
    let results = b.authorizer.authorize_all(
        &alice,
        &[
            Action::new(AclOperation::Write, orders.clone()),
            Action::new(AclOperation::Delete, orders),
        ],
        CLIENT,
    );
    assert_eq!(results, vec![AuthorizationResult::Allowed, AuthorizationResult::Denied]);

    let events = b.audit.events();
    let types: Vec<_> = events.iter().map(AuditEvent::operation_type).collect();
    assert_eq!(
        types,
        vec![
            OperationType::AuthenticationEvent,
            OperationType::AuthorizationEvent,
            OperationType::AuthorizationFailed,
        ]
    );

    let denied = events.last().unwrap();
    assert_eq!(
        denied.name(),
        "Principal 'User:alice,Roles:producer' with client IP '192.168.0.10' is unauthorized to perform operation 'DELETE' on resource 'ResourcePattern(resourceType=TOPIC, name=orders, patternType=LITERAL)'"
    );
    assert_eq!(denied.category(), "kafka.audit");
}
