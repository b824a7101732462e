//! Authorization decisions.
//!
//! Evaluation order for one request:
//!
//! 1. Anonymous principals are denied without an ACL lookup
//! 2. Super users are allowed without an ACL lookup
//! 3. No ACLs for the resource: the configured default policy
//! 4. A matching DENY for the requested operation denies
//! 5. A matching ALLOW for the operation, or for an operation implying it,
//!    allows
//! 6. Otherwise deny
//!
//! Token-backed principals are matched against ACLs as type `Role` using
//! every role in their token. All other principals are matched as type
//! `User` by name. Every decision is sent to the audit sink.

use crate::audit::{AuditEvent, AuditSink, AuthorizationRecord};
use crate::authz::acl::{AclOperation, AclPermission, ResourcePattern};
use crate::authz::matcher::matches;
use crate::authz::store::AclStore;
use crate::config::AuthorizerConfig;
use crate::principal::{Principal, ROLE_PRINCIPAL_TYPE, USER_PRINCIPAL_TYPE};
use arc_swap::ArcSwap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationResult {
    Allowed,
    Denied,
}

impl AuthorizationResult {
    pub fn is_allowed(self) -> bool {
        self == AuthorizationResult::Allowed
    }
}

impl From<bool> for AuthorizationResult {
    fn from(allowed: bool) -> Self {
        if allowed {
            AuthorizationResult::Allowed
        } else {
            AuthorizationResult::Denied
        }
    }
}

/// One operation on one resource, as requested in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub operation: AclOperation,
    pub resource: ResourcePattern,
}

impl Action {
    pub fn new(operation: AclOperation, resource: ResourcePattern) -> Self {
        Self {
            operation,
            resource,
        }
    }
}

pub struct Authorizer {
    store: Arc<dyn AclStore>,
    config: ArcSwap<AuthorizerConfig>,
    audit: Arc<dyn AuditSink>,
}

impl Authorizer {
    pub fn new(
        store: Arc<dyn AclStore>,
        config: AuthorizerConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            config: ArcSwap::from_pointee(config),
            audit,
        }
    }

    /// Replace the superuser set and default policy. In-flight decisions
    /// finish with the configuration they started with.
    pub fn reconfigure(&self, config: AuthorizerConfig) {
        tracing::info!(
            target: "server.authz",
            super_user_count = config.super_users.len(),
            allow_everyone_if_no_acl_found = config.allow_everyone_if_no_acl_found,
            "Authorizer reconfigured"
        );
        self.config.store(Arc::new(config));
    }

    pub fn is_super_user(&self, principal: &Principal) -> bool {
        self.config
            .load()
            .super_users
            .contains(&principal.qualified_name())
    }

    pub fn authorize(
        &self,
        principal: &Principal,
        operation: AclOperation,
        resource: &ResourcePattern,
        host: &str,
    ) -> AuthorizationResult {
        let allowed = self.decide(principal, operation, resource, host);

        if allowed {
            tracing::trace!(
                target: "server.authz",
                principal = %principal,
                operation = %operation,
                host = %host,
                resource = %resource,
                "Authorization allowed"
            );
        } else {
            tracing::warn!(
                target: "server.authz",
                principal = %principal,
                operation = %operation,
                host = %host,
                resource = %resource,
                "Authorization denied"
            );
        }

        self.audit.record(AuditEvent::Authorization(AuthorizationRecord::new(
            principal, host, operation, resource, allowed,
        )));

        AuthorizationResult::from(allowed)
    }

    /// One result per action, in order.
    pub fn authorize_all(
        &self,
        principal: &Principal,
        actions: &[Action],
        host: &str,
    ) -> Vec<AuthorizationResult> {
        actions
            .iter()
            .map(|action| self.authorize(principal, action.operation, &action.resource, host))
            .collect()
    }

    fn decide(
        &self,
        principal: &Principal,
        operation: AclOperation,
        resource: &ResourcePattern,
        host: &str,
    ) -> bool {
        if principal.is_anonymous() {
            tracing::debug!(
                target: "server.authz",
                principal = %principal,
                "Anonymous principal is never authorized"
            );
            return false;
        }

        let config = self.config.load();
        if config.super_users.contains(&principal.qualified_name()) {
            tracing::trace!(
                target: "server.authz",
                principal = %principal,
                "Principal is a super user"
            );
            return true;
        }

        let (principal_type, names): (&str, Vec<&str>) = match principal.token() {
            Some(token) => (
                ROLE_PRINCIPAL_TYPE,
                token.roles().iter().map(String::as_str).collect(),
            ),
            None => (USER_PRINCIPAL_TYPE, vec![principal.name()]),
        };

        let acls = self.store.acls_for(resource);
        if acls.is_empty() {
            let allowed = config.allow_everyone_if_no_acl_found;
            if allowed {
                tracing::trace!(
                    target: "server.authz",
                    resource = %resource,
                    "No ACL found for resource, allowed by default"
                );
            } else {
                tracing::warn!(
                    target: "server.authz",
                    resource = %resource,
                    "No ACL found for resource, denied by default"
                );
            }
            return allowed;
        }

        let matching = |permission: AclPermission, requested: AclOperation| {
            acls.iter().any(|entry| {
                matches(
                    entry,
                    permission,
                    requested,
                    host,
                    principal_type,
                    names.iter().copied(),
                )
            })
        };

        if matching(AclPermission::Deny, operation) {
            return false;
        }

        std::iter::once(operation)
            .chain(operation.implied_by().iter().copied())
            .any(|granting| matching(AclPermission::Allow, granting))
    }
}
