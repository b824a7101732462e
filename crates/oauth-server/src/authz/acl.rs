//! Access control model: operations, resources and ACL entries.
//!
//! Names follow the broker's ACL vocabulary. Parsing is case-insensitive and
//! ignores underscores, so `DescribeConfigs`, `DESCRIBE_CONFIGS` and
//! `describeconfigs` are the same operation.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Wildcard for hosts, principal types and principal names.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind} '{value}'")]
pub struct AclParseError {
    pub kind: &'static str,
    pub value: String,
}

impl AclParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

fn normalized(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclPermission {
    Allow,
    Deny,
}

impl AclPermission {
    pub fn as_str(self) -> &'static str {
        match self {
            AclPermission::Allow => "ALLOW",
            AclPermission::Deny => "DENY",
        }
    }
}

impl fmt::Display for AclPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AclPermission {
    type Err = AclParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalized(value).as_str() {
            "allow" => Ok(AclPermission::Allow),
            "deny" => Ok(AclPermission::Deny),
            _ => Err(AclParseError::new("permission", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AclOperation {
    /// Matches every operation when used in an entry.
    All,
    Read,
    Write,
    Create,
    Delete,
    Alter,
    Describe,
    ClusterAction,
    DescribeConfigs,
    AlterConfigs,
    IdempotentWrite,
    CreateTokens,
    DescribeTokens,
}

impl AclOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            AclOperation::All => "ALL",
            AclOperation::Read => "READ",
            AclOperation::Write => "WRITE",
            AclOperation::Create => "CREATE",
            AclOperation::Delete => "DELETE",
            AclOperation::Alter => "ALTER",
            AclOperation::Describe => "DESCRIBE",
            AclOperation::ClusterAction => "CLUSTER_ACTION",
            AclOperation::DescribeConfigs => "DESCRIBE_CONFIGS",
            AclOperation::AlterConfigs => "ALTER_CONFIGS",
            AclOperation::IdempotentWrite => "IDEMPOTENT_WRITE",
            AclOperation::CreateTokens => "CREATE_TOKENS",
            AclOperation::DescribeTokens => "DESCRIBE_TOKENS",
        }
    }

    /// Operations whose grant also grants this one.
    pub fn implied_by(self) -> &'static [AclOperation] {
        match self {
            AclOperation::Describe => &[
                AclOperation::Read,
                AclOperation::Write,
                AclOperation::Delete,
                AclOperation::Alter,
            ],
            AclOperation::DescribeConfigs => &[AclOperation::AlterConfigs],
            _ => &[],
        }
    }
}

impl fmt::Display for AclOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AclOperation {
    type Err = AclParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let operation = match normalized(value).as_str() {
            "all" => AclOperation::All,
            "read" => AclOperation::Read,
            "write" => AclOperation::Write,
            "create" => AclOperation::Create,
            "delete" => AclOperation::Delete,
            "alter" => AclOperation::Alter,
            "describe" => AclOperation::Describe,
            "clusteraction" => AclOperation::ClusterAction,
            "describeconfigs" => AclOperation::DescribeConfigs,
            "alterconfigs" => AclOperation::AlterConfigs,
            "idempotentwrite" => AclOperation::IdempotentWrite,
            "createtokens" => AclOperation::CreateTokens,
            "describetokens" => AclOperation::DescribeTokens,
            _ => return Err(AclParseError::new("operation", value)),
        };
        Ok(operation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Topic,
    Group,
    Cluster,
    TransactionalId,
    DelegationToken,
    User,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Topic => "TOPIC",
            ResourceType::Group => "GROUP",
            ResourceType::Cluster => "CLUSTER",
            ResourceType::TransactionalId => "TRANSACTIONAL_ID",
            ResourceType::DelegationToken => "DELEGATION_TOKEN",
            ResourceType::User => "USER",
        }
    }
}

impl FromStr for ResourceType {
    type Err = AclParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalized(value).as_str() {
            "topic" => Ok(ResourceType::Topic),
            "group" => Ok(ResourceType::Group),
            "cluster" => Ok(ResourceType::Cluster),
            "transactionalid" => Ok(ResourceType::TransactionalId),
            "delegationtoken" => Ok(ResourceType::DelegationToken),
            "user" => Ok(ResourceType::User),
            _ => Err(AclParseError::new("resource type", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternType {
    /// The name is matched exactly; a name of `*` matches every resource.
    Literal,
    /// The name is a prefix of matching resource names.
    Prefixed,
}

impl PatternType {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternType::Literal => "LITERAL",
            PatternType::Prefixed => "PREFIXED",
        }
    }
}

/// A resource, or a pattern over resources when used in a binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePattern {
    pub resource_type: ResourceType,
    pub name: String,
    pub pattern_type: PatternType,
}

impl ResourcePattern {
    pub fn literal(resource_type: ResourceType, name: impl Into<String>) -> Self {
        Self {
            resource_type,
            name: name.into(),
            pattern_type: PatternType::Literal,
        }
    }

    pub fn prefixed(resource_type: ResourceType, prefix: impl Into<String>) -> Self {
        Self {
            resource_type,
            name: prefix.into(),
            pattern_type: PatternType::Prefixed,
        }
    }

    /// Whether this binding pattern covers the concrete `resource`.
    pub fn covers(&self, resource: &ResourcePattern) -> bool {
        if self.resource_type != resource.resource_type {
            return false;
        }
        match self.pattern_type {
            PatternType::Literal => self.name == WILDCARD || self.name == resource.name,
            PatternType::Prefixed => resource.name.starts_with(&self.name),
        }
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ResourcePattern(resourceType={}, name={}, patternType={})",
            self.resource_type.as_str(),
            self.name,
            self.pattern_type.as_str()
        )
    }
}

/// Principal named by an ACL entry, `Type:name`, either part possibly `*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrincipalRef {
    pub principal_type: String,
    pub name: String,
}

impl PrincipalRef {
    pub fn new(principal_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            principal_type: principal_type.into(),
            name: name.into(),
        }
    }

    /// Matches every principal.
    pub fn any() -> Self {
        Self::new(WILDCARD, WILDCARD)
    }
}

impl fmt::Display for PrincipalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.principal_type, self.name)
    }
}

impl FromStr for PrincipalRef {
    type Err = AclParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value == WILDCARD {
            return Ok(Self::any());
        }
        match value.split_once(':') {
            Some((principal_type, name)) if !principal_type.is_empty() && !name.is_empty() => {
                Ok(Self::new(principal_type, name))
            }
            _ => Err(AclParseError::new("principal", value)),
        }
    }
}

/// One access rule: `permission` for `principal` to perform `operation`
/// from `host`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessControlEntry {
    pub principal: PrincipalRef,
    pub host: String,
    pub operation: AclOperation,
    pub permission: AclPermission,
}

impl AccessControlEntry {
    pub fn new(
        principal: PrincipalRef,
        host: impl Into<String>,
        operation: AclOperation,
        permission: AclPermission,
    ) -> Self {
        Self {
            principal,
            host: host.into(),
            operation,
            permission,
        }
    }

    pub fn allow(principal: PrincipalRef, operation: AclOperation) -> Self {
        Self::new(principal, WILDCARD, operation, AclPermission::Allow)
    }

    pub fn deny(principal: PrincipalRef, operation: AclOperation) -> Self {
        Self::new(principal, WILDCARD, operation, AclPermission::Deny)
    }
}

impl fmt::Display for AccessControlEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(principal={}, host={}, operation={}, permissionType={})",
            self.principal, self.host, self.operation, self.permission
        )
    }
}

/// An entry attached to a resource pattern, as held by an ACL store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AclBinding {
    pub pattern: ResourcePattern,
    pub entry: AccessControlEntry,
}

impl AclBinding {
    pub fn new(pattern: ResourcePattern, entry: AccessControlEntry) -> Self {
        Self { pattern, entry }
    }
}
