//! ACL-based authorization.

pub mod acl;
pub mod authorizer;
pub mod matcher;
pub mod store;

pub use acl::{
    AccessControlEntry, AclBinding, AclOperation, AclParseError, AclPermission, PatternType,
    PrincipalRef, ResourcePattern, ResourceType, WILDCARD,
};
pub use authorizer::{Action, AuthorizationResult, Authorizer};
pub use store::{AclStore, InMemoryAclStore};
