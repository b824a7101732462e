//! ACL entry matching.

use crate::authz::acl::{AccessControlEntry, AclOperation, AclPermission, WILDCARD};

/// Whether `entry` applies to a request.
///
/// - The permission must be equal
/// - The operation must be equal, unless the entry's operation is `ALL`
/// - The host must be equal ignoring case, unless the entry's host is `*`
/// - The principal type must be equal ignoring case, unless the entry's type
///   is `*`
/// - The entry's principal name must be `*` or equal, ignoring case, to any
///   of the candidate names
pub fn matches<'a, I>(
    entry: &AccessControlEntry,
    permission: AclPermission,
    operation: AclOperation,
    host: &str,
    principal_type: &str,
    candidate_names: I,
) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    if entry.permission != permission {
        return false;
    }
    if entry.operation != operation && entry.operation != AclOperation::All {
        return false;
    }
    if entry.host != WILDCARD && !entry.host.eq_ignore_ascii_case(host) {
        return false;
    }

    let acl_principal = &entry.principal;
    if acl_principal.principal_type != WILDCARD
        && !acl_principal.principal_type.eq_ignore_ascii_case(principal_type)
    {
        return false;
    }
    if acl_principal.name == WILDCARD {
        return true;
    }
    candidate_names
        .into_iter()
        .any(|name| acl_principal.name.eq_ignore_ascii_case(name))
}
