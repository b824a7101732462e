//! ACL storage.

use crate::authz::acl::{AccessControlEntry, AclBinding, ResourcePattern};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Source of the ACL entries that apply to a resource.
pub trait AclStore: Send + Sync {
    /// Every entry whose binding pattern covers `resource`.
    fn acls_for(&self, resource: &ResourcePattern) -> Vec<AccessControlEntry>;
}

/// In-memory store. Readers see a consistent snapshot while writers
/// replace the binding list.
#[derive(Default)]
pub struct InMemoryAclStore {
    bindings: ArcSwap<Vec<AclBinding>>,
}

impl InMemoryAclStore {
    pub fn new(bindings: Vec<AclBinding>) -> Self {
        Self {
            bindings: ArcSwap::from_pointee(bindings),
        }
    }

    /// Add a binding. Duplicates are ignored.
    pub fn add(&self, binding: AclBinding) {
        self.bindings.rcu(|current| {
            let mut next = Vec::clone(current);
            if !next.contains(&binding) {
                next.push(binding.clone());
            }
            next
        });
    }

    /// Remove a binding. Returns whether it was present.
    pub fn remove(&self, binding: &AclBinding) -> bool {
        let previous = self.bindings.rcu(|current| {
            current
                .iter()
                .filter(|b| *b != binding)
                .cloned()
                .collect::<Vec<_>>()
        });
        previous.contains(binding)
    }

    /// Replace every binding.
    pub fn replace(&self, bindings: Vec<AclBinding>) {
        self.bindings.store(Arc::new(bindings));
    }

    pub fn bindings(&self) -> Arc<Vec<AclBinding>> {
        self.bindings.load_full()
    }
}

impl AclStore for InMemoryAclStore {
    fn acls_for(&self, resource: &ResourcePattern) -> Vec<AccessControlEntry> {
        self.bindings
            .load()
            .iter()
            .filter(|binding| binding.pattern.covers(resource))
            .map(|binding| binding.entry.clone())
            .collect()
    }
}
