//! Who may change the tree where.
//!
//! Branch admins are scoped to the subtree under their assigned person. Scope
//! is computed from the stored parent links, not from the drawn tree, so a
//! collapsed or virtual-rooted view never widens it.

use std::collections::HashSet;

use crate::error::TreeError;
use crate::model::{Actor, Role};
use crate::store::RelationStore;

/// Whether `actor` may make a structural change anchored at `target`.
/// `None` as target means adding a new disconnected root.
pub fn can_mutate(actor: &Actor, target: Option<&str>, store: &RelationStore) -> bool {
    match actor.role {
        Role::Public => false,
        Role::SuperAdmin => true,
        Role::BranchAdmin => match (actor.assigned_branch_id.as_deref(), target) {
            (Some(branch), Some(target)) => is_within_branch(store, branch, target),
            _ => false,
        },
    }
}

/// Like [`can_mutate`], but as a `Result` for `?` chains.
pub fn authorize(actor: &Actor, target: Option<&str>, store: &RelationStore) -> Result<(), TreeError> {
    if can_mutate(actor, target, store) {
        Ok(())
    } else {
        tracing::info!(role = %actor.role, target_id = ?target, "mutation refused");
        Err(TreeError::PermissionDenied {
            role: actor.role,
            target: target.map(str::to_string),
        })
    }
}

/// True when `target` is `branch` or one of its descendants.
pub fn is_within_branch(store: &RelationStore, branch: &str, target: &str) -> bool {
    if !store.contains(branch) || !store.contains(target) {
        return false;
    }
    let children = store.children_index();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack = vec![branch];
    while let Some(id) = stack.pop() {
        if id == target {
            return true;
        }
        if !visited.insert(id) {
            continue;
        }
        if let Some(kids) = children.get(id) {
            stack.extend(kids.iter().copied());
        }
    }
    false
}
