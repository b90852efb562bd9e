//! Expand/collapse state and the pruned view of a hierarchy.
//!
//! Collapsing is shallow: a collapsed node hides its children, but the flags
//! of everything below it are kept, so re-expanding restores the subtree
//! exactly as it was left.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::hierarchy::{Hierarchy, NodeIdx};
use crate::store::RelationStore;

/// Ids whose spouse and children are currently shown. Starts empty, which
/// means only the roots are visible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpansionState {
    expanded: BTreeSet<String>,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            expanded: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    /// Returns true if the id was newly added.
    pub fn expand(&mut self, id: &str) -> bool {
        self.expanded.insert(id.to_string())
    }

    /// Returns true if the id was present.
    pub fn collapse(&mut self, id: &str) -> bool {
        self.expanded.remove(id)
    }

    /// Flip one id and return whether it is now expanded.
    pub fn toggle(&mut self, id: &str) -> bool {
        if self.collapse(id) {
            false
        } else {
            self.expand(id)
        }
    }

    /// Expand every ancestor of `id` so that the person becomes visible.
    pub fn reveal(&mut self, store: &RelationStore, id: &str) {
        let target = match store.get(id) {
            Some(p) => p,
            None => return,
        };
        // A satellite spouse is visible once their partner is expanded.
        if let Some(partner) = store.spouse_of(id) {
            if target.parent_id.is_none() && !store.parent_ids().contains(id) {
                self.expand(&partner.id);
                for a in store.ancestors(&partner.id) {
                    self.expanded.insert(a.id.clone());
                }
            }
        }
        for a in store.ancestors(id) {
            self.expanded.insert(a.id.clone());
        }
    }

    pub fn expand_all(&mut self, store: &RelationStore) {
        self.expanded
            .extend(store.people().iter().map(|p| p.id.clone()));
    }

    /// Drop ids that no longer name anyone in the store.
    pub fn retain_existing(&mut self, store: &RelationStore) {
        self.expanded.retain(|id| store.contains(id));
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.expanded.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }
}

/// A hierarchy with collapsed nodes' children moved to a latent list.
#[derive(Debug, Clone)]
pub struct PrunedTree<'t, 'a> {
    tree: &'t Hierarchy<'a>,
    visible: Vec<Vec<NodeIdx>>,
    latent: Vec<Vec<NodeIdx>>,
    expanded: Vec<bool>,
}

pub fn prune<'t, 'a>(tree: &'t Hierarchy<'a>, state: &ExpansionState) -> PrunedTree<'t, 'a> {
    let n = tree.len();
    let mut visible = Vec::with_capacity(n);
    let mut latent = Vec::with_capacity(n);
    let mut expanded = Vec::with_capacity(n);
    for node in tree.nodes() {
        let open = match node.anchor.person() {
            Some(p) => state.is_expanded(&p.id),
            None => true,
        };
        if open {
            visible.push(node.children.clone());
            latent.push(Vec::new());
        } else {
            visible.push(Vec::new());
            latent.push(node.children.clone());
        }
        expanded.push(open);
    }
    PrunedTree {
        tree,
        visible,
        latent,
        expanded,
    }
}

impl<'t, 'a> PrunedTree<'t, 'a> {
    pub fn hierarchy(&self) -> &'t Hierarchy<'a> {
        self.tree
    }

    pub fn is_expanded(&self, idx: NodeIdx) -> bool {
        self.expanded[idx]
    }

    pub fn visible_children(&self, idx: NodeIdx) -> &[NodeIdx] {
        &self.visible[idx]
    }

    pub fn latent_children(&self, idx: NodeIdx) -> &[NodeIdx] {
        &self.latent[idx]
    }

    /// Whether expanding or collapsing this node changes anything on screen.
    pub fn is_togglable(&self, idx: NodeIdx) -> bool {
        !self.visible[idx].is_empty()
            || !self.latent[idx].is_empty()
            || self.tree.attached_spouse(idx).is_some()
    }

    /// Re-attach latent children. Returns false for unknown ids or nodes
    /// already expanded.
    pub fn expand(&mut self, id: &str) -> bool {
        let Some(idx) = self.tree.index_of(id) else {
            return false;
        };
        if self.expanded[idx] {
            return false;
        }
        self.expanded[idx] = true;
        self.visible[idx] = std::mem::take(&mut self.latent[idx]);
        true
    }

    /// Detach children into the latent list. The virtual root has no id and
    /// so can never be collapsed.
    pub fn collapse(&mut self, id: &str) -> bool {
        let Some(idx) = self.tree.index_of(id) else {
            return false;
        };
        if !self.expanded[idx] {
            return false;
        }
        self.expanded[idx] = false;
        self.latent[idx] = std::mem::take(&mut self.visible[idx]);
        true
    }

    /// Visible nodes in pre-order, starting at the hierarchy root (which may
    /// be the virtual root).
    pub fn visible_nodes(&self) -> Vec<NodeIdx> {
        let mut out = Vec::new();
        let mut stack = vec![self.tree.root()];
        while let Some(idx) = stack.pop() {
            out.push(idx);
            stack.extend(self.visible[idx].iter().rev());
        }
        out
    }

    /// Visible parent/children lists, for comparing two pruned views.
    pub fn shape(&self) -> Vec<(NodeIdx, Vec<NodeIdx>)> {
        self.visible_nodes()
            .into_iter()
            .map(|idx| (idx, self.visible[idx].clone()))
            .collect()
    }
}
