//! Stratifies lineage nodes into a single rooted tree.
//!
//! Several disconnected lineages are joined under one [`Anchor::Virtual`] node.
//! The virtual node exists only inside this structure: it is never written to
//! the store, has no id, and is skipped by everything that emits output.

use std::collections::{HashMap, HashSet};

use crate::classify::Classification;
use crate::error::StructureError;
use crate::model::Person;
use crate::store::RelationStore;

/// Arena index of a node in a [`Hierarchy`].
pub type NodeIdx = usize;

#[derive(Debug, Clone, Copy)]
pub enum Anchor<'a> {
    Real(&'a Person),
    Virtual,
}

impl<'a> Anchor<'a> {
    pub fn person(&self) -> Option<&'a Person> {
        match self {
            Anchor::Real(p) => Some(p),
            Anchor::Virtual => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Anchor::Virtual)
    }
}

#[derive(Debug, Clone)]
pub struct TreeNode<'a> {
    pub anchor: Anchor<'a>,
    pub parent: Option<NodeIdx>,
    /// Lineage children in store order.
    pub children: Vec<NodeIdx>,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct Hierarchy<'a> {
    nodes: Vec<TreeNode<'a>>,
    by_id: HashMap<&'a str, NodeIdx>,
    store: &'a RelationStore,
    spouses: Vec<&'a Person>,
}

impl<'a> Hierarchy<'a> {
    /// Build the tree over `classification.lineage`. Returns `Ok(None)` when
    /// there is nobody to draw.
    pub fn build(
        store: &'a RelationStore,
        classification: &Classification<'a>,
    ) -> Result<Option<Self>, StructureError> {
        let lineage = &classification.lineage;
        if lineage.is_empty() {
            return Ok(None);
        }

        let members: HashMap<&str, &Person> =
            lineage.iter().map(|p| (p.id.as_str(), *p)).collect();
        let mut children: HashMap<&str, Vec<&'a Person>> = HashMap::new();
        let mut roots: Vec<&'a Person> = Vec::new();
        for &p in lineage {
            match p.parent_id.as_deref() {
                Some(pid) if members.contains_key(pid) => {
                    children.entry(pid).or_default().push(p);
                }
                Some(pid) => {
                    return Err(StructureError::DanglingReference {
                        id: p.id.clone(),
                        missing: pid.to_string(),
                    });
                }
                None => roots.push(p),
            }
        }

        if roots.is_empty() {
            return Err(cycle_from(lineage[0], &members));
        }

        let mut tree = Hierarchy {
            nodes: Vec::with_capacity(lineage.len() + 1),
            by_id: HashMap::with_capacity(lineage.len()),
            store,
            spouses: classification.spouses.clone(),
        };

        let virtual_root = roots.len() > 1;
        let base_depth = if virtual_root {
            tree.nodes.push(TreeNode {
                anchor: Anchor::Virtual,
                parent: None,
                children: Vec::new(),
                depth: 0,
            });
            1
        } else {
            0
        };

        for root in roots {
            let parent = if virtual_root { Some(0) } else { None };
            tree.attach_subtree(root, parent, base_depth, &children);
        }

        if tree.by_id.len() < lineage.len() {
            // Whatever was not reached hangs off a loop with no root above it.
            let stranded = lineage
                .iter()
                .find(|p| !tree.by_id.contains_key(p.id.as_str()))
                .copied()
                .unwrap_or(lineage[0]);
            return Err(cycle_from(stranded, &members));
        }

        tracing::debug!(
            nodes = tree.nodes.len(),
            virtual_root,
            "built hierarchy"
        );
        Ok(Some(tree))
    }

    fn attach_subtree(
        &mut self,
        top: &'a Person,
        parent: Option<NodeIdx>,
        depth: usize,
        children: &HashMap<&str, Vec<&'a Person>>,
    ) {
        let mut stack = vec![(top, parent, depth)];
        while let Some((person, parent, depth)) = stack.pop() {
            let idx = self.nodes.len();
            self.nodes.push(TreeNode {
                anchor: Anchor::Real(person),
                parent,
                children: Vec::new(),
                depth,
            });
            self.by_id.insert(person.id.as_str(), idx);
            if let Some(p) = parent {
                self.nodes[p].children.push(idx);
            }
            if let Some(kids) = children.get(person.id.as_str()) {
                // Reversed so siblings pop, and therefore attach, in store order.
                for kid in kids.iter().rev() {
                    stack.push((*kid, Some(idx), depth + 1));
                }
            }
        }
    }

    pub fn root(&self) -> NodeIdx {
        0
    }

    pub fn has_virtual_root(&self) -> bool {
        self.nodes[0].anchor.is_virtual()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: NodeIdx) -> &TreeNode<'a> {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[TreeNode<'a>] {
        &self.nodes
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIdx> {
        self.by_id.get(id).copied()
    }

    /// Person id of a node, `None` for the virtual root.
    pub fn id(&self, idx: NodeIdx) -> Option<&'a str> {
        self.nodes[idx].anchor.person().map(|p| p.id.as_str())
    }

    /// The real roots: the virtual root's children, or the single root.
    pub fn real_roots(&self) -> Vec<NodeIdx> {
        if self.has_virtual_root() {
            self.nodes[0].children.clone()
        } else {
            vec![0]
        }
    }

    pub fn store(&self) -> &'a RelationStore {
        self.store
    }

    /// Spouse satellite drawn next to this node, found by id lookup.
    pub fn attached_spouse(&self, idx: NodeIdx) -> Option<&'a Person> {
        let anchor = self.nodes[idx].anchor.person()?;
        self.spouses
            .iter()
            .find(|s| s.spouse_id.as_deref() == Some(anchor.id.as_str()))
            .copied()
    }
}

/// Walk parent links from `start` until an id repeats and report it.
fn cycle_from<'p>(start: &'p Person, members: &HashMap<&str, &'p Person>) -> StructureError {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut cursor = start;
    loop {
        if !seen.insert(cursor.id.as_str()) {
            return StructureError::Cycle {
                id: cursor.id.clone(),
            };
        }
        match cursor.parent_id.as_deref().and_then(|pid| members.get(pid).copied()) {
            Some(next) => cursor = next,
            None => {
                return StructureError::Cycle {
                    id: start.id.clone(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::testing::{person, PersonExt};

    fn build(store: &RelationStore) -> Result<Option<Hierarchy<'_>>, StructureError> {
        let c = classify(store);
        Hierarchy::build(store, &c)
    }

    #[test]
    fn single_lineage_has_real_root() {
        let store = RelationStore::from_people(vec![
            person("r"),
            person("a").parent("r"),
            person("b").parent("r"),
            person("a1").parent("a"),
        ])
        .unwrap();
        let tree = build(&store).unwrap().unwrap();
        assert!(!tree.has_virtual_root());
        assert_eq!(tree.id(tree.root()), Some("r"));
        let kids: Vec<_> = tree.node(0).children.iter().map(|&i| tree.id(i)).collect();
        assert_eq!(kids, [Some("a"), Some("b")]);
        assert_eq!(tree.node(tree.index_of("a1").unwrap()).depth, 2);
    }

    #[test]
    fn disconnected_lineages_share_virtual_root() {
        let store = RelationStore::from_people(vec![
            person("r1"),
            person("r2"),
            person("c").parent("r2"),
            person("r3"),
        ])
        .unwrap();
        let tree = build(&store).unwrap().unwrap();
        assert!(tree.has_virtual_root());
        assert_eq!(tree.id(0), None);
        let roots: Vec<_> = tree.real_roots().iter().map(|&i| tree.id(i)).collect();
        assert_eq!(roots, [Some("r1"), Some("r2"), Some("r3")]);
        assert_eq!(tree.node(tree.index_of("r1").unwrap()).depth, 1);
        // The store is untouched.
        assert!(store.get("r1").unwrap().parent_id.is_none());
    }

    #[test]
    fn empty_store_builds_nothing() {
        let store = RelationStore::new();
        assert!(build(&store).unwrap().is_none());
    }

    #[test]
    fn two_node_cycle_fails() {
        let store =
            RelationStore::from_people(vec![person("a").parent("b"), person("b").parent("a")])
                .unwrap();
        assert!(matches!(build(&store), Err(StructureError::Cycle { .. })));
    }

    #[test]
    fn cycle_beside_a_real_root_fails() {
        let store = RelationStore::from_people(vec![
            person("r"),
            person("a").parent("b"),
            person("b").parent("a"),
        ])
        .unwrap();
        assert!(matches!(build(&store), Err(StructureError::Cycle { .. })));
    }

    #[test]
    fn dangling_parent_fails() {
        let store = RelationStore::from_people(vec![person("a").parent("ghost")]).unwrap();
        assert_eq!(
            build(&store).unwrap_err(),
            StructureError::DanglingReference {
                id: "a".into(),
                missing: "ghost".into()
            }
        );
    }

    #[test]
    fn spouse_is_looked_up_not_a_tree_node() {
        let store = RelationStore::from_people(vec![
            person("r").spouse("s"),
            person("s").spouse("r"),
            person("k").parent("r"),
        ])
        .unwrap();
        let tree = build(&store).unwrap().unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree.index_of("s").is_none());
        assert_eq!(tree.attached_spouse(0).map(|p| p.id.as_str()), Some("s"));
    }
}
