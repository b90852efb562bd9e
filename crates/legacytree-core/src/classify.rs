//! Splits the store into structural lineage nodes and spouse satellites.
//!
//! A spouse who married into the family has no parent and no children of their
//! own on record, so they hang off their partner's card instead of getting a
//! slot in the tree.

use std::collections::HashSet;

use crate::model::Person;
use crate::store::RelationStore;

/// Output of [`classify`]. Both lists keep store order and together contain
/// every person exactly once.
#[derive(Debug, Clone)]
pub struct Classification<'a> {
    pub lineage: Vec<&'a Person>,
    pub spouses: Vec<&'a Person>,
}

impl<'a> Classification<'a> {
    pub fn is_lineage(&self, id: &str) -> bool {
        self.lineage.iter().any(|p| p.id == id)
    }

    /// The satellite attached to `anchor_id`, if any.
    pub fn attached_spouse(&self, anchor_id: &str) -> Option<&'a Person> {
        self.spouses
            .iter()
            .find(|s| s.spouse_id.as_deref() == Some(anchor_id))
            .copied()
    }
}

pub fn classify(store: &RelationStore) -> Classification<'_> {
    let parent_ids = store.parent_ids();
    let mut lineage = Vec::new();
    let mut spouses = Vec::new();
    for p in store.people() {
        if is_lineage(p, store, &parent_ids) {
            lineage.push(p);
        } else {
            spouses.push(p);
        }
    }
    tracing::debug!(lineage = lineage.len(), spouses = spouses.len(), "classified people");
    Classification { lineage, spouses }
}

fn anchors_lineage(p: &Person, parent_ids: &HashSet<&str>) -> bool {
    p.parent_id.is_some() || parent_ids.contains(p.id.as_str())
}

fn is_lineage(p: &Person, store: &RelationStore, parent_ids: &HashSet<&str>) -> bool {
    if anchors_lineage(p, parent_ids) {
        return true;
    }
    let Some(spouse_id) = p.spouse_id.as_deref() else {
        return true;
    };
    match store.get(spouse_id) {
        // A self-reference is as good as no spouse at all.
        Some(spouse) if spouse.id == p.id => true,
        Some(spouse) if anchors_lineage(spouse, parent_ids) => false,
        // Neither partner is anchored: the smaller id carries the couple.
        Some(spouse) => p.id < spouse.id,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{person, PersonExt};

    fn ids(people: &[&Person]) -> Vec<String> {
        people.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn married_in_spouse_becomes_satellite() {
        let store = RelationStore::from_people(vec![
            person("root"),
            person("child").parent("root").spouse("inlaw"),
            person("inlaw").spouse("child"),
        ])
        .unwrap();
        let c = classify(&store);
        assert_eq!(ids(&c.lineage), ["root", "child"]);
        assert_eq!(ids(&c.spouses), ["inlaw"]);
        assert_eq!(c.attached_spouse("child").map(|p| p.id.as_str()), Some("inlaw"));
        assert!(c.attached_spouse("root").is_none());
    }

    #[test]
    fn spouse_who_is_a_parent_stays_in_lineage() {
        let store = RelationStore::from_people(vec![
            person("x").spouse("y"),
            person("y").spouse("x"),
            person("kid").parent("y"),
        ])
        .unwrap();
        let c = classify(&store);
        assert_eq!(ids(&c.lineage), ["y", "kid"]);
        assert_eq!(ids(&c.spouses), ["x"]);
    }

    #[test]
    fn unanchored_couple_elects_smaller_id() {
        let store = RelationStore::from_people(vec![
            person("zed").spouse("amy"),
            person("amy").spouse("zed"),
        ])
        .unwrap();
        let c = classify(&store);
        assert_eq!(ids(&c.lineage), ["amy"]);
        assert_eq!(ids(&c.spouses), ["zed"]);
    }

    #[test]
    fn both_anchored_partners_are_lineage() {
        let store = RelationStore::from_people(vec![
            person("r"),
            person("a").parent("r").spouse("b"),
            person("b").parent("r").spouse("a"),
        ])
        .unwrap();
        let c = classify(&store);
        assert_eq!(c.lineage.len(), 3);
        assert!(c.spouses.is_empty());
    }

    #[test]
    fn missing_spouse_keeps_holder_in_lineage() {
        let store = RelationStore::from_people(vec![person("solo").spouse("gone")]).unwrap();
        let c = classify(&store);
        assert!(c.is_lineage("solo"));
    }

    #[test]
    fn self_married_record_stays_in_lineage() {
        let store = RelationStore::from_people(vec![person("odd").spouse("odd")]).unwrap();
        let c = classify(&store);
        assert_eq!(ids(&c.lineage), ["odd"]);
        assert!(c.spouses.is_empty());
    }
}
