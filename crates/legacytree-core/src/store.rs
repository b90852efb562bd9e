//! The flat relation store: every person plus parent/spouse references.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::ValidationError;
use crate::model::Person;

/// Owns all person records. Lookups go through an id index; iteration order is
/// insertion order, which the rest of the pipeline relies on for determinism.
#[derive(Debug, Clone, Default)]
pub struct RelationStore {
    people: Vec<Person>,
    index: HashMap<String, usize>,
}

/// A broken invariant found by [`RelationStore::integrity_issues`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "camelCase")]
pub enum IntegrityIssue {
    DanglingParent { id: String, parent_id: String },
    DanglingSpouse { id: String, spouse_id: String },
    SelfParent { id: String },
    SelfSpouse { id: String },
    AsymmetricSpouse { id: String, spouse_id: String },
    ParentCycle { id: String },
}

impl RelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a record set. Only id uniqueness is enforced here; structural
    /// problems surface when the tree is built.
    pub fn from_people(people: Vec<Person>) -> Result<Self, ValidationError> {
        let mut index = HashMap::with_capacity(people.len());
        for (i, p) in people.iter().enumerate() {
            if index.insert(p.id.clone(), i).is_some() {
                return Err(ValidationError::DuplicateId(p.id.clone()));
            }
        }
        Ok(Self { people, index })
    }

    pub fn people(&self) -> &[Person] {
        &self.people
    }

    pub fn snapshot(&self) -> Vec<Person> {
        self.people.clone()
    }

    pub fn into_people(self) -> Vec<Person> {
        self.people
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Person> {
        self.index.get(id).map(|&i| &self.people[i])
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Person> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.people[i]),
            None => None,
        }
    }

    /// Append a record. Callers must have checked the id is fresh.
    pub(crate) fn push(&mut self, person: Person) {
        self.index.insert(person.id.clone(), self.people.len());
        self.people.push(person);
    }

    pub fn children_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Person> + 'a {
        self.people
            .iter()
            .filter(move |p| p.parent_id.as_deref() == Some(id))
    }

    pub fn spouse_of(&self, id: &str) -> Option<&Person> {
        self.get(id)?.spouse_id.as_deref().and_then(|s| self.get(s))
    }

    /// True when the person exists and has no recorded parent.
    pub fn is_root(&self, id: &str) -> bool {
        self.get(id).is_some_and(|p| p.parent_id.is_none())
    }

    /// Ids that appear as someone's `parentId`.
    pub fn parent_ids(&self) -> HashSet<&str> {
        self.people
            .iter()
            .filter_map(|p| p.parent_id.as_deref())
            .collect()
    }

    /// parent id → child ids, in store order.
    pub fn children_index(&self) -> HashMap<&str, Vec<&str>> {
        let mut map: HashMap<&str, Vec<&str>> = HashMap::new();
        for p in &self.people {
            if let Some(pid) = p.parent_id.as_deref() {
                map.entry(pid).or_default().push(p.id.as_str());
            }
        }
        map
    }

    /// Ancestors of `id`, nearest first. Stops early on a cycle or a dangling link.
    pub fn ancestors(&self, id: &str) -> Vec<&Person> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        seen.insert(id);
        let mut cursor = self.get(id).and_then(|p| p.parent_id.as_deref());
        while let Some(pid) = cursor {
            if !seen.insert(pid) {
                break;
            }
            match self.get(pid) {
                Some(parent) => {
                    out.push(parent);
                    cursor = parent.parent_id.as_deref();
                }
                None => break,
            }
        }
        out
    }

    /// Next unused id of the form `p-N`.
    pub fn next_person_id(&self) -> String {
        let max = self
            .people
            .iter()
            .filter_map(|p| p.id.strip_prefix("p-").and_then(|s| s.parse::<u64>().ok()))
            .max()
            .unwrap_or(0);
        format!("p-{}", max + 1)
    }

    /// Every broken invariant in the store, in store order.
    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = Vec::new();
        for p in &self.people {
            if let Some(pid) = &p.parent_id {
                if *pid == p.id {
                    issues.push(IntegrityIssue::SelfParent { id: p.id.clone() });
                } else if !self.contains(pid) {
                    issues.push(IntegrityIssue::DanglingParent {
                        id: p.id.clone(),
                        parent_id: pid.clone(),
                    });
                }
            }
            if let Some(sid) = &p.spouse_id {
                if *sid == p.id {
                    issues.push(IntegrityIssue::SelfSpouse { id: p.id.clone() });
                } else {
                    match self.get(sid) {
                        None => issues.push(IntegrityIssue::DanglingSpouse {
                            id: p.id.clone(),
                            spouse_id: sid.clone(),
                        }),
                        Some(other) if other.spouse_id.as_deref() != Some(p.id.as_str()) => {
                            issues.push(IntegrityIssue::AsymmetricSpouse {
                                id: p.id.clone(),
                                spouse_id: sid.clone(),
                            })
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        // Each cycle is reported once, at its first member in store order.
        let mut cleared: HashSet<&str> = HashSet::new();
        let mut reported: HashSet<&str> = HashSet::new();
        for p in &self.people {
            let mut path: Vec<&str> = Vec::new();
            let mut on_path: HashSet<&str> = HashSet::new();
            let mut cursor = Some(p.id.as_str());
            while let Some(id) = cursor {
                if cleared.contains(id) {
                    break;
                }
                if !on_path.insert(id) {
                    let start = path.iter().position(|&x| x == id).unwrap_or(0);
                    let members = &path[start..];
                    if !members.iter().any(|m| reported.contains(m)) {
                        issues.push(IntegrityIssue::ParentCycle { id: id.to_string() });
                    }
                    reported.extend(members.iter().copied());
                    break;
                }
                path.push(id);
                cursor = self.get(id).and_then(|x| x.parent_id.as_deref());
            }
            cleared.extend(path);
        }
        issues
    }
}
