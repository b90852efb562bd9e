//! The session facade: one store, one sink, and the read pipeline.

use serde::Serialize;

use crate::classify::classify;
use crate::collapse::{prune, ExpansionState};
use crate::error::{StorageError, TreeError, ValidationError};
use crate::hierarchy::Hierarchy;
use crate::layout::{layout, LayoutConfig, Scene};
use crate::model::{Actor, NewPerson, Person, RelationType};
use crate::mutation::{add_person_as, Backfill};
use crate::permission::can_mutate;
use crate::storage::Library;
use crate::store::{IntegrityIssue, RelationStore};

/// Receives the full person list after every change.
pub trait PersistSink {
    fn persist(&mut self, people: &[Person]) -> Result<(), StorageError>;
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl PersistSink for NullSink {
    fn persist(&mut self, _people: &[Person]) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Saves into a named tree of a [`Library`].
#[derive(Debug, Clone)]
pub struct FileSink {
    library: Library,
    name: String,
}

impl FileSink {
    pub fn new(library: Library, name: impl Into<String>) -> Self {
        Self {
            library,
            name: name.into(),
        }
    }
}

impl PersistSink for FileSink {
    fn persist(&mut self, people: &[Person]) -> Result<(), StorageError> {
        self.library.write_tree(&self.name, people)
    }
}

/// Outcome of the save that follows a successful add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PersistStatus {
    Saved,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Added {
    pub id: String,
    pub persisted: PersistStatus,
}

pub struct FamilyTree<S: PersistSink = NullSink> {
    store: RelationStore,
    sink: S,
    config: LayoutConfig,
}

impl<S: PersistSink> FamilyTree<S> {
    /// Load people as given. An empty list is a valid, empty tree.
    pub fn load(people: Vec<Person>, sink: S) -> Result<Self, ValidationError> {
        let store = RelationStore::from_people(people)?;
        tracing::debug!(people = store.len(), "loaded tree");
        Ok(Self {
            store,
            sink,
            config: LayoutConfig::default(),
        })
    }

    pub fn with_config(mut self, config: LayoutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn store(&self) -> &RelationStore {
        &self.store
    }

    pub fn people(&self) -> &[Person] {
        self.store.people()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn person_by_id(&self, id: &str) -> Option<&Person> {
        self.store.get(id)
    }

    pub fn can_mutate(&self, actor: &Actor, target: Option<&str>) -> bool {
        can_mutate(actor, target, &self.store)
    }

    /// Authorize, apply, then persist. A failed save is reported in the
    /// result and never undoes the in-memory change.
    pub fn add_person(
        &mut self,
        actor: &Actor,
        fields: NewPerson,
        relation: RelationType,
        target: Option<&str>,
        backfill: Backfill,
    ) -> Result<Added, TreeError> {
        let id = add_person_as(actor, &mut self.store, fields, relation, target, backfill)?;
        let persisted = match self.sink.persist(self.store.people()) {
            Ok(()) => PersistStatus::Saved,
            Err(error) => {
                tracing::warn!(%error, person = %id, "failed to persist tree");
                PersistStatus::Failed {
                    message: error.to_string(),
                }
            }
        };
        Ok(Added { id, persisted })
    }

    pub fn render(&self, state: &ExpansionState) -> Result<Scene, TreeError> {
        render(&self.store, state, &self.config)
    }

    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        self.store.integrity_issues()
    }

    pub fn into_people(self) -> Vec<Person> {
        self.store.into_people()
    }
}

/// Classify, stratify, prune and lay out.
pub fn render(
    store: &RelationStore,
    state: &ExpansionState,
    config: &LayoutConfig,
) -> Result<Scene, TreeError> {
    config.validate()?;
    let classification = classify(store);
    let Some(tree) = Hierarchy::build(store, &classification)? else {
        return Ok(Scene::Empty);
    };
    let pruned = prune(&tree, state);
    let out = layout(&pruned, config);
    tracing::debug!(nodes = out.nodes.len(), edges = out.edges.len(), "rendered tree");
    Ok(Scene::Drawn(out))
}
