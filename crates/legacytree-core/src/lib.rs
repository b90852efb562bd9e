//! Family records projected into a drawable tree, with permission-checked
//! edits and a small on-disk library of saved trees.

pub mod classify;
pub mod collapse;
pub mod error;
pub mod hierarchy;
pub mod layout;
pub mod model;
pub mod mutation;
pub mod permission;
pub mod rules;
pub mod storage;
pub mod store;
pub mod tree;

#[cfg(test)]
mod testing;

pub use collapse::ExpansionState;
pub use error::{Result, StorageError, StructureError, TreeError, ValidationError};
pub use layout::{Layout, LayoutConfig, Scene};
pub use model::{Actor, Gender, NewPerson, Person, RelationType, Role};
pub use mutation::Backfill;
pub use storage::{Library, Settings};
pub use store::{IntegrityIssue, RelationStore};
pub use tree::{render, FamilyTree, FileSink, NullSink, PersistSink};
