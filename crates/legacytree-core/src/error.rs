//! Error taxonomy for the tree core.
//!
//! Validation and permission failures are recoverable and leave state
//! untouched. Structure failures mean the stored relations are malformed and
//! abort the current layout pass.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::{RelationType, Role};

/// Rejected input on load or add.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),

    #[error("death date precedes birth date")]
    DeathBeforeBirth,

    #[error("person '{0}' not found")]
    UnknownPerson(String),

    #[error("person '{0}' already has a spouse")]
    AlreadyMarried(String),

    #[error("person '{0}' already has a parent")]
    AlreadyHasParent(String),

    #[error("person '{0}' already has a parent and cannot be adopted by a new {1} relation")]
    NotRootless(String, RelationType),

    #[error("person '{0}' is married to the target and cannot become their sibling")]
    SpouseAsSibling(String),

    #[error("duplicate person id '{0}'")]
    DuplicateId(String),
}

/// The relation store cannot be stratified into a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("parent cycle through person '{id}'")]
    Cycle { id: String },

    #[error("person '{id}' references missing parent '{missing}'")]
    DanglingReference { id: String, missing: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("invalid tree name '{0}': use letters, digits, '-' or '_'")]
    InvalidName(String),

    #[error("tree '{0}' not found")]
    NotFound(String),

    #[error("unknown template '{0}'")]
    UnknownTemplate(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Umbrella error for everything the facade and tools can surface.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{role} may not modify the tree at {}", target.as_deref().unwrap_or("a new root"))]
    PermissionDenied { role: Role, target: Option<String> },

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("invalid layout config: {0}")]
    Config(String),
}

pub type Result<T, E = TreeError> = std::result::Result<T, E>;
