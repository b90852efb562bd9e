use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback portrait for people added without one.
pub const DEFAULT_MAIN_IMAGE: &str = "https://picsum.photos/400/400";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

/// One record in the family. Field names match the stored JSON (camelCase).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub gender: Gender,
    pub birth_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub death_date: Option<NaiveDate>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub main_image: String,
    #[serde(default)]
    pub gallery: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spouse_id: Option<String>,
}

impl Person {
    pub fn is_living(&self) -> bool {
        self.death_date.is_none()
    }

    /// "1945" or "1920 - 1995", as shown under the name on a card.
    pub fn lifespan(&self) -> String {
        match self.death_date {
            Some(d) => format!("{} - {}", self.birth_date.format("%Y"), d.format("%Y")),
            None => self.birth_date.format("%Y").to_string(),
        }
    }
}

/// Fields supplied by the edit form when adding someone. Only `name` and
/// `birth_date` are required; the rest fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub death_date: Option<NaiveDate>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub main_image: Option<String>,
}

impl NewPerson {
    pub fn named(name: impl Into<String>, birth_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            birth_date: Some(birth_date),
            ..Self::default()
        }
    }
}

/// How a new person relates to the target they are added against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Child,
    Spouse,
    Parent,
    Sibling,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationType::Child => write!(f, "CHILD"),
            RelationType::Spouse => write!(f, "SPOUSE"),
            RelationType::Parent => write!(f, "PARENT"),
            RelationType::Sibling => write!(f, "SIBLING"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Public,
    BranchAdmin,
    SuperAdmin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Public => write!(f, "PUBLIC"),
            Role::BranchAdmin => write!(f, "BRANCH_ADMIN"),
            Role::SuperAdmin => write!(f, "SUPER_ADMIN"),
        }
    }
}

/// The already-authenticated caller. Identity is resolved elsewhere; the core
/// only needs the role and, for branch admins, the person their branch starts at.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_branch_id: Option<String>,
}

impl Actor {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn super_admin() -> Self {
        Self {
            role: Role::SuperAdmin,
            assigned_branch_id: None,
        }
    }

    pub fn branch_admin(branch_id: impl Into<String>) -> Self {
        Self {
            role: Role::BranchAdmin,
            assigned_branch_id: Some(branch_id.into()),
        }
    }
}
