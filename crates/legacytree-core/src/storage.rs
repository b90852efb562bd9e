use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::layout::LayoutConfig;
use crate::model::{Actor, Person};

/// Environment variable that relocates the library root.
pub const HOME_ENV: &str = "LEGACYTREE_HOME";

const TREE_SUFFIX: &str = ".tree.json";

/// A directory of saved trees plus the settings file.
#[derive(Debug, Clone)]
pub struct Library {
    root: PathBuf,
}

impl Library {
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$LEGACYTREE_HOME`, or `~/.legacytree/`.
    pub fn open_default() -> Self {
        match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => Self::at(dir),
            _ => Self::at(
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".legacytree"),
            ),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn tree_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        validate_name(name)?;
        Ok(self.root.join(format!("{name}{TREE_SUFFIX}")))
    }

    /// Saved tree names, sorted.
    pub fn list_trees(&self) -> Result<Vec<String>, StorageError> {
        if !self.root.exists() {
            return Ok(vec![]);
        }
        let mut names: Vec<String> = fs::read_dir(&self.root)
            .map_err(|e| io_err(&self.root, e))?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name().to_string_lossy().to_string();
                name.strip_suffix(TREE_SUFFIX)
                    .filter(|n| validate_name(n).is_ok())
                    .map(|n| n.to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn tree_exists(&self, name: &str) -> bool {
        self.tree_path(name).is_ok_and(|p| p.is_file())
    }

    pub fn read_tree(&self, name: &str) -> Result<Vec<Person>, StorageError> {
        let path = self.tree_path(name)?;
        if !path.is_file() {
            return Err(StorageError::NotFound(name.to_string()));
        }
        let raw = fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        serde_json::from_str(&raw).map_err(|source| StorageError::Json { path, source })
    }

    /// Replace a tree on disk. The new content lands under a temp name first
    /// and is renamed over the old file, so readers never see a partial write.
    pub fn write_tree(&self, name: &str, people: &[Person]) -> Result<(), StorageError> {
        let path = self.tree_path(name)?;
        let json = serde_json::to_string_pretty(people).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;
        let tmp = self.root.join(format!(".{name}{TREE_SUFFIX}.tmp"));
        fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
        tracing::debug!(tree = name, people = people.len(), "wrote tree");
        Ok(())
    }

    /// Deleting a tree that does not exist is not an error.
    pub fn delete_tree(&self, name: &str) -> Result<(), StorageError> {
        let path = self.tree_path(name)?;
        if path.exists() {
            fs::remove_file(&path).map_err(|e| io_err(&path, e))
        } else {
            Ok(())
        }
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    /// Settings from disk. A missing file gives defaults; so does a malformed
    /// one, with a warning.
    pub fn read_settings(&self) -> Settings {
        let path = self.settings_path();
        if !path.exists() {
            return Settings::default();
        }
        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|s| serde_json::from_str(&s).map_err(|e| e.to_string()));
        match parsed {
            Ok(settings) => settings,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "ignoring unreadable settings");
                Settings::default()
            }
        }
    }

    pub fn write_settings(&self, settings: &Settings) -> Result<(), StorageError> {
        let path = self.settings_path();
        fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;
        let json = serde_json::to_string_pretty(settings).map_err(|source| StorageError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(|e| io_err(&path, e))
    }
}

/// Tree names become file names: non-empty, ASCII letters, digits, `-`, `_`.
pub fn validate_name(name: &str) -> Result<(), StorageError> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

fn io_err(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Who is editing, and how trees are spaced.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub actor: Actor,
    #[serde(default)]
    pub layout: LayoutConfig,
}

// --- Templates ---

pub const TEMPLATES: &[&str] = &["harrison", "empty"];

const HARRISON: &str = include_str!("../templates/harrison.json");

/// People to seed a new tree with.
pub fn template(name: &str) -> Result<Vec<Person>, StorageError> {
    match name {
        "empty" => Ok(Vec::new()),
        "harrison" => serde_json::from_str(HARRISON).map_err(|source| StorageError::Json {
            path: PathBuf::from("templates/harrison.json"),
            source,
        }),
        other => Err(StorageError::UnknownTemplate(other.to_string())),
    }
}
