//! Saved layouts on disk.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::{SessionError, SessionResult};
use crate::layout::FlatLayout;

/// Serialize a layout to JSON.
pub fn serialize_layout(layout: &FlatLayout) -> SessionResult<String> {
    serde_json::to_string_pretty(layout).map_err(|e| SessionError::Persistence(e.to_string()))
}

/// Deserialize a layout from JSON.
pub fn deserialize_layout(json: &str) -> SessionResult<FlatLayout> {
    serde_json::from_str(json).map_err(|e| SessionError::Persistence(e.to_string()))
}

/// Return the default directory where layouts are stored.
pub fn layout_dir() -> PathBuf {
    data_dir().unwrap_or_else(|| PathBuf::from("/tmp/tessel")).join("layouts")
}

fn data_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_DATA_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|home| home.join(".local/share")))
        .map(|dir| dir.join("tessel"))
}

/// Directory of `<name>.json` layout files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutStore {
    dir: PathBuf,
}

impl LayoutStore {
    /// Store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store in the user's data directory.
    pub fn default_location() -> Self {
        Self::new(layout_dir())
    }

    /// Directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `name`. Names must stay inside the store directory.
    fn path(&self, name: &str) -> SessionResult<PathBuf> {
        if name.is_empty() || name.contains("..") || name.chars().any(std::path::is_separator) {
            return Err(SessionError::Persistence(format!("invalid layout name {name:?}")));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Save a layout under `name`, replacing any previous one.
    pub fn save(&self, name: &str, layout: &FlatLayout) -> SessionResult<()> {
        let path = self.path(name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, serialize_layout(layout)?)?;
        info!("Saved layout {name:?} to {}", path.display());
        Ok(())
    }

    /// Load the layout saved under `name`.
    pub fn load(&self, name: &str) -> SessionResult<FlatLayout> {
        let path = self.path(name)?;
        let json = fs::read_to_string(&path).map_err(|e| {
            SessionError::Persistence(format!("failed to read {}: {e}", path.display()))
        })?;
        deserialize_layout(&json)
    }

    /// Names of all saved layouts, sorted.
    pub fn list(&self) -> SessionResult<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete the layout saved under `name`, if any.
    pub fn delete(&self, name: &str) -> SessionResult<()> {
        let path = self.path(name)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
