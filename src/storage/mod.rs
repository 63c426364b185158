//! Durable key-value storage for editor state that outlives a session:
//! the persisted snapshot and the UI theme preference.

use crate::config::THEME_KEY;
use crate::error::{EditorError, Result};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File used by [`FileKeyValueStore`] inside the state directory.
pub const STATE_FILE_NAME: &str = "state.json";

// ============================================================================
// Store trait
// ============================================================================

/// String-to-string durable storage.
///
/// Writes either fully succeed or leave the previous value in place.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Volatile store for tests and hosts without a state directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: IndexMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.shift_remove(key);
        Ok(())
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// Store persisted as a flat JSON object in `<state_dir>/state.json`.
///
/// The whole map is rewritten on every change through a temporary file and
/// a rename, so a failed write never truncates the previous state.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: IndexMap<String, String>,
}

impl FileKeyValueStore {
    /// Open (or lazily create) the store under `state_dir`.
    pub fn open(state_dir: &Path) -> Result<Self> {
        let path = state_dir.join(STATE_FILE_NAME);
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).map_err(|e| {
                EditorError::Storage(format!("{} is corrupt: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => IndexMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!("Opened state store at {}", path.display());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &IndexMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| EditorError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut next = self.entries.clone();
        next.insert(key.to_string(), value.to_string());
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if !self.entries.contains_key(key) {
            return Ok(());
        }
        let mut next = self.entries.clone();
        next.shift_remove(key);
        self.flush(&next)?;
        self.entries = next;
        Ok(())
    }
}

// ============================================================================
// Theme preference
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemePreference {
    #[default]
    Dark,
    Light,
}

impl ThemePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    /// Read the stored preference. Missing or unknown values mean dark.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(THEME_KEY) {
            Ok(Some(value)) => value.parse().unwrap_or_default(),
            Ok(None) => Self::default(),
            Err(e) => {
                warn!("Failed to read theme preference: {e}");
                Self::default()
            }
        }
    }

    pub fn persist(self, store: &mut dyn KeyValueStore) -> Result<()> {
        store.set(THEME_KEY, self.as_str())
    }
}

impl std::fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ThemePreference {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            _ => Err(format!("invalid theme: {s}")),
        }
    }
}
