//! Baseline snapshot and dirty-state tracking.

use crate::codec;
use crate::config::{now_iso8601, ConfigDocument, SNAPSHOT_DOCUMENT_KEY, SNAPSHOT_TIME_KEY};
use crate::error::{EditorError, Result};
use crate::storage::KeyValueStore;
use tracing::{debug, warn};

/// Relationship between the live document and the committed baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Nothing has been committed yet.
    Empty,
    /// The live document equals the baseline. Exporting stamps both with
    /// the same `meta.lastTouchedAt`, so it stays in this state.
    Saved,
    /// The live document changed after the last commit.
    Modified,
}

impl std::fmt::Display for CacheState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Empty => "empty",
            Self::Saved => "saved",
            Self::Modified => "modified",
        })
    }
}

/// Holds the last committed copy of the document.
///
/// State is flag based: any accepted mutation after a commit counts as a
/// modification, even one that happens to restore the baseline's values.
#[derive(Debug, Clone, Default)]
pub struct CacheTracker {
    baseline: Option<ConfigDocument>,
    committed_at: Option<String>,
    modified: bool,
}

impl CacheTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CacheState {
        match (&self.baseline, self.modified) {
            (None, _) => CacheState::Empty,
            (Some(_), false) => CacheState::Saved,
            (Some(_), true) => CacheState::Modified,
        }
    }

    pub fn baseline(&self) -> Option<&ConfigDocument> {
        self.baseline.as_ref()
    }

    /// ISO-8601 time of the last commit.
    pub fn committed_at(&self) -> Option<&str> {
        self.committed_at.as_deref()
    }

    /// Record a deep copy of `doc` as the new baseline.
    pub fn commit(&mut self, doc: &ConfigDocument) {
        self.commit_at(doc, now_iso8601());
    }

    pub fn commit_at(&mut self, doc: &ConfigDocument, committed_at: String) {
        self.baseline = Some(doc.clone());
        self.committed_at = Some(committed_at);
        self.modified = false;
        debug!("Baseline committed");
    }

    /// Called after every accepted mutation of the live document.
    pub fn note_mutation(&mut self) {
        if self.baseline.is_some() {
            self.modified = true;
        }
    }

    /// Copy an export stamp into the baseline while the live document still
    /// matches it.
    pub fn stamp_baseline(&mut self, last_touched_at: &str) {
        if self.modified {
            return;
        }
        if let Some(baseline) = self.baseline.as_mut() {
            baseline.meta.last_touched_at = Some(last_touched_at.to_string());
        }
    }

    /// A copy of the baseline to become the live document again.
    pub fn revert(&mut self) -> Result<ConfigDocument> {
        let baseline = self.baseline.as_ref().ok_or_else(|| {
            warn!("Revert requested with no committed snapshot");
            EditorError::NoBaseline
        })?;
        let doc = baseline.clone();
        self.modified = false;
        Ok(doc)
    }
}

// ============================================================================
// Persisted snapshot
// ============================================================================

/// A baseline saved to durable storage by an earlier session.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSnapshot {
    pub document: ConfigDocument,
    pub committed_at: Option<String>,
}

impl PersistedSnapshot {
    /// Read the stored snapshot, if any.
    pub fn load(store: &dyn KeyValueStore) -> Result<Option<Self>> {
        let Some(text) = store.get(SNAPSHOT_DOCUMENT_KEY)? else {
            return Ok(None);
        };
        let document = codec::deserialize(&text)?;
        let committed_at = store.get(SNAPSHOT_TIME_KEY)?;
        Ok(Some(Self {
            document,
            committed_at,
        }))
    }

    /// Write both entries. If the second write fails the first one is
    /// rolled back so the pair stays consistent.
    pub fn save(
        store: &mut dyn KeyValueStore,
        doc: &ConfigDocument,
        committed_at: &str,
    ) -> Result<()> {
        let text = codec::serialize(doc)?;
        let previous = store.get(SNAPSHOT_DOCUMENT_KEY)?;
        store.set(SNAPSHOT_DOCUMENT_KEY, &text)?;
        if let Err(e) = store.set(SNAPSHOT_TIME_KEY, committed_at) {
            let rollback = match previous {
                Some(text) => store.set(SNAPSHOT_DOCUMENT_KEY, &text),
                None => store.remove(SNAPSHOT_DOCUMENT_KEY),
            };
            if let Err(rollback_err) = rollback {
                warn!("Failed to roll back snapshot document: {rollback_err}");
            }
            return Err(e);
        }
        Ok(())
    }
}
