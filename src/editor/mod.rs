//! The editor engine: one live document, its baseline, and every operation
//! a host can perform on them.
//!
//! [`Editor`] is the root controller. It owns the document store, the cache
//! tracker, durable storage and the load sequencer, and is the only path
//! through which the document changes. Each accepted mutation is reported to
//! the tracker; a rejected one leaves both untouched.

pub mod cache;
pub mod commands;
pub mod document;
pub mod loader;
mod references;
pub mod sync;

pub use cache::{CacheState, CacheTracker, PersistedSnapshot};
pub use commands::{default_base_path, generate_commands, ShellCommand};
pub use document::{
    generate_gateway_token, AgentDefaultField, ChannelFields, DocumentModel, GatewayField,
    ModelFields, ModelSlot, ProviderFields,
};
pub use loader::{DocumentSource, ExampleSource, FileSource, LoadSequencer, LoadTicket, TextSource};
pub use sync::{FieldMutation, FormField, RawTextController, RawTextStatus};

use crate::codec;
use crate::config::{
    find_dangling_references, now_iso8601, validate_document, ChannelConfig, ChannelKind,
    ConfigDocument, ConfigValidationError, DanglingReference, ModelDefinition, ModelRef,
    ProviderConfig, CONFIG_FILE_NAME,
};
use crate::error::Result;
use crate::storage::{KeyValueStore, ThemePreference};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Result of presenting a completed load to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The document was replaced and committed as the new baseline.
    Applied,
    /// A later-issued load already replaced the document.
    Superseded,
    /// A best-effort source had nothing to offer.
    Unavailable,
}

/// Result of offering a persisted snapshot at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    NoSnapshot,
    Declined,
    Restored,
}

/// A downloadable copy of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub file_name: &'static str,
    pub contents: String,
}

pub struct Editor {
    model: DocumentModel,
    tracker: CacheTracker,
    store: Box<dyn KeyValueStore>,
    loads: LoadSequencer,
}

impl Editor {
    /// Start from the built-in template with nothing committed.
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self::with_document(ConfigDocument::template(), store)
    }

    pub fn with_document(doc: ConfigDocument, store: Box<dyn KeyValueStore>) -> Self {
        Self {
            model: DocumentModel::new(doc),
            tracker: CacheTracker::new(),
            store,
            loads: LoadSequencer::new(),
        }
    }

    pub fn document(&self) -> &ConfigDocument {
        self.model.document()
    }

    pub fn cache_state(&self) -> CacheState {
        self.tracker.state()
    }

    pub fn tracker(&self) -> &CacheTracker {
        &self.tracker
    }

    fn mutate<T>(&mut self, op: impl FnOnce(&mut DocumentModel) -> Result<T>) -> Result<T> {
        match op(&mut self.model) {
            Ok(value) => {
                self.tracker.note_mutation();
                Ok(value)
            }
            Err(e) => {
                warn!("Change rejected: {e}");
                Err(e)
            }
        }
    }

    // ========================================================================
    // Providers and models
    // ========================================================================

    pub fn upsert_provider(&mut self, name: &str, fields: ProviderFields) -> Result<()> {
        self.mutate(|m| m.upsert_provider(name, fields))
    }

    /// Save the provider form: add when `editing` is `None`, otherwise
    /// update the provider being edited, renaming it first if the name
    /// changed. Either everything applies or nothing does.
    pub fn save_provider(
        &mut self,
        editing: Option<&str>,
        name: &str,
        fields: ProviderFields,
    ) -> Result<()> {
        match editing {
            Some(old) if old != name.trim() => self.mutate(|m| {
                let mut next = m.clone();
                next.rename_provider(old, name)?;
                next.upsert_provider(name, fields)?;
                *m = next;
                Ok(())
            }),
            _ => self.upsert_provider(name, fields),
        }
    }

    pub fn rename_provider(&mut self, old: &str, new: &str) -> Result<()> {
        self.mutate(|m| m.rename_provider(old, new))
    }

    pub fn remove_provider(&mut self, name: &str) -> Result<ProviderConfig> {
        let removed = self.mutate(|m| m.remove_provider(name))?;
        let dangling = self.dangling_references();
        if !dangling.is_empty() {
            warn!(
                provider = name,
                count = dangling.len(),
                "Provider removed; some model references no longer resolve"
            );
        }
        Ok(removed)
    }

    pub fn upsert_model(
        &mut self,
        provider: &str,
        slot: ModelSlot,
        fields: ModelFields,
    ) -> Result<()> {
        self.mutate(|m| m.upsert_model(provider, slot, fields))
    }

    pub fn remove_model(&mut self, provider: &str, index: usize) -> Result<ModelDefinition> {
        self.mutate(|m| m.remove_model(provider, index))
    }

    /// Catalogue for model selectors.
    pub fn all_models(&self) -> Vec<ModelRef> {
        self.document().all_models()
    }

    // ========================================================================
    // Channels
    // ========================================================================

    pub fn upsert_channel(&mut self, kind: ChannelKind, fields: ChannelFields) -> Result<()> {
        self.mutate(|m| m.upsert_channel(kind, fields))
    }

    pub fn remove_channel(&mut self, kind: ChannelKind) -> Result<ChannelConfig> {
        self.mutate(|m| m.remove_channel(kind))
    }

    pub fn set_channel_enabled(&mut self, kind: ChannelKind, enabled: bool) -> Result<()> {
        self.mutate(|m| m.set_channel_enabled(kind, enabled))
    }

    // ========================================================================
    // Agent defaults and gateway
    // ========================================================================

    pub fn set_agent_default(&mut self, field: AgentDefaultField) -> Result<()> {
        self.mutate(|m| m.set_agent_default(field))
    }

    pub fn set_gateway(&mut self, field: GatewayField) -> Result<()> {
        self.mutate(|m| m.set_gateway(field))
    }

    /// Apply a structured input's committed value.
    pub fn commit_field(&mut self, field: FormField, raw: &str) -> Result<()> {
        match field.parse(raw)? {
            FieldMutation::Agent(update) => self.set_agent_default(update),
            FieldMutation::Gateway(update) => self.set_gateway(update),
        }
    }

    pub fn add_fallback(&mut self) -> usize {
        let index = self.model.add_fallback();
        self.tracker.note_mutation();
        index
    }

    pub fn set_fallback(&mut self, index: usize, id: String) -> Result<()> {
        self.mutate(|m| m.set_fallback(index, id))
    }

    pub fn remove_fallback(&mut self, index: usize) -> Result<String> {
        self.mutate(|m| m.remove_fallback(index))
    }

    pub fn set_model_alias(&mut self, id: &str, value: Value) -> Result<()> {
        self.mutate(|m| m.set_model_alias(id, value))
    }

    pub fn remove_model_alias(&mut self, id: &str) -> Option<Value> {
        let removed = self.model.remove_model_alias(id);
        if removed.is_some() {
            self.tracker.note_mutation();
        }
        removed
    }

    /// Replace the gateway token with a freshly generated one.
    pub fn rotate_gateway_token(&mut self) -> Result<String> {
        let token = generate_gateway_token();
        self.set_gateway(GatewayField::AuthToken(token.clone()))?;
        info!("Generated a new gateway auth token");
        Ok(token)
    }

    /// Swap in a whole document without committing it.
    pub fn replace_document(&mut self, doc: ConfigDocument) {
        self.model.replace(doc);
        self.tracker.note_mutation();
    }

    // ========================================================================
    // Snapshots
    // ========================================================================

    /// Commit the live document as the baseline and persist it.
    ///
    /// Storage is written first; if that fails nothing changes.
    pub fn commit_snapshot(&mut self) -> Result<()> {
        let committed_at = now_iso8601();
        PersistedSnapshot::save(self.store.as_mut(), self.model.document(), &committed_at)?;
        self.tracker.commit_at(self.model.document(), committed_at);
        info!("Snapshot saved");
        Ok(())
    }

    /// Restore the baseline. Without one this is a warning and a no-op.
    pub fn revert(&mut self) -> Result<()> {
        let doc = self.tracker.revert()?;
        self.model.replace(doc);
        info!("Reverted to the saved snapshot");
        Ok(())
    }

    pub fn persisted_snapshot(&self) -> Result<Option<PersistedSnapshot>> {
        PersistedSnapshot::load(self.store.as_ref())
    }

    /// Offer a snapshot from an earlier session. It is applied only if
    /// `confirm` accepts it.
    pub fn offer_restore(
        &mut self,
        confirm: impl FnOnce(&PersistedSnapshot) -> bool,
    ) -> Result<RestoreOutcome> {
        let Some(snapshot) = self.persisted_snapshot()? else {
            return Ok(RestoreOutcome::NoSnapshot);
        };
        if !confirm(&snapshot) {
            debug!("Persisted snapshot declined");
            return Ok(RestoreOutcome::Declined);
        }

        let ticket = self.loads.issue();
        self.loads.accept(ticket);
        let committed_at = snapshot.committed_at.unwrap_or_else(now_iso8601);
        self.tracker.commit_at(&snapshot.document, committed_at);
        self.model.replace(snapshot.document);
        info!("Restored persisted snapshot");
        Ok(RestoreOutcome::Restored)
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Reserve a place in load order before starting I/O.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.loads.issue()
    }

    /// Apply a finished load if nothing newer has been applied since.
    ///
    /// A failed load leaves the document alone and returns its error.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<ConfigDocument>,
    ) -> Result<LoadOutcome> {
        let doc = result.map_err(|e| {
            warn!("Load failed: {e}");
            e
        })?;
        if !self.loads.accept(ticket) {
            debug!(?ticket, "Discarding superseded load");
            return Ok(LoadOutcome::Superseded);
        }
        self.tracker.commit(&doc);
        self.model.replace(doc);
        Ok(LoadOutcome::Applied)
    }

    pub async fn load_from(&mut self, source: &dyn DocumentSource) -> Result<LoadOutcome> {
        let ticket = self.begin_load();
        let result = source.load().await;
        let outcome = self.complete_load(ticket, result)?;
        if outcome == LoadOutcome::Applied {
            info!("Loaded configuration from {}", source.describe());
        }
        Ok(outcome)
    }

    /// Load the example document if it can be fetched; otherwise keep the
    /// current document.
    pub async fn load_example(&mut self, source: &ExampleSource) -> LoadOutcome {
        match self.load_from(source).await {
            Ok(outcome) => outcome,
            Err(e) => {
                info!("No example configuration available, using the template: {e}");
                LoadOutcome::Unavailable
            }
        }
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Stamp `meta.lastTouchedAt` and produce the canonical text.
    ///
    /// A saved baseline receives the same stamp, so exporting neither dirties
    /// the document nor gets undone by a later revert.
    pub fn export(&mut self) -> Result<Export> {
        let stamped = self.model.stamp_export();
        self.tracker.stamp_baseline(&stamped);
        Ok(Export {
            file_name: CONFIG_FILE_NAME,
            contents: codec::serialize(self.model.document())?,
        })
    }

    pub fn commands(&self, username: &str, base_path: &str) -> Result<Vec<ShellCommand>> {
        generate_commands(self.document(), username, base_path)
    }

    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        find_dangling_references(self.document())
    }

    pub fn validate(&self) -> Vec<ConfigValidationError> {
        validate_document(self.document())
    }

    // ========================================================================
    // Theme
    // ========================================================================

    pub fn theme(&self) -> ThemePreference {
        ThemePreference::load(self.store.as_ref())
    }

    pub fn set_theme(&mut self, theme: ThemePreference) -> Result<()> {
        theme.persist(self.store.as_mut())
    }

    pub fn toggle_theme(&mut self) -> Result<ThemePreference> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelApi;
    use crate::error::EditorError;
    use crate::storage::MemoryKeyValueStore;
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        Editor::new(Box::new(MemoryKeyValueStore::new()))
    }

    fn fields(url: &str) -> ProviderFields {
        ProviderFields {
            base_url: url.into(),
            api_key: "sk".into(),
            api: ModelApi::OpenaiCompletions,
        }
    }

    #[test]
    fn mutations_before_commit_stay_empty() {
        let mut e = editor();
        e.upsert_provider("acme", fields("u")).unwrap();
        assert_eq!(e.cache_state(), CacheState::Empty);
    }

    #[test]
    fn rejected_mutation_keeps_saved_state() {
        let mut e = editor();
        e.commit_snapshot().unwrap();
        assert!(e.upsert_provider("", fields("u")).is_err());
        assert_eq!(e.cache_state(), CacheState::Saved);
    }

    #[test]
    fn save_provider_renames_and_updates_together() {
        let mut e = editor();
        e.upsert_provider("acme", fields("u1")).unwrap();
        let gpt = ModelFields::from_form("gpt", "", true, true, "", "");
        e.upsert_model("acme", ModelSlot::Append, gpt).unwrap();
        e.set_agent_default(AgentDefaultField::PrimaryModel("acme/gpt".into()))
            .unwrap();

        e.save_provider(Some("acme"), "acme2", fields("u2")).unwrap();
        let doc = e.document();
        assert_eq!(doc.provider("acme2").unwrap().base_url, "u2");
        assert_eq!(doc.provider("acme2").unwrap().models.len(), 1);
        assert_eq!(doc.agents.defaults.model.primary, "acme2/gpt");
    }

    #[test]
    fn save_provider_is_atomic() {
        let mut e = editor();
        e.upsert_provider("acme", fields("u1")).unwrap();
        let before = e.document().clone();

        // Rename would succeed but the fields are invalid.
        assert!(e.save_provider(Some("acme"), "acme2", fields("")).is_err());
        assert_eq!(e.document(), &before);
    }

    #[test]
    fn commit_field_routes_to_the_document() {
        let mut e = editor();
        e.commit_field(FormField::GatewayPort, "19000").unwrap();
        e.commit_field(FormField::Workspace, "/srv/ws").unwrap();
        assert_eq!(e.document().gateway.port, 19000);
        assert_eq!(e.document().agents.defaults.workspace, "/srv/ws");
        assert!(e.commit_field(FormField::GatewayBind, "moon").is_err());
    }

    #[test]
    fn restore_requires_confirmation() {
        let mut e = editor();
        assert_eq!(e.offer_restore(|_| true).unwrap(), RestoreOutcome::NoSnapshot);

        e.set_gateway(GatewayField::Port(19999)).unwrap();
        e.commit_snapshot().unwrap();
        e.replace_document(ConfigDocument::template());

        assert_eq!(e.offer_restore(|_| false).unwrap(), RestoreOutcome::Declined);
        assert_eq!(e.document().gateway.port, 18789);

        assert_eq!(e.offer_restore(|_| true).unwrap(), RestoreOutcome::Restored);
        assert_eq!(e.document().gateway.port, 19999);
        assert_eq!(e.cache_state(), CacheState::Saved);
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut e = editor();
        let slow = e.begin_load();
        let fast = e.begin_load();

        let mut newer = ConfigDocument::template();
        newer.gateway.port = 20001;
        let mut older = ConfigDocument::template();
        older.gateway.port = 20000;

        assert_eq!(e.complete_load(fast, Ok(newer)).unwrap(), LoadOutcome::Applied);
        assert_eq!(e.complete_load(slow, Ok(older)).unwrap(), LoadOutcome::Superseded);
        assert_eq!(e.document().gateway.port, 20001);
        assert_eq!(e.cache_state(), CacheState::Saved);
    }

    #[test]
    fn failed_load_changes_nothing() {
        let mut e = editor();
        let before = e.document().clone();
        let ticket = e.begin_load();
        let err = e
            .complete_load(ticket, Err(EditorError::Parse { message: "bad".into() }))
            .unwrap_err();
        assert!(matches!(err, EditorError::Parse { .. }));
        assert_eq!(e.document(), &before);
        assert_eq!(e.cache_state(), CacheState::Empty);
    }

    #[test]
    fn export_stamps_meta_without_dirtying() {
        let mut e = editor();
        e.commit_snapshot().unwrap();
        let export = e.export().unwrap();
        assert_eq!(export.file_name, "openclaw.json");
        assert_eq!(codec::deserialize(&export.contents).unwrap(), *e.document());
        assert_eq!(e.cache_state(), CacheState::Saved);
        assert_eq!(e.tracker().baseline(), Some(e.document()));
    }

    #[test]
    fn revert_after_export_keeps_the_stamp() {
        let mut e = editor();
        e.commit_snapshot().unwrap();
        e.export().unwrap();
        let stamped = e.document().meta.last_touched_at.clone();
        assert!(stamped.is_some());

        e.upsert_provider("acme", fields("u")).unwrap();
        assert_eq!(e.cache_state(), CacheState::Modified);
        e.revert().unwrap();
        assert_eq!(e.document().meta.last_touched_at, stamped);
        assert!(e.document().provider("acme").is_none());
    }

    #[test]
    fn rotate_token_sets_gateway_auth() {
        let mut e = editor();
        let token = e.rotate_gateway_token().unwrap();
        assert_eq!(e.document().gateway.auth.token, token);
    }

    #[test]
    fn theme_toggle_persists() {
        let mut e = editor();
        assert_eq!(e.theme(), ThemePreference::Dark);
        assert_eq!(e.toggle_theme().unwrap(), ThemePreference::Light);
        assert_eq!(e.theme(), ThemePreference::Light);
    }
}
