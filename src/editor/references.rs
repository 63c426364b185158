//! Operations that must keep cross-references consistent.
//!
//! A provider name is embedded in every `provider/model` id under
//! `agents.defaults`, and every channel has a twin entry under
//! `plugins.entries`. The mutations here update all views in one step.

use super::document::{ChannelFields, DocumentModel};
use crate::config::{
    model_under_provider, ChannelConfig, ChannelKind, DmPolicy, GroupPolicy, PluginEntry,
    StreamMode,
};
use crate::error::{EditorError, Result};
use indexmap::IndexMap;
use tracing::{debug, info};

/// Rewrite `old/<rest>` to `new/<rest>`; anything else is returned as is.
fn rewrite_prefix(reference: &str, old: &str, new: &str) -> Option<String> {
    model_under_provider(reference, old).map(|rest| format!("{new}/{rest}"))
}

impl DocumentModel {
    // ------------------------------------------------------------------
    // Providers
    // ------------------------------------------------------------------

    /// Rename a provider and rewrite every agent-default reference to it.
    ///
    /// The provider keeps its position among the providers. Alias keys that
    /// collide after rewriting keep the value of the later key.
    pub fn rename_provider(&mut self, old: &str, new: &str) -> Result<()> {
        let new = new.trim();
        if !self.document().models.providers.contains_key(old) {
            return Err(EditorError::ProviderNotFound(old.to_string()));
        }
        if new.is_empty() {
            return Err(EditorError::validation("name", "Provider name is required"));
        }
        if new == old {
            return Ok(());
        }
        if self.document().models.providers.contains_key(new) {
            return Err(EditorError::ProviderExists(new.to_string()));
        }

        let doc = self.document_mut();

        let providers = std::mem::take(&mut doc.models.providers);
        doc.models.providers = providers
            .into_iter()
            .map(|(name, provider)| {
                if name == old {
                    (new.to_string(), provider)
                } else {
                    (name, provider)
                }
            })
            .collect();

        let selection = &mut doc.agents.defaults.model;
        if let Some(primary) = rewrite_prefix(&selection.primary, old, new) {
            selection.primary = primary;
        }
        for fallback in selection.fallbacks.iter_mut() {
            if let Some(rewritten) = rewrite_prefix(fallback, old, new) {
                *fallback = rewritten;
            }
        }

        let aliases = std::mem::take(&mut doc.agents.defaults.models);
        let mut rewritten = IndexMap::with_capacity(aliases.len());
        for (id, value) in aliases {
            let id = rewrite_prefix(&id, old, new).unwrap_or(id);
            rewritten.insert(id, value);
        }
        doc.agents.defaults.models = rewritten;

        info!(from = old, to = new, "Provider renamed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Channels
    // ------------------------------------------------------------------

    /// Create or replace a channel registration and its plugin entry.
    ///
    /// Policies are reset to pairing / allowlist / partial. Keys this editor
    /// does not model are kept on both entries.
    pub fn upsert_channel(&mut self, kind: ChannelKind, fields: ChannelFields) -> Result<()> {
        let bot_token = fields.bot_token.trim();
        if bot_token.is_empty() {
            return Err(EditorError::validation(
                format!("channels.{kind}.botToken"),
                "Bot token is required",
            ));
        }
        let proxy = fields
            .proxy
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string);

        let doc = self.document_mut();
        let extra = doc
            .channels
            .entries
            .get(kind.as_str())
            .map(|existing| existing.extra.clone())
            .unwrap_or_default();
        doc.channels.entries.insert(
            kind.as_str().to_string(),
            ChannelConfig {
                enabled: fields.enabled,
                dm_policy: Some(DmPolicy::Pairing),
                bot_token: Some(bot_token.to_string()),
                allow_from: Some(fields.allow_from),
                group_policy: Some(GroupPolicy::Allowlist),
                stream_mode: Some(StreamMode::Partial),
                proxy,
                extra,
            },
        );
        doc.plugins
            .entries
            .entry(kind.as_str().to_string())
            .and_modify(|entry| entry.enabled = fields.enabled)
            .or_insert_with(|| PluginEntry {
                enabled: fields.enabled,
                extra: Default::default(),
            });
        debug!(channel = %kind, enabled = fields.enabled, "Channel saved");
        Ok(())
    }

    /// Remove a channel and its plugin entry.
    pub fn remove_channel(&mut self, kind: ChannelKind) -> Result<ChannelConfig> {
        let doc = self.document_mut();
        let removed = doc
            .channels
            .entries
            .shift_remove(kind.as_str())
            .ok_or_else(|| EditorError::ChannelNotFound(kind.to_string()))?;
        doc.plugins.entries.shift_remove(kind.as_str());
        debug!(channel = %kind, "Channel removed");
        Ok(removed)
    }

    /// Flip a registered channel on or off in both views.
    pub fn set_channel_enabled(&mut self, kind: ChannelKind, enabled: bool) -> Result<()> {
        let doc = self.document_mut();
        let channel = doc
            .channels
            .entries
            .get_mut(kind.as_str())
            .ok_or_else(|| EditorError::ChannelNotFound(kind.to_string()))?;
        channel.enabled = enabled;
        doc.plugins
            .entries
            .entry(kind.as_str().to_string())
            .and_modify(|entry| entry.enabled = enabled)
            .or_insert_with(|| PluginEntry {
                enabled,
                extra: Default::default(),
            });
        Ok(())
    }
}
