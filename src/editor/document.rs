//! The live configuration document and its structural mutations.
//!
//! Every mutation validates its input first and only then touches the tree,
//! so a rejected call leaves the document exactly as it was.

use crate::config::{
    now_iso8601, AllowFromEntry, ConfigDocument, GatewayAuthMode, GatewayBindMode,
    GatewayTailscaleMode, InputModality, ModelApi, ModelCost, ModelDefinition, ProviderConfig,
    SandboxSettings, DEFAULT_CONTEXT_WINDOW, DEFAULT_MAX_TOKENS, GATEWAY_TOKEN_LENGTH,
};
use crate::error::{EditorError, Result};
use rand::Rng;
use serde_json::Value;
use tracing::debug;

const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A fresh random gateway auth token of lowercase letters and digits.
pub fn generate_gateway_token() -> String {
    let mut rng = rand::thread_rng();
    (0..GATEWAY_TOKEN_LENGTH)
        .map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

/// Connection settings entered for a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFields {
    pub base_url: String,
    pub api_key: String,
    pub api: ModelApi,
}

impl ProviderFields {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(EditorError::validation("baseUrl", "API base URL is required"));
        }
        if self.api_key.trim().is_empty() {
            return Err(EditorError::validation("apiKey", "API key is required"));
        }
        Ok(())
    }
}

/// Where `upsert_model` writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSlot {
    Append,
    Index(usize),
}

/// Model settings entered for a provider's model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFields {
    pub id: String,
    /// Display name; empty means "same as id".
    pub name: String,
    pub reasoning: bool,
    pub vision: bool,
    pub context_window: u64,
    pub max_tokens: u64,
}

impl Default for ModelFields {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            reasoning: true,
            vision: true,
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Settings entered for a messaging channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFields {
    pub enabled: bool,
    pub bot_token: String,
    pub allow_from: Vec<AllowFromEntry>,
    pub proxy: Option<String>,
}

impl ChannelFields {
    /// Parse a comma-separated allow list; blank segments are dropped.
    pub fn parse_allow_from(text: &str) -> Vec<AllowFromEntry> {
        text.split(',')
            .filter(|segment| !segment.trim().is_empty())
            .map(AllowFromEntry::parse)
            .collect()
    }
}

/// A single agent-defaults field and its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentDefaultField {
    PrimaryModel(String),
    Workspace(String),
    MaxConcurrent(u32),
    SubagentMaxConcurrent(u32),
    /// `None` (or an empty mode) removes the sandbox section.
    SandboxMode(Option<String>),
}

/// A single gateway field and its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayField {
    Port(u16),
    Mode(String),
    Bind(GatewayBindMode),
    AuthMode(GatewayAuthMode),
    AuthToken(String),
    TailscaleMode(GatewayTailscaleMode),
    TailscaleResetOnExit(bool),
}

/// Owner of the live document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentModel {
    doc: ConfigDocument,
}

impl DocumentModel {
    pub fn new(doc: ConfigDocument) -> Self {
        Self { doc }
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut ConfigDocument {
        &mut self.doc
    }

    /// Swap in a whole new document, returning the previous one.
    pub fn replace(&mut self, doc: ConfigDocument) -> ConfigDocument {
        std::mem::replace(&mut self.doc, doc)
    }

    // ------------------------------------------------------------------
    // Providers
    // ------------------------------------------------------------------

    /// Create a provider or update an existing one's connection settings.
    /// Models of an existing provider are kept.
    pub fn upsert_provider(&mut self, name: &str, fields: ProviderFields) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditorError::validation("name", "Provider name is required"));
        }
        fields.validate()?;

        let provider = self
            .doc
            .models
            .providers
            .entry(name.to_string())
            .or_insert_with(ProviderConfig::default);
        provider.base_url = fields.base_url.trim().to_string();
        provider.api_key = fields.api_key.trim().to_string();
        provider.api = fields.api;
        debug!(provider = name, "Provider saved");
        Ok(())
    }

    /// Delete a provider together with its models.
    ///
    /// Agent-default references to those models are left in place and show
    /// up as dangling references.
    pub fn remove_provider(&mut self, name: &str) -> Result<ProviderConfig> {
        self.doc
            .models
            .providers
            .shift_remove(name)
            .ok_or_else(|| EditorError::ProviderNotFound(name.to_string()))
    }

    // ------------------------------------------------------------------
    // Models
    // ------------------------------------------------------------------

    pub fn upsert_model(
        &mut self,
        provider: &str,
        slot: ModelSlot,
        fields: ModelFields,
    ) -> Result<()> {
        let id = fields.id.trim();
        if id.is_empty() {
            return Err(EditorError::validation("id", "Model id is required"));
        }
        if fields.context_window == 0 {
            return Err(EditorError::validation(
                "contextWindow",
                "Context window must be greater than 0",
            ));
        }
        if fields.max_tokens == 0 {
            return Err(EditorError::validation(
                "maxTokens",
                "Max tokens must be greater than 0",
            ));
        }

        let models = &mut self
            .doc
            .models
            .providers
            .get_mut(provider)
            .ok_or_else(|| EditorError::ProviderNotFound(provider.to_string()))?
            .models;

        if let ModelSlot::Index(index) = slot {
            if index >= models.len() {
                return Err(EditorError::ModelNotFound {
                    provider: provider.to_string(),
                    index,
                });
            }
        }
        let clashes = models.iter().enumerate().any(|(i, m)| {
            m.id == id && slot != ModelSlot::Index(i)
        });
        if clashes {
            return Err(EditorError::validation(
                format!("models.providers.{provider}.models"),
                format!("Model id \"{id}\" already exists"),
            ));
        }

        let name = match fields.name.trim() {
            "" => id.to_string(),
            name => name.to_string(),
        };
        let input = if fields.vision {
            vec![InputModality::Text, InputModality::Image]
        } else {
            vec![InputModality::Text]
        };

        match slot {
            ModelSlot::Append => models.push(ModelDefinition {
                id: id.to_string(),
                name,
                reasoning: fields.reasoning,
                input,
                cost: ModelCost::default(),
                context_window: fields.context_window,
                max_tokens: fields.max_tokens,
                extra: Default::default(),
            }),
            ModelSlot::Index(index) => {
                let model = &mut models[index];
                model.id = id.to_string();
                model.name = name;
                model.reasoning = fields.reasoning;
                model.input = input;
                model.context_window = fields.context_window;
                model.max_tokens = fields.max_tokens;
            }
        }
        Ok(())
    }

    pub fn remove_model(&mut self, provider: &str, index: usize) -> Result<ModelDefinition> {
        let models = &mut self
            .doc
            .models
            .providers
            .get_mut(provider)
            .ok_or_else(|| EditorError::ProviderNotFound(provider.to_string()))?
            .models;
        if index >= models.len() {
            return Err(EditorError::ModelNotFound {
                provider: provider.to_string(),
                index,
            });
        }
        Ok(models.remove(index))
    }

    // ------------------------------------------------------------------
    // Agent defaults
    // ------------------------------------------------------------------

    pub fn set_agent_default(&mut self, field: AgentDefaultField) -> Result<()> {
        let defaults = &mut self.doc.agents.defaults;
        match field {
            AgentDefaultField::PrimaryModel(id) => defaults.model.primary = id,
            AgentDefaultField::Workspace(path) => defaults.workspace = path,
            AgentDefaultField::MaxConcurrent(0) | AgentDefaultField::SubagentMaxConcurrent(0) => {
                return Err(EditorError::validation(
                    "agents.defaults",
                    "Concurrency must be greater than 0",
                ));
            }
            AgentDefaultField::MaxConcurrent(n) => defaults.max_concurrent = n,
            AgentDefaultField::SubagentMaxConcurrent(n) => defaults.subagents.max_concurrent = n,
            AgentDefaultField::SandboxMode(mode) => match mode.filter(|m| !m.is_empty()) {
                Some(mode) => {
                    defaults
                        .sandbox
                        .get_or_insert_with(SandboxSettings::default)
                        .mode = mode;
                }
                None => defaults.sandbox = None,
            },
        }
        Ok(())
    }

    /// Append an empty fallback slot to be filled in later.
    pub fn add_fallback(&mut self) -> usize {
        let fallbacks = &mut self.doc.agents.defaults.model.fallbacks;
        fallbacks.push(String::new());
        fallbacks.len() - 1
    }

    pub fn set_fallback(&mut self, index: usize, id: String) -> Result<()> {
        let slot = self
            .doc
            .agents
            .defaults
            .model
            .fallbacks
            .get_mut(index)
            .ok_or(EditorError::FallbackNotFound(index))?;
        *slot = id;
        Ok(())
    }

    pub fn remove_fallback(&mut self, index: usize) -> Result<String> {
        let fallbacks = &mut self.doc.agents.defaults.model.fallbacks;
        if index >= fallbacks.len() {
            return Err(EditorError::FallbackNotFound(index));
        }
        Ok(fallbacks.remove(index))
    }

    pub fn set_model_alias(&mut self, id: &str, value: Value) -> Result<()> {
        if id.trim().is_empty() {
            return Err(EditorError::validation(
                "agents.defaults.models",
                "Model id is required",
            ));
        }
        self.doc
            .agents
            .defaults
            .models
            .insert(id.trim().to_string(), value);
        Ok(())
    }

    pub fn remove_model_alias(&mut self, id: &str) -> Option<Value> {
        self.doc.agents.defaults.models.shift_remove(id)
    }

    // ------------------------------------------------------------------
    // Gateway
    // ------------------------------------------------------------------

    pub fn set_gateway(&mut self, field: GatewayField) -> Result<()> {
        let gateway = &mut self.doc.gateway;
        match field {
            GatewayField::Port(0) => {
                return Err(EditorError::validation(
                    "gateway.port",
                    "Port must be greater than 0",
                ));
            }
            GatewayField::Port(port) => gateway.port = port,
            GatewayField::Mode(mode) => gateway.mode = mode,
            GatewayField::Bind(bind) => gateway.bind = bind,
            GatewayField::AuthMode(mode) => gateway.auth.mode = mode,
            GatewayField::AuthToken(token) => gateway.auth.token = token,
            GatewayField::TailscaleMode(mode) => gateway.tailscale.mode = mode,
            GatewayField::TailscaleResetOnExit(reset) => gateway.tailscale.reset_on_exit = reset,
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Meta
    // ------------------------------------------------------------------

    /// Record an export time in `meta.lastTouchedAt` and return it.
    pub fn stamp_export(&mut self) -> String {
        let at = now_iso8601();
        self.doc.meta.last_touched_at = Some(at.clone());
        at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn acme() -> ProviderFields {
        ProviderFields {
            base_url: "https://api.acme.test/v1".into(),
            api_key: "sk-acme".into(),
            api: ModelApi::OpenaiCompletions,
        }
    }

    fn model(id: &str) -> ModelFields {
        ModelFields {
            id: id.into(),
            ..ModelFields::default()
        }
    }

    fn with_provider() -> DocumentModel {
        let mut m = DocumentModel::new(ConfigDocument::template());
        m.upsert_provider("acme", acme()).unwrap();
        m
    }

    #[test]
    fn provider_requires_name_url_and_key() {
        let mut m = DocumentModel::new(ConfigDocument::template());
        let before = m.clone();

        assert!(m.upsert_provider("  ", acme()).is_err());
        let mut no_key = acme();
        no_key.api_key = " ".into();
        assert!(m.upsert_provider("acme", no_key).is_err());
        let mut no_url = acme();
        no_url.base_url.clear();
        assert!(m.upsert_provider("acme", no_url).is_err());

        assert_eq!(m, before);
    }

    #[test]
    fn provider_update_keeps_models() {
        let mut m = with_provider();
        m.upsert_model("acme", ModelSlot::Append, model("gpt")).unwrap();

        let mut fields = acme();
        fields.api = ModelApi::AnthropicMessages;
        m.upsert_provider("acme", fields).unwrap();

        let provider = m.document().provider("acme").unwrap();
        assert_eq!(provider.api, ModelApi::AnthropicMessages);
        assert_eq!(provider.models.len(), 1);
    }

    #[test]
    fn remove_provider_cascades_but_keeps_references() {
        let mut m = with_provider();
        m.upsert_model("acme", ModelSlot::Append, model("gpt")).unwrap();
        m.set_agent_default(AgentDefaultField::PrimaryModel("acme/gpt".into()))
            .unwrap();

        let removed = m.remove_provider("acme").unwrap();
        assert_eq!(removed.models.len(), 1);
        assert!(m.document().provider("acme").is_none());
        assert_eq!(m.document().agents.defaults.model.primary, "acme/gpt");
        assert!(matches!(
            m.remove_provider("acme"),
            Err(EditorError::ProviderNotFound(_))
        ));
    }

    #[test]
    fn model_defaults_and_vision() {
        let mut m = with_provider();
        let mut fields = model("mini");
        fields.vision = false;
        fields.reasoning = false;
        m.upsert_model("acme", ModelSlot::Append, fields).unwrap();

        let stored = &m.document().provider("acme").unwrap().models[0];
        assert_eq!(stored.name, "mini");
        assert_eq!(stored.input, vec![InputModality::Text]);
        assert!(!stored.reasoning);
        assert_eq!(stored.context_window, 200_000);
        assert_eq!(stored.max_tokens, 32_000);
        assert_eq!(stored.cost, ModelCost::default());
    }

    #[test]
    fn model_id_unique_within_provider() {
        let mut m = with_provider();
        m.upsert_model("acme", ModelSlot::Append, model("gpt")).unwrap();
        m.upsert_model("acme", ModelSlot::Append, model("mini")).unwrap();
        let before = m.clone();

        assert!(m.upsert_model("acme", ModelSlot::Append, model("gpt")).is_err());
        assert!(m.upsert_model("acme", ModelSlot::Index(1), model("gpt")).is_err());
        assert_eq!(m, before);

        // Re-saving a model under its own id is fine.
        let mut renamed = model("gpt");
        renamed.name = "GPT".into();
        m.upsert_model("acme", ModelSlot::Index(0), renamed).unwrap();
        assert_eq!(m.document().provider("acme").unwrap().models[0].name, "GPT");
    }

    #[test]
    fn model_limits_must_be_positive() {
        let mut m = with_provider();
        let mut fields = model("gpt");
        fields.context_window = 0;
        assert!(m.upsert_model("acme", ModelSlot::Append, fields).is_err());
        let mut fields = model("gpt");
        fields.max_tokens = 0;
        assert!(m.upsert_model("acme", ModelSlot::Append, fields).is_err());
    }

    #[test]
    fn model_errors_for_missing_targets() {
        let mut m = with_provider();
        assert!(matches!(
            m.upsert_model("nope", ModelSlot::Append, model("gpt")),
            Err(EditorError::ProviderNotFound(_))
        ));
        assert!(matches!(
            m.upsert_model("acme", ModelSlot::Index(3), model("gpt")),
            Err(EditorError::ModelNotFound { index: 3, .. })
        ));
        assert!(m.remove_model("acme", 0).is_err());
    }

    #[test]
    fn fallbacks_editing() {
        let mut m = DocumentModel::default();
        assert_eq!(m.add_fallback(), 0);
        assert_eq!(m.add_fallback(), 1);
        m.set_fallback(1, "acme/gpt".into()).unwrap();
        assert_eq!(
            m.document().agents.defaults.model.fallbacks,
            vec!["".to_string(), "acme/gpt".to_string()]
        );
        assert_eq!(m.remove_fallback(0).unwrap(), "");
        assert!(m.set_fallback(5, "x".into()).is_err());
    }

    #[test]
    fn sandbox_mode_set_and_cleared() {
        let mut m = DocumentModel::default();
        m.set_agent_default(AgentDefaultField::SandboxMode(Some("all".into())))
            .unwrap();
        assert_eq!(
            m.document().agents.defaults.sandbox.as_ref().unwrap().mode,
            "all"
        );
        m.set_agent_default(AgentDefaultField::SandboxMode(Some(String::new())))
            .unwrap();
        assert!(m.document().agents.defaults.sandbox.is_none());
    }

    #[test]
    fn zero_values_rejected() {
        let mut m = DocumentModel::default();
        assert!(m.set_gateway(GatewayField::Port(0)).is_err());
        assert!(m
            .set_agent_default(AgentDefaultField::MaxConcurrent(0))
            .is_err());
        assert_eq!(m, DocumentModel::default());
    }

    #[test]
    fn gateway_fields() {
        let mut m = DocumentModel::default();
        m.set_gateway(GatewayField::Port(19000)).unwrap();
        m.set_gateway(GatewayField::Bind(GatewayBindMode::Lan)).unwrap();
        m.set_gateway(GatewayField::AuthToken("t".into())).unwrap();
        let gw = &m.document().gateway;
        assert_eq!(gw.port, 19000);
        assert_eq!(gw.bind, GatewayBindMode::Lan);
        assert_eq!(gw.auth.token, "t");
    }

    #[test]
    fn allow_from_text() {
        assert_eq!(
            ChannelFields::parse_allow_from("123, @bob, ,456"),
            vec![
                AllowFromEntry::Id(123),
                AllowFromEntry::Handle("@bob".into()),
                AllowFromEntry::Id(456)
            ]
        );
        assert!(ChannelFields::parse_allow_from("").is_empty());
    }

    #[test]
    fn gateway_token_shape() {
        let token = generate_gateway_token();
        assert_eq!(token.len(), 48);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(token, generate_gateway_token());
    }

    #[test]
    fn aliases() {
        let mut m = DocumentModel::default();
        m.set_model_alias("acme/gpt", serde_json::json!({"alias": "g"}))
            .unwrap();
        assert!(m.set_model_alias(" ", Value::Null).is_err());
        assert!(m.remove_model_alias("acme/gpt").is_some());
        assert!(m.document().agents.defaults.models.is_empty());
    }
}
