use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EditorError;

use super::defaults::{
    DEFAULT_AGENT_MAX_CONCURRENT, DEFAULT_CONTEXT_WINDOW, DEFAULT_GATEWAY_MODE,
    DEFAULT_GATEWAY_PORT, DEFAULT_MAX_TOKENS, DEFAULT_SUBAGENT_MAX_CONCURRENT,
};

/// Keys a section does not model. Kept verbatim so that a loaded document
/// round-trips without losing data.
pub type Extra = Map<String, Value>;

/// Root of an `openclaw.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    #[serde(default)]
    pub meta: MetaSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wizard: Option<WizardSection>,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub models: ModelsSection,
    #[serde(default)]
    pub agents: AgentsSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hooks: Option<Value>,
    #[serde(default)]
    pub channels: ChannelsSection,
    #[serde(default)]
    pub gateway: GatewaySection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Value>,
    #[serde(default)]
    pub plugins: PluginsSection,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            meta: MetaSection::default(),
            wizard: None,
            auth: AuthSection::default(),
            models: ModelsSection::default(),
            agents: AgentsSection::default(),
            messages: None,
            commands: None,
            hooks: None,
            channels: ChannelsSection::default(),
            gateway: GatewaySection::default(),
            skills: None,
            plugins: PluginsSection::default(),
            extra: Extra::new(),
        }
    }
}

// ============================================================================
// Meta / Wizard / Auth
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetaSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_touched_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_touched_at: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WizardSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run_mode: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthSection {
    #[serde(default)]
    pub profiles: IndexMap<String, Value>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ModelApi {
    #[default]
    OpenaiCompletions,
    OpenaiResponses,
    AnthropicMessages,
    GoogleGenerativeAi,
    GithubCopilot,
    BedrockConverseStream,
    Ollama,
}

impl std::str::FromStr for ModelApi {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai-completions" => Ok(Self::OpenaiCompletions),
            "openai-responses" => Ok(Self::OpenaiResponses),
            "anthropic-messages" => Ok(Self::AnthropicMessages),
            "google-generative-ai" => Ok(Self::GoogleGenerativeAi),
            "github-copilot" => Ok(Self::GithubCopilot),
            "bedrock-converse-stream" => Ok(Self::BedrockConverseStream),
            "ollama" => Ok(Self::Ollama),
            _ => Err(format!("invalid api mode: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputModality {
    Text,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModelCost {
    #[serde(default)]
    pub input: f64,
    #[serde(default)]
    pub output: f64,
    #[serde(default)]
    pub cache_read: f64,
    #[serde(default)]
    pub cache_write: f64,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reasoning: bool,
    #[serde(default = "default_input")]
    pub input: Vec<InputModality>,
    #[serde(default)]
    pub cost: ModelCost,
    #[serde(default = "default_context_window")]
    pub context_window: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u64,
    #[serde(flatten)]
    pub extra: Extra,
}

impl ModelDefinition {
    /// Display name, falling back to the id when no name is set.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn supports_images(&self) -> bool {
        self.input.contains(&InputModality::Image)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api: ModelApi,
    #[serde(default)]
    pub models: Vec<ModelDefinition>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModelsSection {
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ============================================================================
// Agent defaults
// ============================================================================

/// Primary model plus ordered fallbacks, both as `provider/model` ids.
///
/// Accepts the shorthand `"model": "provider/id"` on input and always writes
/// the detailed form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", from = "AgentModelRepr")]
pub struct AgentModelSelection {
    pub primary: String,
    pub fallbacks: Vec<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AgentModelRepr {
    Simple(String),
    Detailed(AgentModelDetail),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AgentModelDetail {
    #[serde(default)]
    primary: String,
    #[serde(default)]
    fallbacks: Vec<String>,
    #[serde(flatten)]
    extra: Extra,
}

impl From<AgentModelRepr> for AgentModelSelection {
    fn from(repr: AgentModelRepr) -> Self {
        match repr {
            AgentModelRepr::Simple(primary) => Self {
                primary,
                ..Self::default()
            },
            AgentModelRepr::Detailed(detail) => Self {
                primary: detail.primary,
                fallbacks: detail.fallbacks,
                extra: detail.extra,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubagentDefaults {
    #[serde(default = "default_subagent_max_concurrent")]
    pub max_concurrent: u32,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for SubagentDefaults {
    fn default() -> Self {
        Self {
            max_concurrent: DEFAULT_SUBAGENT_MAX_CONCURRENT,
            extra: Extra::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SandboxSettings {
    #[serde(default)]
    pub mode: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    #[serde(default)]
    pub model: AgentModelSelection,
    /// Per-model settings keyed by `provider/model` id (aliases, params).
    #[serde(default)]
    pub models: IndexMap<String, Value>,
    #[serde(default)]
    pub workspace: String,
    #[serde(default = "default_agent_max_concurrent")]
    pub max_concurrent: u32,
    #[serde(default)]
    pub subagents: SubagentDefaults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxSettings>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            model: AgentModelSelection::default(),
            models: IndexMap::new(),
            workspace: String::new(),
            max_concurrent: DEFAULT_AGENT_MAX_CONCURRENT,
            subagents: SubagentDefaults::default(),
            sandbox: None,
            extra: Extra::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AgentsSection {
    #[serde(default)]
    pub defaults: AgentDefaults,
    #[serde(flatten)]
    pub extra: Extra,
}

// ============================================================================
// Channels
// ============================================================================

/// Messaging platforms the editor can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Telegram,
    Discord,
    Slack,
    Whatsapp,
    Signal,
    Imessage,
}

impl ChannelKind {
    pub const ALL: &'static [ChannelKind] = &[
        ChannelKind::Telegram,
        ChannelKind::Discord,
        ChannelKind::Slack,
        ChannelKind::Whatsapp,
        ChannelKind::Signal,
        ChannelKind::Imessage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Telegram => "telegram",
            ChannelKind::Discord => "discord",
            ChannelKind::Slack => "slack",
            ChannelKind::Whatsapp => "whatsapp",
            ChannelKind::Signal => "signal",
            ChannelKind::Imessage => "imessage",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = EditorError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EditorError::InvalidChannelType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DmPolicy {
    #[default]
    Pairing,
    Allowlist,
    Open,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GroupPolicy {
    Open,
    Disabled,
    #[default]
    Allowlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    Off,
    #[default]
    Partial,
    Block,
}

/// A sender allowed to talk to a channel bot: numeric user id or handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AllowFromEntry {
    Id(i64),
    Handle(String),
}

impl AllowFromEntry {
    /// Parse one comma-separated segment: integers become ids.
    pub fn parse(segment: &str) -> Self {
        let trimmed = segment.trim();
        match trimmed.parse::<i64>() {
            Ok(id) => Self::Id(id),
            Err(_) => Self::Handle(trimmed.to_string()),
        }
    }
}

impl std::fmt::Display for AllowFromEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Handle(handle) => f.write_str(handle),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dm_policy: Option<DmPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_from: Option<Vec<AllowFromEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_policy: Option<GroupPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_mode: Option<StreamMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Settings shared by every channel. Not a channel itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_policy: Option<GroupPolicy>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// The `channels` object: the optional `defaults` block followed by one
/// entry per configured channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChannelsSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<ChannelDefaults>,
    #[serde(flatten)]
    pub entries: IndexMap<String, ChannelConfig>,
}

// ============================================================================
// Gateway
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayBindMode {
    #[default]
    Loopback,
    Lan,
    Auto,
    Custom,
    Tailnet,
}

impl std::str::FromStr for GatewayBindMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loopback" => Ok(Self::Loopback),
            "lan" => Ok(Self::Lan),
            "auto" => Ok(Self::Auto),
            "custom" => Ok(Self::Custom),
            "tailnet" => Ok(Self::Tailnet),
            _ => Err(format!("invalid bind mode: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayAuthMode {
    #[default]
    Token,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayTailscaleMode {
    #[default]
    Off,
    Serve,
    Funnel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAuth {
    #[serde(default)]
    pub mode: GatewayAuthMode,
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GatewayTailscale {
    #[serde(default)]
    pub mode: GatewayTailscaleMode,
    #[serde(default)]
    pub reset_on_exit: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewaySection {
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    #[serde(default = "default_gateway_mode")]
    pub mode: String,
    #[serde(default)]
    pub bind: GatewayBindMode,
    #[serde(default)]
    pub auth: GatewayAuth,
    #[serde(default)]
    pub tailscale: GatewayTailscale,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            port: DEFAULT_GATEWAY_PORT,
            mode: DEFAULT_GATEWAY_MODE.to_string(),
            bind: GatewayBindMode::Loopback,
            auth: GatewayAuth::default(),
            tailscale: GatewayTailscale::default(),
            extra: Extra::new(),
        }
    }
}

// ============================================================================
// Plugins
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PluginsSection {
    #[serde(default)]
    pub entries: IndexMap<String, PluginEntry>,
    #[serde(flatten)]
    pub extra: Extra,
}

// ============================================================================
// Model references
// ============================================================================

/// One entry of the model catalogue offered to the agent selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    /// Fully-qualified `provider/model` id.
    pub id: String,
    pub name: String,
    pub provider: String,
}

/// Build the fully-qualified `provider/model` identifier.
pub fn qualified_model_id(provider: &str, model_id: &str) -> String {
    format!("{provider}/{model_id}")
}

/// The model part of `reference` when it has the form `provider/...`.
/// Provider names may themselves contain `/`.
pub fn model_under_provider<'a>(reference: &'a str, provider: &str) -> Option<&'a str> {
    reference.strip_prefix(provider)?.strip_prefix('/')
}

impl ConfigDocument {
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.models.providers.get(name)
    }

    /// Every `provider/model` pair in document order.
    pub fn all_models(&self) -> Vec<ModelRef> {
        self.models
            .providers
            .iter()
            .flat_map(|(provider, config)| {
                config.models.iter().map(move |model| ModelRef {
                    id: qualified_model_id(provider, &model.id),
                    name: model.display_name().to_string(),
                    provider: provider.clone(),
                })
            })
            .collect()
    }

    /// Whether a fully-qualified id names an existing provider model.
    pub fn resolves_model(&self, reference: &str) -> bool {
        self.models.providers.iter().any(|(name, provider)| {
            model_under_provider(reference, name)
                .is_some_and(|model_id| provider.models.iter().any(|m| m.id == model_id))
        })
    }
}

// ============================================================================
// Default value helper functions
// ============================================================================

fn default_true() -> bool {
    true
}

fn default_input() -> Vec<InputModality> {
    vec![InputModality::Text]
}

fn default_context_window() -> u64 {
    DEFAULT_CONTEXT_WINDOW
}

fn default_max_tokens() -> u64 {
    DEFAULT_MAX_TOKENS
}

fn default_agent_max_concurrent() -> u32 {
    DEFAULT_AGENT_MAX_CONCURRENT
}

fn default_subagent_max_concurrent() -> u32 {
    DEFAULT_SUBAGENT_MAX_CONCURRENT
}

fn default_gateway_port() -> u16 {
    DEFAULT_GATEWAY_PORT
}

fn default_gateway_mode() -> String {
    DEFAULT_GATEWAY_MODE.to_string()
}
