//! Bindings between form inputs and the document.
//!
//! Structured inputs deliver raw strings on change-commit; [`FormField`]
//! turns them into typed mutations. The raw-text view goes through
//! [`RawTextController`], which only ever applies text that parses.

use super::document::{AgentDefaultField, GatewayField, ModelFields};
use super::Editor;
use crate::codec;
use crate::config::{
    ConfigDocument, GatewayAuthMode, GatewayBindMode, GatewayTailscaleMode,
    DEFAULT_AGENT_MAX_CONCURRENT, DEFAULT_CONTEXT_WINDOW, DEFAULT_GATEWAY_PORT, DEFAULT_MAX_TOKENS,
    DEFAULT_SUBAGENT_MAX_CONCURRENT,
};
use crate::error::{EditorError, Result};
use tracing::debug;

/// Parse a positive integer from a form value, falling back to `default`
/// for empty, zero or unparsable input.
pub fn parse_count_or<T>(raw: &str, default: T) -> T
where
    T: std::str::FromStr + PartialEq + Default,
{
    raw.trim()
        .parse::<T>()
        .ok()
        .filter(|n| *n != T::default())
        .unwrap_or(default)
}

// ============================================================================
// Structured fields
// ============================================================================

/// Scalar inputs bound to a single document field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    PrimaryModel,
    Workspace,
    MaxConcurrent,
    SubagentMaxConcurrent,
    SandboxMode,
    GatewayPort,
    GatewayMode,
    GatewayBind,
    GatewayAuthMode,
    GatewayAuthToken,
    TailscaleMode,
    TailscaleResetOnExit,
}

/// The mutation a committed form value maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMutation {
    Agent(AgentDefaultField),
    Gateway(GatewayField),
}

impl FormField {
    /// Translate a raw form value into a typed mutation.
    ///
    /// Numeric inputs fall back to their defaults; choice inputs must name a
    /// known option.
    pub fn parse(self, raw: &str) -> Result<FieldMutation> {
        let trimmed = raw.trim();
        let choice = |e: String| EditorError::validation(self.path(), e);
        Ok(match self {
            Self::PrimaryModel => {
                FieldMutation::Agent(AgentDefaultField::PrimaryModel(trimmed.to_string()))
            }
            Self::Workspace => {
                FieldMutation::Agent(AgentDefaultField::Workspace(raw.to_string()))
            }
            Self::MaxConcurrent => FieldMutation::Agent(AgentDefaultField::MaxConcurrent(
                parse_count_or(raw, DEFAULT_AGENT_MAX_CONCURRENT),
            )),
            Self::SubagentMaxConcurrent => FieldMutation::Agent(
                AgentDefaultField::SubagentMaxConcurrent(parse_count_or(
                    raw,
                    DEFAULT_SUBAGENT_MAX_CONCURRENT,
                )),
            ),
            Self::SandboxMode => FieldMutation::Agent(AgentDefaultField::SandboxMode(
                Some(trimmed.to_string()).filter(|m| !m.is_empty()),
            )),
            Self::GatewayPort => FieldMutation::Gateway(GatewayField::Port(parse_count_or(
                raw,
                DEFAULT_GATEWAY_PORT,
            ))),
            Self::GatewayMode => FieldMutation::Gateway(GatewayField::Mode(trimmed.to_string())),
            Self::GatewayBind => FieldMutation::Gateway(GatewayField::Bind(
                trimmed.parse::<GatewayBindMode>().map_err(choice)?,
            )),
            Self::GatewayAuthMode => {
                let mode = match trimmed {
                    "token" => GatewayAuthMode::Token,
                    "password" => GatewayAuthMode::Password,
                    other => return Err(choice(format!("invalid auth mode: {other}"))),
                };
                FieldMutation::Gateway(GatewayField::AuthMode(mode))
            }
            Self::GatewayAuthToken => {
                FieldMutation::Gateway(GatewayField::AuthToken(trimmed.to_string()))
            }
            Self::TailscaleMode => {
                let mode = match trimmed {
                    "off" => GatewayTailscaleMode::Off,
                    "serve" => GatewayTailscaleMode::Serve,
                    "funnel" => GatewayTailscaleMode::Funnel,
                    other => return Err(choice(format!("invalid tailscale mode: {other}"))),
                };
                FieldMutation::Gateway(GatewayField::TailscaleMode(mode))
            }
            Self::TailscaleResetOnExit => FieldMutation::Gateway(
                GatewayField::TailscaleResetOnExit(matches!(trimmed, "true" | "on" | "1")),
            ),
        })
    }

    /// Dotted document path of the bound field.
    pub fn path(self) -> &'static str {
        match self {
            Self::PrimaryModel => "agents.defaults.model.primary",
            Self::Workspace => "agents.defaults.workspace",
            Self::MaxConcurrent => "agents.defaults.maxConcurrent",
            Self::SubagentMaxConcurrent => "agents.defaults.subagents.maxConcurrent",
            Self::SandboxMode => "agents.defaults.sandbox.mode",
            Self::GatewayPort => "gateway.port",
            Self::GatewayMode => "gateway.mode",
            Self::GatewayBind => "gateway.bind",
            Self::GatewayAuthMode => "gateway.auth.mode",
            Self::GatewayAuthToken => "gateway.auth.token",
            Self::TailscaleMode => "gateway.tailscale.mode",
            Self::TailscaleResetOnExit => "gateway.tailscale.resetOnExit",
        }
    }

    /// Current value rendered the way the input displays it.
    pub fn read(self, doc: &ConfigDocument) -> String {
        let defaults = &doc.agents.defaults;
        let gateway = &doc.gateway;
        let json_str = |v: serde_json::Result<serde_json::Value>| {
            v.ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
        };
        match self {
            Self::PrimaryModel => defaults.model.primary.clone(),
            Self::Workspace => defaults.workspace.clone(),
            Self::MaxConcurrent => defaults.max_concurrent.to_string(),
            Self::SubagentMaxConcurrent => defaults.subagents.max_concurrent.to_string(),
            Self::SandboxMode => defaults
                .sandbox
                .as_ref()
                .map(|s| s.mode.clone())
                .unwrap_or_default(),
            Self::GatewayPort => gateway.port.to_string(),
            Self::GatewayMode => gateway.mode.clone(),
            Self::GatewayBind => json_str(serde_json::to_value(gateway.bind)),
            Self::GatewayAuthMode => json_str(serde_json::to_value(gateway.auth.mode)),
            Self::GatewayAuthToken => gateway.auth.token.clone(),
            Self::TailscaleMode => json_str(serde_json::to_value(gateway.tailscale.mode)),
            Self::TailscaleResetOnExit => gateway.tailscale.reset_on_exit.to_string(),
        }
    }
}

impl ModelFields {
    /// Build model fields from raw form values. Missing or unparsable limits
    /// become the defaults; an empty name falls back to the id.
    pub fn from_form(
        id: &str,
        name: &str,
        reasoning: bool,
        vision: bool,
        context_window: &str,
        max_tokens: &str,
    ) -> Self {
        Self {
            id: id.trim().to_string(),
            name: name.trim().to_string(),
            reasoning,
            vision,
            context_window: parse_count_or(context_window, DEFAULT_CONTEXT_WINDOW),
            max_tokens: parse_count_or(max_tokens, DEFAULT_MAX_TOKENS),
        }
    }
}

// ============================================================================
// Raw text view
// ============================================================================

/// Outcome of the last keystroke in the raw-text view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTextStatus {
    Applied,
    /// The text does not parse; the document was left alone.
    Invalid(String),
}

/// Keeps the raw-text view and the live document in step.
#[derive(Debug, Clone, Default)]
pub struct RawTextController {
    text: String,
    status: Option<RawTextStatus>,
}

impl RawTextController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text currently shown in the view.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> Option<&RawTextStatus> {
        self.status.as_ref()
    }

    /// Refresh the view from the live document.
    pub fn render(&mut self, editor: &Editor) -> Result<&str> {
        self.text = codec::serialize(editor.document())?;
        self.status = None;
        Ok(&self.text)
    }

    /// Handle a keystroke: apply the text if it parses, otherwise keep it
    /// in the view and report why it was not applied.
    pub fn on_input(&mut self, editor: &mut Editor, text: &str) -> &RawTextStatus {
        self.text = text.to_string();
        let status = match codec::deserialize(text) {
            Ok(doc) => {
                editor.replace_document(doc);
                RawTextStatus::Applied
            }
            Err(e) => {
                debug!("Ignoring raw text that does not parse: {e}");
                RawTextStatus::Invalid(e.to_string())
            }
        };
        self.status.insert(status)
    }

    /// Re-indent text without applying it.
    pub fn format(text: &str) -> Result<String> {
        codec::format_text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_fall_back_to_defaults() {
        assert_eq!(parse_count_or("12", 4u32), 12);
        assert_eq!(parse_count_or(" ", 4u32), 4);
        assert_eq!(parse_count_or("0", 4u32), 4);
        assert_eq!(parse_count_or("abc", 4u32), 4);
        assert_eq!(parse_count_or::<u16>("70000", 18789), 18789);
    }

    #[test]
    fn numeric_fields_parse_or_default() {
        assert_eq!(
            FormField::GatewayPort.parse("").unwrap(),
            FieldMutation::Gateway(GatewayField::Port(18789))
        );
        assert_eq!(
            FormField::MaxConcurrent.parse("x").unwrap(),
            FieldMutation::Agent(AgentDefaultField::MaxConcurrent(4))
        );
        assert_eq!(
            FormField::SubagentMaxConcurrent.parse("").unwrap(),
            FieldMutation::Agent(AgentDefaultField::SubagentMaxConcurrent(8))
        );
    }

    #[test]
    fn choice_fields_reject_unknown_values() {
        assert_eq!(
            FormField::GatewayBind.parse("lan").unwrap(),
            FieldMutation::Gateway(GatewayField::Bind(GatewayBindMode::Lan))
        );
        let err = FormField::TailscaleMode.parse("tunnel").unwrap_err();
        assert!(err.to_string().starts_with("gateway.tailscale.mode"));
        assert!(FormField::GatewayAuthMode.parse("").is_err());
    }

    #[test]
    fn empty_sandbox_clears_it() {
        assert_eq!(
            FormField::SandboxMode.parse(" ").unwrap(),
            FieldMutation::Agent(AgentDefaultField::SandboxMode(None))
        );
    }

    #[test]
    fn read_renders_current_values() {
        let doc = ConfigDocument::template();
        assert_eq!(FormField::GatewayPort.read(&doc), "18789");
        assert_eq!(FormField::GatewayBind.read(&doc), "loopback");
        assert_eq!(FormField::TailscaleMode.read(&doc), "off");
        assert_eq!(FormField::SandboxMode.read(&doc), "");
    }

    #[test]
    fn model_form_defaults() {
        let fields = ModelFields::from_form(" gpt ", "", true, false, "", "abc");
        assert_eq!(fields.id, "gpt");
        assert_eq!(fields.context_window, 200_000);
        assert_eq!(fields.max_tokens, 32_000);
    }

    #[test]
    fn format_only_reindents() {
        assert_eq!(
            RawTextController::format("{\"a\":1}").unwrap(),
            "{\n  \"a\": 1\n}"
        );
        assert!(RawTextController::format("{\"a\":").is_err());
    }
}
