//! Default configuration constants and the built-in document template.

use chrono::{SecondsFormat, Utc};
use serde_json::json;

use super::types::{ConfigDocument, MetaSection, WizardSection};

/// Version stamped into freshly created documents.
pub const TEMPLATE_VERSION: &str = "2026.1.29";

/// File name of the gateway configuration, locally and on the remote host.
pub const CONFIG_FILE_NAME: &str = "openclaw.json";

/// Relative resource holding an example document, fetched once at startup.
pub const EXAMPLE_DOCUMENT_RESOURCE: &str = "openclaw-example.json";

/// Default gateway port.
pub const DEFAULT_GATEWAY_PORT: u16 = 18789;

/// Default gateway mode.
pub const DEFAULT_GATEWAY_MODE: &str = "local";

/// Default agent concurrency.
pub const DEFAULT_AGENT_MAX_CONCURRENT: u32 = 4;

/// Default sub-agent concurrency.
pub const DEFAULT_SUBAGENT_MAX_CONCURRENT: u32 = 8;

/// Model limits used when the form leaves them empty.
pub const DEFAULT_CONTEXT_WINDOW: u64 = 200_000;
pub const DEFAULT_MAX_TOKENS: u64 = 32_000;

/// Length of a generated gateway auth token.
pub const GATEWAY_TOKEN_LENGTH: usize = 48;

/// Durable storage keys.
pub const SNAPSHOT_DOCUMENT_KEY: &str = "openclaw-cache";
pub const SNAPSHOT_TIME_KEY: &str = "openclaw-cache-time";
pub const THEME_KEY: &str = "openclaw-theme";

/// Current time as an ISO-8601 string with millisecond precision.
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl ConfigDocument {
    /// The built-in template used when nothing else has been loaded.
    pub fn template() -> Self {
        let now = now_iso8601();
        Self {
            meta: MetaSection {
                last_touched_version: Some(TEMPLATE_VERSION.to_string()),
                last_touched_at: Some(now.clone()),
                ..MetaSection::default()
            },
            wizard: Some(WizardSection {
                last_run_at: Some(now),
                last_run_version: Some(TEMPLATE_VERSION.to_string()),
                last_run_command: Some("onboard".to_string()),
                last_run_mode: Some("local".to_string()),
                ..WizardSection::default()
            }),
            messages: Some(json!({ "ackReactionScope": "group-mentions" })),
            commands: Some(json!({
                "native": "auto",
                "nativeSkills": "auto",
                "restart": true
            })),
            hooks: Some(json!({
                "internal": {
                    "enabled": true,
                    "entries": {
                        "boot-md": { "enabled": true },
                        "session-memory": { "enabled": true }
                    }
                }
            })),
            skills: Some(json!({ "install": { "nodeManager": "npm" } })),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_shape() {
        let doc = ConfigDocument::template();
        assert_eq!(doc.meta.last_touched_version.as_deref(), Some(TEMPLATE_VERSION));
        assert!(doc.meta.last_touched_at.is_some());
        assert_eq!(doc.gateway.port, DEFAULT_GATEWAY_PORT);
        assert_eq!(doc.gateway.auth.token, "");
        assert_eq!(doc.agents.defaults.model.primary, "");
        assert_eq!(
            doc.hooks.as_ref().unwrap()["internal"]["entries"]["boot-md"]["enabled"],
            true
        );
        assert!(doc.channels.entries.is_empty());
        assert!(doc.channels.defaults.is_none());
    }

    #[test]
    fn template_key_order_follows_sections() {
        let text = serde_json::to_string(&ConfigDocument::template()).unwrap();
        let meta = text.find("\"meta\"").unwrap();
        let models = text.find("\"models\"").unwrap();
        let gateway = text.find("\"gateway\"").unwrap();
        let plugins = text.find("\"plugins\"").unwrap();
        assert!(meta < models && models < gateway && gateway < plugins);
    }
}
