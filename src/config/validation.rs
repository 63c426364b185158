use super::types::{ConfigDocument, GatewayAuthMode};
use std::collections::HashSet;
use tracing::warn;

/// Validation problems found in a loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Where in the agent defaults a model reference lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceLocation {
    Primary,
    Fallback(usize),
    Alias,
}

impl std::fmt::Display for ReferenceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => f.write_str("agents.defaults.model.primary"),
            Self::Fallback(i) => write!(f, "agents.defaults.model.fallbacks[{i}]"),
            Self::Alias => f.write_str("agents.defaults.models"),
        }
    }
}

/// A model reference that no longer names an existing `provider/model`.
///
/// Deleting a provider leaves these behind on purpose; they are reported,
/// never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub location: ReferenceLocation,
    pub reference: String,
}

impl std::fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: \"{}\" does not match any configured model",
            self.location, self.reference
        )
    }
}

/// Collect every agent-default model reference that does not resolve.
///
/// Empty placeholders (an unset primary, a freshly added fallback slot) are
/// not references and are skipped.
pub fn find_dangling_references(doc: &ConfigDocument) -> Vec<DanglingReference> {
    let defaults = &doc.agents.defaults;
    let primary = std::iter::once((ReferenceLocation::Primary, &defaults.model.primary));
    let fallbacks = defaults
        .model
        .fallbacks
        .iter()
        .enumerate()
        .map(|(i, id)| (ReferenceLocation::Fallback(i), id));
    let aliases = defaults
        .models
        .keys()
        .map(|id| (ReferenceLocation::Alias, id));

    primary
        .chain(fallbacks)
        .chain(aliases)
        .filter(|(_, id)| !id.is_empty() && !doc.resolves_model(id))
        .map(|(location, id)| DanglingReference {
            location,
            reference: id.clone(),
        })
        .collect()
}

/// Validate a document. Returns every problem found; an empty list means
/// the document is consistent.
pub fn validate_document(doc: &ConfigDocument) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    if doc.gateway.port == 0 {
        errors.push(ConfigValidationError {
            path: "gateway.port".to_string(),
            message: "Port must be greater than 0".to_string(),
        });
    }

    if doc.gateway.auth.mode == GatewayAuthMode::Token && doc.gateway.auth.token.is_empty() {
        warn!("Gateway auth mode is 'token' but no token is configured");
    }

    for (name, provider) in &doc.models.providers {
        if name.is_empty() {
            errors.push(ConfigValidationError {
                path: "models.providers".to_string(),
                message: "Provider name must not be empty".to_string(),
            });
        }
        if provider.base_url.is_empty() {
            errors.push(ConfigValidationError {
                path: format!("models.providers.{name}.baseUrl"),
                message: "Provider base URL is required".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for (index, model) in provider.models.iter().enumerate() {
            let path = format!("models.providers.{name}.models[{index}]");
            if model.id.is_empty() {
                errors.push(ConfigValidationError {
                    path: format!("{path}.id"),
                    message: "Model id is required".to_string(),
                });
            } else if !seen.insert(model.id.as_str()) {
                errors.push(ConfigValidationError {
                    path: format!("{path}.id"),
                    message: format!("Duplicate model id \"{}\"", model.id),
                });
            }
            if model.context_window == 0 {
                errors.push(ConfigValidationError {
                    path: format!("{path}.contextWindow"),
                    message: "Context window must be greater than 0".to_string(),
                });
            }
            if model.max_tokens == 0 {
                errors.push(ConfigValidationError {
                    path: format!("{path}.maxTokens"),
                    message: "Max tokens must be greater than 0".to_string(),
                });
            }
        }
    }

    for (kind, channel) in &doc.channels.entries {
        match doc.plugins.entries.get(kind) {
            Some(entry) if entry.enabled == channel.enabled => {}
            Some(_) => errors.push(ConfigValidationError {
                path: format!("plugins.entries.{kind}.enabled"),
                message: format!("Does not match channels.{kind}.enabled"),
            }),
            None => errors.push(ConfigValidationError {
                path: format!("plugins.entries.{kind}"),
                message: format!("Channel \"{kind}\" has no plugin entry"),
            }),
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> ConfigDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn template_is_valid() {
        assert!(validate_document(&ConfigDocument::template()).is_empty());
    }

    #[test]
    fn dangling_references_are_reported() {
        let d = doc(json!({
            "models": {"providers": {"acme": {"baseUrl": "u", "models": [{"id": "gpt"}]}}},
            "agents": {"defaults": {
                "model": {"primary": "gone/x", "fallbacks": ["acme/gpt", "", "acme/mini"]},
                "models": {"gone/y": {"alias": "y"}, "acme/gpt": {}}
            }}
        }));

        let dangling = find_dangling_references(&d);
        assert_eq!(
            dangling,
            vec![
                DanglingReference {
                    location: ReferenceLocation::Primary,
                    reference: "gone/x".into()
                },
                DanglingReference {
                    location: ReferenceLocation::Fallback(2),
                    reference: "acme/mini".into()
                },
                DanglingReference {
                    location: ReferenceLocation::Alias,
                    reference: "gone/y".into()
                },
            ]
        );
        assert_eq!(
            dangling[1].to_string(),
            "agents.defaults.model.fallbacks[2]: \"acme/mini\" does not match any configured model"
        );
    }

    #[test]
    fn model_problems() {
        let d = doc(json!({
            "models": {"providers": {"acme": {"baseUrl": "", "models": [
                {"id": "gpt", "contextWindow": 0},
                {"id": "gpt", "maxTokens": 0}
            ]}}}
        }));
        let paths: Vec<String> = validate_document(&d).into_iter().map(|e| e.path).collect();
        assert_eq!(
            paths,
            vec![
                "models.providers.acme.baseUrl",
                "models.providers.acme.models[0].contextWindow",
                "models.providers.acme.models[1].id",
                "models.providers.acme.models[1].maxTokens",
            ]
        );
    }

    #[test]
    fn channel_plugin_drift() {
        let d = doc(json!({
            "channels": {"telegram": {"enabled": true}, "discord": {"enabled": false}},
            "plugins": {"entries": {"telegram": {"enabled": false}}}
        }));
        let errors = validate_document(&d);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, "plugins.entries.telegram.enabled");
        assert_eq!(errors[1].path, "plugins.entries.discord");
    }

    #[test]
    fn channel_defaults_need_no_plugin_entry() {
        let d = doc(json!({"channels": {"defaults": {"groupPolicy": "allowlist"}}}));
        assert!(validate_document(&d).is_empty());
    }

    #[test]
    fn zero_port_rejected() {
        let d = doc(json!({"gateway": {"port": 0}}));
        let errors = validate_document(&d);
        assert_eq!(errors[0].to_string(), "gateway.port: Port must be greater than 0");
    }
}
