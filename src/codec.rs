//! Conversion between the in-memory document and its canonical text form.
//!
//! The canonical form is pretty-printed JSON with two-space indentation.
//! Keys follow the declaration order of each section followed by any
//! unmodelled keys in their original order, so output is deterministic.
//! Parsing never touches a live document: callers receive either a complete
//! new document or an error.

use crate::config::ConfigDocument;
use crate::error::{EditorError, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Text formats accepted on import. Export is always canonical JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Json,
    Json5,
    Yaml,
    Toml,
}

impl DocumentFormat {
    /// Pick a format from a file extension, defaulting to JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json5") => Self::Json5,
            Some("yaml") | Some("yml") => Self::Yaml,
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Serialize a document to its canonical text form.
pub fn serialize(doc: &ConfigDocument) -> Result<String> {
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Parse canonical (JSON) text into a document.
pub fn deserialize(text: &str) -> Result<ConfigDocument> {
    deserialize_as(text, DocumentFormat::Json)
}

/// Parse text in the given format into a document.
///
/// The text must be a mapping at the top level; every missing section is
/// materialized with its defaults.
pub fn deserialize_as(text: &str, format: DocumentFormat) -> Result<ConfigDocument> {
    let value = parse_value(text, format)?;
    if !value.is_object() {
        return Err(EditorError::Parse {
            message: "top-level value must be an object".to_string(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

fn parse_value(text: &str, format: DocumentFormat) -> Result<Value> {
    let parsed = match format {
        DocumentFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        DocumentFormat::Json5 => json5::from_str(text).map_err(|e| e.to_string()),
        DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
        DocumentFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| EditorError::Parse { message })
}

/// Re-indent arbitrary JSON text without interpreting it as a document.
pub fn format_text(text: &str) -> Result<String> {
    let value: Value = serde_json::from_str(text)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Compute a hash of the canonical form for change detection.
pub fn fingerprint(doc: &ConfigDocument) -> String {
    let canonical = serde_json::to_string(doc).unwrap_or_default();
    let hash = Sha256::digest(canonical.as_bytes());
    hex::encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelDefinition, ProviderConfig};
    use pretty_assertions::assert_eq;

    fn sample() -> ConfigDocument {
        let mut doc = ConfigDocument::template();
        doc.models.providers.insert(
            "acme".into(),
            ProviderConfig {
                base_url: "https://api.acme.test/v1".into(),
                api_key: "sk-1".into(),
                models: vec![serde_json::from_value::<ModelDefinition>(serde_json::json!({
                    "id": "gpt",
                    "name": "GPT",
                    "reasoning": true,
                    "input": ["text", "image"],
                    "cost": {"input": 0.5, "output": 1.5}
                }))
                .unwrap()],
                ..ProviderConfig::default()
            },
        );
        doc.agents.defaults.model.primary = "acme/gpt".into();
        doc.agents.defaults.model.fallbacks = vec!["".into()];
        doc
    }

    #[test]
    fn round_trip_is_structural_identity() {
        let doc = sample();
        assert_eq!(deserialize(&serialize(&doc).unwrap()).unwrap(), doc);
    }

    #[test]
    fn output_is_two_space_indented() {
        let text = serialize(&ConfigDocument::default()).unwrap();
        assert!(text.starts_with("{\n  \"meta\": {}"));
    }

    #[test]
    fn serialization_is_deterministic() {
        let doc = sample();
        assert_eq!(serialize(&doc).unwrap(), serialize(&doc.clone()).unwrap());
        assert_eq!(fingerprint(&doc), fingerprint(&doc.clone()));
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        let err = deserialize("{\"gateway\": ").unwrap_err();
        assert!(matches!(err, EditorError::Parse { .. }));
    }

    #[test]
    fn non_object_rejected() {
        let err = deserialize("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    #[test]
    fn wrong_leaf_type_rejected() {
        assert!(deserialize(r#"{"gateway": {"port": "high"}}"#).is_err());
        assert!(deserialize(r#"{"gateway": {"port": 70000}}"#).is_err());
    }

    #[test]
    fn json5_and_yaml_inputs() {
        let doc = deserialize_as("{gateway: {port: 19000,},}", DocumentFormat::Json5).unwrap();
        assert_eq!(doc.gateway.port, 19000);

        let doc = deserialize_as("gateway:\n  port: 19001\n", DocumentFormat::Yaml).unwrap();
        assert_eq!(doc.gateway.port, 19001);

        let doc = deserialize_as("[gateway]\nport = 19002\n", DocumentFormat::Toml).unwrap();
        assert_eq!(doc.gateway.port, 19002);
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.yml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.json5")), DocumentFormat::Json5);
        assert_eq!(DocumentFormat::from_path(Path::new("a")), DocumentFormat::Json);
    }

    #[test]
    fn format_text_reindents() {
        assert_eq!(format_text("{\"a\":[1]}").unwrap(), "{\n  \"a\": [\n    1\n  ]\n}");
        assert!(format_text("{").is_err());
    }
}
