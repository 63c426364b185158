//! Where documents come from, and how overlapping loads are ordered.

use crate::codec::{self, DocumentFormat};
use crate::config::{read_document_file, ConfigDocument};
use crate::error::{EditorError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use tracing::debug;

// ============================================================================
// Sources
// ============================================================================

/// Something that can produce a complete document.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn load(&self) -> Result<ConfigDocument>;

    /// Short human-readable origin, used in log lines.
    fn describe(&self) -> String;
}

/// A file picked from the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn load(&self) -> Result<ConfigDocument> {
        read_document_file(&self.path).await
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Raw text already in hand, such as a dropped file's contents.
#[derive(Debug, Clone)]
pub struct TextSource {
    text: String,
    format: DocumentFormat,
}

impl TextSource {
    pub fn new(text: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

#[async_trait]
impl DocumentSource for TextSource {
    async fn load(&self) -> Result<ConfigDocument> {
        codec::deserialize_as(&self.text, self.format)
    }

    fn describe(&self) -> String {
        format!("{} bytes of text", self.text.len())
    }
}

/// The example document served next to the editor.
#[derive(Debug, Clone)]
pub struct ExampleSource {
    client: Client,
    url: String,
}

impl ExampleSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DocumentSource for ExampleSource {
    async fn load(&self) -> Result<ConfigDocument> {
        let fetch_err = |message: String| EditorError::Fetch {
            url: self.url.clone(),
            message,
        };

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", resp.status())));
        }

        let text = resp.text().await.map_err(|e| fetch_err(e.to_string()))?;
        debug!("Fetched {} bytes from {}", text.len(), self.url);
        codec::deserialize(&text)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

// ============================================================================
// Sequencing
// ============================================================================

/// Issued when a load starts; presented again when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// Orders document replacements by when their loads were issued.
///
/// A completion is accepted only if no later-issued load has already been
/// applied, so a slow early load can never overwrite a newer document.
#[derive(Debug, Clone, Default)]
pub struct LoadSequencer {
    issued: u64,
    applied: Option<LoadTicket>,
}

impl LoadSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket(self.issued)
    }

    /// Whether a completion for `ticket` may still be applied.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.applied.map_or(true, |applied| ticket > applied)
    }

    /// Record `ticket` as applied. Returns false for stale tickets.
    pub fn accept(&mut self, ticket: LoadTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.applied = Some(ticket);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn later_issued_load_wins() {
        let mut seq = LoadSequencer::new();
        let first = seq.issue();
        let second = seq.issue();

        assert!(seq.accept(second));
        assert!(!seq.accept(first));
        assert!(!seq.is_current(first));

        let third = seq.issue();
        assert!(seq.accept(third));
    }

    #[test]
    fn in_order_completions_all_apply() {
        let mut seq = LoadSequencer::new();
        let a = seq.issue();
        let b = seq.issue();
        assert!(seq.accept(a));
        assert!(seq.accept(b));
    }

    #[tokio::test]
    async fn file_source_reads_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json5").tempfile().unwrap();
        write!(file, "{{gateway: {{port: 18800}}}}").unwrap();

        let doc = FileSource::new(file.path()).load().await.unwrap();
        assert_eq!(doc.gateway.port, 18800);
    }

    #[tokio::test]
    async fn text_source_reports_parse_errors() {
        let err = TextSource::new("{", DocumentFormat::Json).load().await.unwrap_err();
        assert!(matches!(err, EditorError::Parse { .. }));
    }

    #[tokio::test]
    async fn example_source_fetches_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/openclaw-example.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"gateway": {"port": 18801}}"#),
            )
            .mount(&server)
            .await;

        let source = ExampleSource::new(format!("{}/openclaw-example.json", server.uri()));
        let doc = source.load().await.unwrap();
        assert_eq!(doc.gateway.port, 18801);
    }

    #[tokio::test]
    async fn example_source_missing_is_fetch_error() {
        let server = MockServer::start().await;
        let source = ExampleSource::new(format!("{}/openclaw-example.json", server.uri()));
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, EditorError::Fetch { .. }));
        assert!(err.to_string().contains("404"));
    }
}
