//! Startup loading of the example document, served by a wiremock server.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use openclaw_config_manager::codec::DocumentFormat;
use openclaw_config_manager::editor::{
    CacheState, DocumentSource, Editor, ExampleSource, LoadOutcome, TextSource,
};
use openclaw_config_manager::storage::MemoryKeyValueStore;

fn editor() -> Editor {
    Editor::new(Box::new(MemoryKeyValueStore::new()))
}

async fn serve(body: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/openclaw-example.json"))
        .respond_with(body)
        .mount(&server)
        .await;
    server
}

fn example_url(server: &MockServer) -> String {
    format!("{}/openclaw-example.json", server.uri())
}

#[tokio::test]
async fn example_becomes_document_and_baseline() {
    let server = serve(ResponseTemplate::new(200).set_body_json(json!({
        "models": {"providers": {
            "demo": {"baseUrl": "https://demo.test", "models": [{"id": "m"}]}
        }},
        "agents": {"defaults": {"model": {"primary": "demo/m"}}}
    })))
    .await;

    let mut editor = editor();
    let outcome = editor
        .load_example(&ExampleSource::new(example_url(&server)))
        .await;

    assert_eq!(outcome, LoadOutcome::Applied);
    assert!(editor.document().resolves_model("demo/m"));
    assert_eq!(editor.cache_state(), CacheState::Saved);
}

#[tokio::test]
async fn missing_example_keeps_template() {
    let server = serve(ResponseTemplate::new(404)).await;

    let mut editor = editor();
    let before = editor.document().clone();
    let outcome = editor
        .load_example(&ExampleSource::new(example_url(&server)))
        .await;

    assert_eq!(outcome, LoadOutcome::Unavailable);
    assert_eq!(editor.document(), &before);
    assert_eq!(editor.cache_state(), CacheState::Empty);
}

#[tokio::test]
async fn malformed_example_keeps_template() {
    let server = serve(ResponseTemplate::new(200).set_body_string("<html>")).await;

    let mut editor = editor();
    let outcome = editor
        .load_example(&ExampleSource::new(example_url(&server)))
        .await;

    assert_eq!(outcome, LoadOutcome::Unavailable);
    assert_eq!(editor.cache_state(), CacheState::Empty);
}

#[tokio::test]
async fn slow_example_does_not_clobber_a_later_import() {
    let server = serve(
        ResponseTemplate::new(200)
            .set_body_json(json!({"gateway": {"port": 20000}}))
            .set_delay(Duration::from_millis(200)),
    )
    .await;
    let example = ExampleSource::new(example_url(&server));
    let import = TextSource::new(r#"{"gateway": {"port": 20001}}"#, DocumentFormat::Json);

    let mut editor = editor();
    let example_ticket = editor.begin_load();
    let import_ticket = editor.begin_load();

    let (example_result, import_result) = tokio::join!(example.load(), import.load());

    assert_eq!(
        editor.complete_load(import_ticket, import_result).unwrap(),
        LoadOutcome::Applied
    );
    assert_eq!(
        editor.complete_load(example_ticket, example_result).unwrap(),
        LoadOutcome::Superseded
    );
    assert_eq!(editor.document().gateway.port, 20001);
}
