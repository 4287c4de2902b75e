//! HTTP surface tests over the full route table with a scripted backend.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;
use warp::Filter;

use bujji::gateway::CompletionGateway;
use bujji::handlers::AppContext;
use bujji::llm::{ApiStatus, CompletionBackend, CompletionRequest, FragmentStream, LlmError};
use bujji::routes::configure_routes;
use bujji::store::{ConversationStore, InMemoryStore};

/// Backend that streams the same scripted fragments for every call,
/// or fails every attempt when scripted with `None`.
struct ScriptedBackend {
    fragments: Option<Vec<&'static str>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(fragments: Option<Vec<&'static str>>) -> Self {
        Self {
            fragments,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn stream_completion(
        &self,
        _model: &str,
        _request: CompletionRequest,
    ) -> Result<FragmentStream, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fragments {
            Some(fragments) => {
                let items: Vec<Result<String, LlmError>> =
                    fragments.iter().map(|f| Ok(f.to_string())).collect();
                Ok(Box::pin(futures::stream::iter(items)))
            }
            None => Err(LlmError::Api {
                status: 503,
                api_status: ApiStatus::Unavailable,
                message: "overloaded".to_string(),
            }),
        }
    }

    async fn probe(&self, _model: &str, _search: bool) -> Result<(), LlmError> {
        Ok(())
    }
}

struct TestApp {
    store: Arc<InMemoryStore>,
    backend: Arc<ScriptedBackend>,
    session: Uuid,
}

impl TestApp {
    fn new(fragments: Option<Vec<&'static str>>) -> Self {
        Self {
            store: Arc::new(InMemoryStore::new()),
            backend: Arc::new(ScriptedBackend::new(fragments)),
            session: Uuid::new_v4(),
        }
    }

    fn routes(
        &self,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let gateway = CompletionGateway::with_models(
            Arc::clone(&self.backend) as Arc<dyn CompletionBackend>,
            "stub-model",
            vec![],
        );
        configure_routes(AppContext {
            store: Arc::clone(&self.store) as Arc<dyn ConversationStore>,
            gateway: Arc::new(gateway),
        })
    }

    fn cookie(&self) -> String {
        format!("bujji_session={}", self.session)
    }

    async fn chat(&self, message: &str) -> warp::http::Response<bytes::Bytes> {
        warp::test::request()
            .method("POST")
            .path("/api/chat")
            .header("cookie", self.cookie())
            .json(&serde_json::json!({ "message": message }))
            .reply(&self.routes())
            .await
    }
}

/// Parse every `data:` payload out of an SSE body.
fn sse_payloads(body: &[u8]) -> Vec<serde_json::Value> {
    std::str::from_utf8(body)
        .unwrap()
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| serde_json::from_str(data.trim()).unwrap())
        .collect()
}

fn chunks(payloads: &[serde_json::Value]) -> String {
    payloads
        .iter()
        .filter_map(|p| p.get("chunk").and_then(|c| c.as_str()))
        .collect()
}

#[tokio::test]
async fn test_empty_message_is_rejected_without_side_effects() {
    let app = TestApp::new(Some(vec!["unused"]));

    for message in ["", "   ", "\n\t "] {
        let response = app.chat(message).await;
        assert_eq!(response.status(), 400);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["error"], "Empty message");
    }

    assert!(app.store.history(app.session).await.is_empty());
    assert_eq!(app.backend.calls(), 0);
}

#[tokio::test]
async fn test_chat_streams_chunks_then_done_and_commits() {
    let app = TestApp::new(Some(vec!["Hello", " there", "!"]));

    let response = app.chat("hi").await;
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap(),
        "text/event-stream"
    );

    let payloads = sse_payloads(response.body());
    assert_eq!(chunks(&payloads), "Hello there!");

    let done = payloads.last().unwrap();
    assert_eq!(done["done"], true);
    assert_eq!(done["message_count"], 1);
    assert_eq!(done["model"], "stub-model");
    // HH:MM
    assert_eq!(done["timestamp"].as_str().unwrap().len(), 5);

    let history = app.store.history(app.session).await;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].text, "Hello there!");
}

#[tokio::test]
async fn test_alternating_cycles_keep_strict_order() {
    let app = TestApp::new(Some(vec!["answer"]));

    for i in 0..3 {
        let response = app.chat(&format!("question {i}")).await;
        assert_eq!(response.status(), 200);
    }

    let response = warp::test::request()
        .method("GET")
        .path("/api/history")
        .header("cookie", app.cookie())
        .reply(&app.routes())
        .await;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 6);
    for (i, message) in messages.iter().enumerate() {
        let expected = if i % 2 == 0 { "user" } else { "assistant" };
        assert_eq!(message["role"], expected, "message {i}");
    }
}

#[tokio::test]
async fn test_failed_generation_emits_single_error_event() {
    let app = TestApp::new(None);

    let response = app.chat("hi").await;
    // failures ride the stream, never the HTTP status
    assert_eq!(response.status(), 200);

    let payloads = sse_payloads(response.body());
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0]["error"], "All models failed. Please try again.");

    // the user turn stays; no assistant turn is committed
    let history = app.store.history(app.session).await;
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_regenerate_without_conversation_is_rejected() {
    let app = TestApp::new(Some(vec!["unused"]));

    let response = warp::test::request()
        .method("POST")
        .path("/api/regenerate")
        .header("cookie", app.cookie())
        .reply(&app.routes())
        .await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["error"], "No conversation found");
    assert_eq!(app.backend.calls(), 0);
}

#[tokio::test]
async fn test_regenerate_replaces_last_assistant_turn() {
    let app = TestApp::new(Some(vec!["regenerated answer"]));

    app.chat("question").await;
    let before = app.store.history(app.session).await;
    assert_eq!(before.len(), 2);

    let response = warp::test::request()
        .method("POST")
        .path("/api/regenerate")
        .header("cookie", app.cookie())
        .reply(&app.routes())
        .await;
    assert_eq!(response.status(), 200);

    let payloads = sse_payloads(response.body());
    assert_eq!(chunks(&payloads), "regenerated answer");
    assert_eq!(payloads.last().unwrap()["message_count"], 1);

    // exactly one assistant turn was swapped out, length unchanged
    let after = app.store.history(app.session).await;
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].text, "question");
    assert_eq!(after[1].text, "regenerated answer");
    assert_eq!(app.backend.calls(), 2);
}

#[tokio::test]
async fn test_regenerate_with_no_user_turn_is_rejected() {
    let app = TestApp::new(Some(vec!["unused"]));

    // conversation exists but is empty
    app.chat("question").await;
    warp::test::request()
        .method("POST")
        .path("/api/clear")
        .header("cookie", app.cookie())
        .reply(&app.routes())
        .await;

    let response = warp::test::request()
        .method("POST")
        .path("/api/regenerate")
        .header("cookie", app.cookie())
        .reply(&app.routes())
        .await;

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["error"], "No user message to regenerate from");
}

#[tokio::test]
async fn test_clear_then_history_is_empty() {
    let app = TestApp::new(Some(vec!["a"]));

    for i in 0..4 {
        app.chat(&format!("q{i}")).await;
    }
    assert_eq!(app.store.history(app.session).await.len(), 8);

    let response = warp::test::request()
        .method("POST")
        .path("/api/clear")
        .header("cookie", app.cookie())
        .reply(&app.routes())
        .await;
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["status"], "cleared");

    let response = warp::test::request()
        .method("GET")
        .path("/api/history")
        .header("cookie", app.cookie())
        .reply(&app.routes())
        .await;
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_history_without_session_is_empty_list() {
    let app = TestApp::new(Some(vec!["a"]));

    let response = warp::test::request()
        .method("GET")
        .path("/api/history")
        .reply(&app.routes())
        .await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body, serde_json::json!({ "messages": [] }));
}

#[tokio::test]
async fn test_index_mints_session_cookie() {
    let app = TestApp::new(Some(vec!["a"]));

    let response = warp::test::request()
        .method("GET")
        .path("/")
        .reply(&app.routes())
        .await;
    assert_eq!(response.status(), 200);
    let cookie = response.headers()["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("bujji_session="));
    assert!(cookie.contains("HttpOnly"));

    // a valid cookie is left alone
    let response = warp::test::request()
        .method("GET")
        .path("/")
        .header("cookie", app.cookie())
        .reply(&app.routes())
        .await;
    assert_eq!(response.status(), 200);
    assert!(response.headers().get("set-cookie").is_none());
}

#[tokio::test]
async fn test_sessions_do_not_leak_across_cookies() {
    let app = TestApp::new(Some(vec!["a"]));
    app.chat("private").await;

    let other = Uuid::new_v4();
    let response = warp::test::request()
        .method("GET")
        .path("/api/history")
        .header("cookie", format!("bujji_session={other}"))
        .reply(&app.routes())
        .await;

    let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["messages"].as_array().unwrap().len(), 0);
}
