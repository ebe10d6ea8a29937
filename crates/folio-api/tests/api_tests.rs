//! API Integration Tests
//!
//! Every external service is replaced by an in-process double, so these
//! tests exercise routing, validation, the pipeline and error mapping
//! without network access.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::Engine;
use folio_api::{
    create_router,
    mail::{ContactMessage, Mailer},
    state::AppState,
};
use folio_core::{
    AppConfig, Chunk, FolioError, LlmClient, RecordMetadata, Result, SpeechSynthesizer,
    SynthesizedAudio, VectorRecord,
};
use folio_rag::AvatarPipeline;
use folio_vector::{upload_chunks, DimensionGuard, Embedder, InMemoryIndex, VectorIndex};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const DIM: usize = 384;
const AUDIO: &[u8] = b"ID3\x04fake-mp3";

// =============================================================================
// Test doubles
// =============================================================================

/// Bag-of-topics embedder: one dimension per topic, plus a shared bias
struct TopicEmbedder;

const TOPICS: &[&[&str]] = &[
    &["react", "node", "language", "typescript"],
    &["cricket", "football", "hobby", "hobbies"],
    &["fixmyiot", "project", "iot"],
];

#[async_trait]
impl Embedder for TopicEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let mut v = vec![0.0; DIM];
        for (i, words) in TOPICS.iter().enumerate() {
            if words.iter().any(|w| lower.contains(w)) {
                v[i] = 1.0;
            }
        }
        v[DIM - 1] = 0.1;
        Ok(v)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "topics"
    }
}

struct ScriptedLlm {
    reply: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().map_err(FolioError::Llm)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

struct FixedTts;

#[async_trait]
impl SpeechSynthesizer for FixedTts {
    async fn synthesize(&self, _text: &str) -> Result<SynthesizedAudio> {
        Ok(SynthesizedAudio::new(AUDIO.to_vec(), "audio/mpeg"))
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

#[derive(Default)]
struct RecordingMailer {
    fail: bool,
    sent: Mutex<Vec<ContactMessage>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &ContactMessage) -> Result<()> {
        if self.fail {
            return Err(FolioError::Mail("535 authentication failed".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct TestApp {
    router: Router,
    index: Arc<InMemoryIndex>,
    llm: Arc<ScriptedLlm>,
    mailer: Arc<RecordingMailer>,
}

async fn test_app_with(llm_reply: std::result::Result<&str, &str>, mailer_fails: bool) -> TestApp {
    let embedder: Arc<dyn Embedder> = Arc::new(DimensionGuard::new(Arc::new(TopicEmbedder), DIM));
    let index = Arc::new(InMemoryIndex::new(DIM));

    let chunks = vec![
        Chunk::new("chunk-1", "Skilled in React and Node"),
        Chunk::new("chunk-2", "Plays cricket and football on weekends"),
        Chunk::new("chunk-3", "Built FixMyIoT, an IoT troubleshooting assistant"),
    ];
    upload_chunks(embedder.as_ref(), index.as_ref(), &chunks)
        .await
        .unwrap();

    let llm = Arc::new(ScriptedLlm {
        reply: llm_reply.map(str::to_string).map_err(str::to_string),
        prompts: Mutex::new(Vec::new()),
    });
    let mailer = Arc::new(RecordingMailer {
        fail: mailer_fails,
        ..Default::default()
    });

    let config = AppConfig::default();
    let pipeline = AvatarPipeline::new(
        embedder,
        index.clone(),
        llm.clone(),
        Arc::new(FixedTts),
        config.rag.clone(),
        config.persona.clone(),
    );
    let state = Arc::new(AppState::new(config, Arc::new(pipeline), mailer.clone()));

    TestApp {
        router: create_router(state),
        index,
        llm,
        mailer,
    }
}

async fn test_app() -> TestApp {
    test_app_with(Ok("I mostly build with React and Node."), false).await
}

/// Helper to create a test request
fn create_json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = test_app().await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["vector_index"], "memory");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = test_app().await;

    let request = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/chat"].is_object());
    assert!(json["paths"]["/api/contact/send"].is_object());
}

// =============================================================================
// Query API Tests
// =============================================================================

#[tokio::test]
async fn test_query_returns_uploaded_chunk_first() {
    let app = test_app().await;

    let request = create_json_request(
        "/api/query",
        json!({ "query": "What languages does he know?" }),
    );
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["query"], "What languages does he know?");
    assert_eq!(json["results"][0]["id"], "chunk-1");
    assert_eq!(json["results"][0]["text"], "Skilled in React and Node");
    assert!(json["results"][0]["score"].is_number());
}

#[tokio::test]
async fn test_query_respects_top_k() {
    let app = test_app().await;
    let extra: Vec<Chunk> = (4..=9)
        .map(|i| Chunk::new(format!("chunk-{i}"), format!("TypeScript note {i}")))
        .collect();
    upload_chunks(&TopicEmbedder, app.index.as_ref(), &extra)
        .await
        .unwrap();

    let request = create_json_request(
        "/api/query",
        json!({ "query": "Which languages?", "topK": 5 }),
    );
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    let results = json["results"].as_array().unwrap();
    assert!(results.len() <= 5);
    for result in results {
        assert!(!result["text"].as_str().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_query_reports_missing_text() {
    let app = test_app().await;
    let mut vector = vec![0.0; DIM];
    vector[0] = 1.0;
    vector[DIM - 1] = 0.1;
    app.index
        .upsert(&[VectorRecord {
            id: "chunk-0".to_string(),
            embedding: vector,
            metadata: RecordMetadata { text: None },
        }])
        .await
        .unwrap();

    let request = create_json_request(
        "/api/query",
        json!({ "query": "React?", "topK": 5 }),
    );
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    let placeholder = json["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["id"] == "chunk-0")
        .unwrap();
    assert_eq!(placeholder["text"], "No text available");
}

#[tokio::test]
async fn test_query_endpoint_empty_question() {
    let app = test_app().await;

    for body in [json!({ "query": "" }), json!({ "query": "   " }), json!({})] {
        let (status, json) =
            send(app.router.clone(), create_json_request("/api/query", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }
}

#[tokio::test]
async fn test_query_rejects_out_of_range_top_k() {
    let app = test_app().await;

    for top_k in [0, 51] {
        let request = create_json_request(
            "/api/query",
            json!({ "query": "React?", "topK": top_k }),
        );
        let (status, json) = send(app.router.clone(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("topK"));
    }
}

#[tokio::test]
async fn test_query_wrong_field_type_is_bad_request() {
    let app = test_app().await;

    let request = create_json_request("/api/query", json!({ "query": "React?", "topK": -1 }));
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_query_non_json_body_is_bad_request() {
    let app = test_app().await;

    for content_type in [None, Some("text/plain")] {
        let mut builder = Request::builder().method("POST").uri("/api/query");
        if let Some(value) = content_type {
            builder = builder.header("Content-Type", value);
        }
        let request = builder.body(Body::from("What languages?")).unwrap();
        let (status, json) = send(app.router.clone(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }
}

#[tokio::test]
async fn test_query_malformed_json_is_bad_request() {
    let app = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("Content-Type", "application/json")
        .body(Body::from("{\"query\": "))
        .unwrap();
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
    assert!(app.llm.prompts.lock().unwrap().is_empty());
}

// =============================================================================
// Chat API Tests
// =============================================================================

#[tokio::test]
async fn test_chat_returns_text_and_audio() {
    let app = test_app().await;

    let request = create_json_request(
        "/api/chat",
        json!({ "query": "What languages does he know?", "topK": 2 }),
    );
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["text"], "I mostly build with React and Node.");
    assert_eq!(json["audioMimeType"], "audio/mpeg");

    let audio = base64::engine::general_purpose::STANDARD
        .decode(json["audioBase64"].as_str().unwrap())
        .unwrap();
    assert_eq!(audio, AUDIO);

    let prompts = app.llm.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Skilled in React and Node"));
    assert!(prompts[0].contains("Question:\nWhat languages does he know?"));
}

#[tokio::test]
async fn test_chat_upstream_failure_is_generic_500() {
    let app = test_app_with(Err("quota exceeded for key sk-secret"), false).await;

    let request = create_json_request("/api/chat", json!({ "query": "Hobbies?" }));
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Internal server error");
    assert!(!json.to_string().contains("sk-secret"));
}

#[tokio::test]
async fn test_chat_requires_query() {
    let app = test_app().await;

    let (status, _) = send(app.router, create_json_request("/api/chat", json!({}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.llm.prompts.lock().unwrap().is_empty());
}

// =============================================================================
// Contact API Tests
// =============================================================================

#[tokio::test]
async fn test_contact_missing_fields() {
    let app = test_app().await;

    let incomplete = [
        json!({ "email": "ada@example.com", "message": "Hi" }),
        json!({ "name": "Ada", "message": "Hi" }),
        json!({ "name": "Ada", "email": "ada@example.com" }),
        json!({ "name": "Ada", "email": "ada@example.com", "message": "  " }),
    ];

    for body in incomplete {
        let (status, json) = send(
            app.router.clone(),
            create_json_request("/api/contact/send", body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert!(json["error"].is_string());
    }
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_contact_wrong_field_type_is_bad_request() {
    let app = test_app().await;

    let request = create_json_request(
        "/api/contact/send",
        json!({ "name": "Ada", "email": "a@b.co", "message": 42 }),
    );
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());
    assert!(app.mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_contact_success() {
    let app = test_app().await;

    let request = create_json_request(
        "/api/contact/send",
        json!({
            "name": "Ada",
            "email": "ada@example.com",
            "subject": "Hiring",
            "message": "Loved the FixMyIoT demo!"
        }),
    );
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["message"].is_string());

    let sent = app.mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].name, "Ada");
    assert_eq!(sent[0].subject.as_deref(), Some("Hiring"));
}

#[tokio::test]
async fn test_contact_delivery_failure() {
    let app = test_app_with(Ok("ok"), true).await;

    let request = create_json_request(
        "/api/contact/send",
        json!({ "name": "Ada", "email": "ada@example.com", "message": "Hi" }),
    );
    let (status, json) = send(app.router, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "Failed to send message");
}
