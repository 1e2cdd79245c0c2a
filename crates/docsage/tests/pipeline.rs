//! End-to-end pipeline tests over the in-process backends
//!
//! Every test runs with the local embedder, the in-memory vector index, and
//! the templated generator, so nothing here needs a network or an external
//! service.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use parking_lot::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use docsage::config::AppConfig;
use docsage::embedding::LocalEmbedder;
use docsage::error::Result;
use docsage::generation::{GeneratorBackend, TemplateGenerator};
use docsage::index::{MemoryIndex, VectorIndex};
use docsage::retrieval::Passage;
use docsage::server::state::AppState;
use docsage::server::Server;
use docsage::storage::ConversationStore;
use docsage::types::response::IngestResponse;
use docsage::types::{AskResponse, Document, DocumentStatus, Message, Session};

const BOUNDARY: &str = "docsage-test-boundary";

struct Fixture {
    store: Arc<ConversationStore>,
    index: Arc<MemoryIndex>,
    router: axum::Router,
}

fn fixture_with(embed_dim: usize, generator: Arc<dyn GeneratorBackend>) -> Fixture {
    let config = AppConfig::default();
    let store = Arc::new(ConversationStore::in_memory().unwrap());
    let index = Arc::new(MemoryIndex::new());
    let embedder = Arc::new(LocalEmbedder::new(embed_dim));

    let state = AppState::with_components(
        config.clone(),
        Arc::clone(&store),
        embedder,
        Arc::clone(&index) as Arc<dyn VectorIndex>,
        generator,
    )
    .unwrap();

    let router = Server::with_state(config, state).build_router();
    Fixture {
        store,
        index,
        router,
    }
}

fn fixture() -> Fixture {
    fixture_with(64, Arc::new(TemplateGenerator::new()))
}

/// Reuse an existing store and index under a different embedding
/// dimensionality, simulating a backend swap after documents were indexed.
fn refixture(previous: &Fixture, embed_dim: usize) -> Fixture {
    let config = AppConfig::default();
    let state = AppState::with_components(
        config.clone(),
        Arc::clone(&previous.store),
        Arc::new(LocalEmbedder::new(embed_dim)),
        Arc::clone(&previous.index) as Arc<dyn VectorIndex>,
        Arc::new(TemplateGenerator::new()),
    )
    .unwrap();
    let router = Server::with_state(config, state).build_router();
    Fixture {
        store: Arc::clone(&previous.store),
        index: Arc::clone(&previous.index),
        router,
    }
}

fn multipart_body(files: &[(&str, &[u8])]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for (filename, data) in files {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    (
        format!("multipart/form-data; boundary={}", BOUNDARY),
        body,
    )
}

async fn send_json(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, Vec<u8>) {
    let request = match body {
        Some(json) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn ingest_files(router: &axum::Router, files: &[(&str, &[u8])]) -> IngestResponse {
    let (content_type, body) = multipart_body(files);
    let request = Request::builder()
        .method("POST")
        .uri("/ingest")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn ask(router: &axum::Router, body: serde_json::Value) -> AskResponse {
    let (status, bytes) = send_json(router, "POST", "/ask", Some(body)).await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&bytes));
    serde_json::from_slice(&bytes).unwrap()
}

/// Build a small multi-page PDF in memory
fn build_pdf(pages_text: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages_text {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

// ==================== Scenario A: upload and complete ====================

#[tokio::test]
async fn scenario_a_three_page_pdf_completes() {
    let fixture = fixture();
    let pdf = build_pdf(&[
        "The first page covers introductions and scope.",
        "The second page describes the refund policy in detail.",
        "The third page lists contact information for support.",
    ]);

    let response = ingest_files(&fixture.router, &[("manual.pdf", &pdf)]).await;
    assert_eq!(response.files_processed, 1);
    assert_eq!(response.doc_ids.len(), 1);
    assert!(response.errors.is_empty());
    assert!(response.chunks_indexed >= 1);

    let doc = fixture.store.get_document(response.doc_ids[0]).unwrap();
    assert_eq!(doc.status, DocumentStatus::Completed);
    assert!(doc.chunk_count >= 1);

    // chunk_count matches what the index actually holds
    let indexed = fixture.index.count("docs").await.unwrap();
    assert_eq!(indexed, doc.chunk_count as usize);
}

#[tokio::test]
async fn failed_file_does_not_abort_the_batch() {
    let fixture = fixture();
    let good = b"Plain text content about shipping timelines and delivery windows.";
    let bad = vec![0xff, 0xfe, 0x00, 0x80, 0x01];

    let response = ingest_files(
        &fixture.router,
        &[("good.txt", good.as_slice()), ("broken.bin", &bad)],
    )
    .await;

    assert_eq!(response.files_processed, 2);
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].filename, "broken.bin");
    assert_eq!(response.doc_ids.len(), 1);

    let good_doc = fixture.store.get_document(response.doc_ids[0]).unwrap();
    assert_eq!(good_doc.status, DocumentStatus::Completed);

    // The broken file left a failed document record behind.
    let failed = fixture
        .store
        .list_documents(Some(DocumentStatus::Failed))
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].filename, "broken.bin");
}

#[tokio::test]
async fn duplicate_upload_is_not_reindexed() {
    let fixture = fixture();
    let content = b"Identical bytes uploaded twice should index once.";

    let first = ingest_files(&fixture.router, &[("orig.txt", content.as_slice())]).await;
    let second = ingest_files(&fixture.router, &[("copy.txt", content.as_slice())]).await;

    assert_eq!(second.doc_ids, first.doc_ids);
    assert_eq!(second.chunks_indexed, 0);
    assert_eq!(fixture.store.stats().unwrap().documents, 1);
}

// ==================== Scenario B: ask with nothing indexed ====================

#[tokio::test]
async fn scenario_b_no_documents_gives_templated_answer() {
    let fixture = fixture();
    let response = ask(
        &fixture.router,
        serde_json::json!({ "question": "what is the refund policy?" }),
    )
    .await;

    assert!(!response.answer.is_empty());
    assert!(response.citations.is_empty());
}

#[tokio::test]
async fn ask_returns_citations_for_indexed_content() {
    let fixture = fixture();
    ingest_files(
        &fixture.router,
        &[(
            "policy.txt",
            b"Refunds are issued within thirty days of purchase. Damaged items qualify for a full refund.".as_slice(),
        )],
    )
    .await;

    let response = ask(
        &fixture.router,
        serde_json::json!({ "question": "when are refunds issued?" }),
    )
    .await;

    assert!(!response.citations.is_empty());
    assert_eq!(response.citations[0].filename, "policy.txt");
    assert!(response.answer.contains("Refunds are issued within thirty days"));
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let fixture = fixture();
    let (status, body) = send_json(
        &fixture.router,
        "POST",
        "/ask",
        Some(serde_json::json!({ "question": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["error"]["type"], "validation_error");
}

// ==================== Scenario C: conversation history ====================

/// Generator that records the history it was handed, delegating the actual
/// text to the templated generator.
struct RecordingGenerator {
    inner: TemplateGenerator,
    histories: Mutex<Vec<Vec<(String, String)>>>,
}

#[async_trait]
impl GeneratorBackend for RecordingGenerator {
    async fn generate(
        &self,
        question: &str,
        passages: &[Passage],
        history: &[(String, String)],
    ) -> Result<String> {
        self.histories.lock().push(history.to_vec());
        self.inner.generate(question, passages, history).await
    }

    async fn generate_stream(
        &self,
        question: &str,
        passages: &[Passage],
        history: &[(String, String)],
    ) -> Result<futures_util::stream::BoxStream<'static, Result<String>>> {
        self.histories.lock().push(history.to_vec());
        self.inner.generate_stream(question, passages, history).await
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn model(&self) -> &str {
        "recording"
    }
}

#[tokio::test]
async fn scenario_c_history_reaches_the_second_prompt() {
    let generator = Arc::new(RecordingGenerator {
        inner: TemplateGenerator::new(),
        histories: Mutex::new(Vec::new()),
    });
    let fixture = fixture_with(64, Arc::clone(&generator) as Arc<dyn GeneratorBackend>);

    let first = ask(
        &fixture.router,
        serde_json::json!({ "question": "what is alpha?", "use_history": true }),
    )
    .await;

    let second = ask(
        &fixture.router,
        serde_json::json!({
            "question": "and what about beta?",
            "session_id": first.session_id,
            "use_history": true
        }),
    )
    .await;
    assert_eq!(second.session_id, first.session_id);

    // First call saw no history; the second saw the first Q&A pair.
    let histories = generator.histories.lock();
    assert_eq!(histories.len(), 2);
    assert!(histories[0].is_empty());
    assert_eq!(histories[1].len(), 1);
    assert_eq!(histories[1][0].0, "what is alpha?");
    assert_eq!(histories[1][0].1, first.answer);

    // Four messages in order: user, assistant, user, assistant.
    let (status, body) = send_json(
        &fixture.router,
        "GET",
        &format!("/sessions/{}/messages", first.session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let messages: Vec<Message> = serde_json::from_slice(&body).unwrap();
    assert_eq!(messages.len(), 4);
    let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);
    assert_eq!(messages[0].content, "what is alpha?");
    assert_eq!(messages[2].content, "and what about beta?");
}

// ==================== Scenario D: session deletion ====================

#[tokio::test]
async fn scenario_d_deleted_session_is_gone() {
    let fixture = fixture();

    let (status, body) = send_json(
        &fixture.router,
        "POST",
        "/sessions",
        Some(serde_json::json!({ "title": "doomed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let session: Session = serde_json::from_slice(&body).unwrap();

    ask(
        &fixture.router,
        serde_json::json!({ "question": "hello?", "session_id": session.id }),
    )
    .await;

    let (status, _) = send_json(
        &fixture.router,
        "DELETE",
        &format!("/sessions/{}", session.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        &fixture.router,
        "GET",
        &format!("/sessions/{}", session.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert!(fixture
        .store
        .list_messages(session.id, 100)
        .unwrap()
        .is_empty());
}

// ==================== Scenario E: dimension mismatch ====================

#[tokio::test]
async fn scenario_e_dimension_mismatch_fails_only_the_new_document() {
    let fixture = fixture_with(64, Arc::new(TemplateGenerator::new()));

    let first = ingest_files(
        &fixture.router,
        &[("first.txt", b"Document indexed under the original embedding backend.".as_slice())],
    )
    .await;
    assert!(first.errors.is_empty());
    let first_doc = fixture.store.get_document(first.doc_ids[0]).unwrap();
    assert_eq!(first_doc.status, DocumentStatus::Completed);

    // Same store and index, different embedding dimensionality.
    let swapped = refixture(&fixture, 32);
    let second = ingest_files(
        &swapped.router,
        &[("second.txt", b"Uploaded after the embedding backend changed size.".as_slice())],
    )
    .await;

    assert_eq!(second.errors.len(), 1);
    assert!(second.errors[0].error.to_lowercase().contains("dimension"));

    let failed = swapped
        .store
        .list_documents(Some(DocumentStatus::Failed))
        .unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].filename, "second.txt");

    // The earlier document is untouched.
    let first_doc = swapped.store.get_document(first_doc.id).unwrap();
    assert_eq!(first_doc.status, DocumentStatus::Completed);
}

// ==================== Document deletion cleans the index ====================

#[tokio::test]
async fn deleting_a_document_removes_its_vectors() {
    let fixture = fixture();
    let response = ingest_files(
        &fixture.router,
        &[("a.txt", b"Some indexed content about warehouse inventory levels.".as_slice())],
    )
    .await;
    let doc_id = response.doc_ids[0];
    assert!(fixture.index.count("docs").await.unwrap() > 0);

    let (status, body) = send_json(
        &fixture.router,
        "DELETE",
        &format!("/documents/{}", doc_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(parsed["deleted_vectors"].as_u64().unwrap() > 0);

    assert_eq!(fixture.index.count("docs").await.unwrap(), 0);

    let (status, _) = send_json(
        &fixture.router,
        "GET",
        &format!("/documents/{}", doc_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ==================== Streaming ====================

#[tokio::test]
async fn ask_stream_flushes_the_answer_incrementally() {
    let fixture = fixture();
    ingest_files(
        &fixture.router,
        &[("facts.txt", b"The warehouse opens at six in the morning on weekdays.".as_slice())],
    )
    .await;

    let request = Request::builder()
        .method("POST")
        .uri("/ask/stream")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "question": "when does the warehouse open?" }).to_string(),
        ))
        .unwrap();

    let response = fixture.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session_header = response
        .headers()
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v).ok())
        .expect("session id header");

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let streamed = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(streamed.contains("The warehouse opens at six"));

    // Both turns were recorded under the session from the header.
    let messages = fixture.store.list_messages(session_header, 10).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, streamed);
}

// ==================== Health, stats, listings ====================

#[tokio::test]
async fn health_reports_connected_collaborators() {
    let fixture = fixture();
    let (status, body) = send_json(&fixture.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["database"], "connected");
    assert_eq!(parsed["vector_index"], "connected");
    assert_eq!(parsed["stats"]["documents"], 0);
}

#[tokio::test]
async fn documents_listing_filters_and_validates_status() {
    let fixture = fixture();
    ingest_files(&fixture.router, &[("a.txt", b"alpha beta".as_slice())]).await;

    let (status, body) =
        send_json(&fixture.router, "GET", "/documents?status=completed", None).await;
    assert_eq!(status, StatusCode::OK);
    let docs: Vec<Document> = serde_json::from_slice(&body).unwrap();
    assert_eq!(docs.len(), 1);

    let (status, _) = send_json(&fixture.router, "GET", "/documents?status=bogus", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sessions_list_orders_by_recency() {
    let fixture = fixture();
    let a = ask(&fixture.router, serde_json::json!({ "question": "first session?" })).await;
    let b = ask(&fixture.router, serde_json::json!({ "question": "second session?" })).await;

    // Touch the first session again so it becomes the most recent.
    ask(
        &fixture.router,
        serde_json::json!({ "question": "follow up", "session_id": a.session_id }),
    )
    .await;

    let (status, body) = send_json(&fixture.router, "GET", "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    let sessions: Vec<Session> = serde_json::from_slice(&body).unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, a.session_id);
    assert_eq!(sessions[1].id, b.session_id);
}
