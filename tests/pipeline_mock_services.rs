//! End-to-end pipeline tests against a mock Gemini server.
//!
//! These drive the real wire clients and the SQLite backend through full
//! ingest-then-answer flows, with httpmock standing in for the external
//! service so runs are deterministic and offline.

use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

use handbook_rag::config::{PipelineConfig, ServiceConfig};
use handbook_rag::ingest::{IngestOptions, IngestionPipeline};
use handbook_rag::query::{QueryPipeline, APOLOGY};
use handbook_rag::services::{GeminiEmbedder, GeminiGenerator};
use handbook_rag::store::{MemoryStore, PassageStore, SqlitePassageStore};

const ATTENDANCE_PARAGRAPH: &str = "Attendance requirement: students must maintain a minimum of \
     75% attendance in every course to stay eligible for the end of term examinations held yearly.";

const LIBRARY_PARAGRAPH: &str = "Library loans run for fourteen days and overdue items accrue a \
     fine of five rupees per day until the borrowed volume is finally returned to the front desk.";

fn handbook_text() -> String {
    format!("{ATTENDANCE_PARAGRAPH}\n\n{LIBRARY_PARAGRAPH}")
}

/// Captures pipeline tracing during test runs; `RUST_LOG` controls the
/// filter. Safe to call from every test, later calls are no-ops.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Chunk bound sized so each handbook paragraph becomes its own chunk, with
/// batching delays tightened for test speed.
fn test_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_chunking(160, 0)
        .with_batching(5, Duration::from_millis(1))
}

/// Routes embedding requests by content: attendance text and questions map
/// to one axis, library text to the orthogonal one.
fn mock_embeddings(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/text-embedding-004:embedContent")
            .body_contains("Attendance requirement");
        then.status(200)
            .json_body(serde_json::json!({"embedding": {"values": [1.0, 0.0]}}));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/text-embedding-004:embedContent")
            .body_contains("attendance percentage");
        then.status(200)
            .json_body(serde_json::json!({"embedding": {"values": [1.0, 0.0]}}));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/text-embedding-004:embedContent")
            .body_contains("Library loans");
        then.status(200)
            .json_body(serde_json::json!({"embedding": {"values": [0.0, 1.0]}}));
    });
}

fn mock_generation(server: &MockServer, answer: &str) {
    server.mock(|when, then| {
        when.method(GET).path("/v1beta/models");
        then.status(200).json_body(serde_json::json!({
            "models": [
                {"name": "models/gemini-2.5-flash",
                 "supportedGenerationMethods": ["generateContent"]}
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-2.5-flash:generateContent");
        then.status(200).json_body(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": answer}]}}]
        }));
    });
}

#[tokio::test]
async fn ingest_then_answer_over_sqlite() {
    init_tracing();
    let server = MockServer::start();
    mock_embeddings(&server);
    mock_generation(&server, "Minimum 75% attendance is required to sit examinations.");

    let service = ServiceConfig::new("test-key", server.base_url());
    let config = test_config();
    let dir = tempdir().unwrap();
    let store = Arc::new(
        SqlitePassageStore::open(dir.path().join("handbook.db"))
            .await
            .unwrap(),
    );
    let embedder = Arc::new(GeminiEmbedder::new(service.clone()));

    let ingestion = IngestionPipeline::new(embedder.clone(), store.clone(), config.clone());
    let stats = ingestion
        .ingest(&[handbook_text()], IngestOptions::new("Student Handbook"))
        .await
        .unwrap();

    assert_eq!(stats.chunks_total, 2);
    assert_eq!(stats.chunks_succeeded, 2);
    assert_eq!(stats.chunks_failed, 0);
    assert_eq!(store.count().await.unwrap(), 2);

    let log = Arc::new(MemoryStore::new());
    let queries = QueryPipeline::new(
        embedder,
        Arc::new(GeminiGenerator::new(service)),
        store,
        config,
    )
    .with_query_log(log.clone());

    let outcome = queries
        .answer("What attendance percentage is required?", 3)
        .await
        .unwrap();

    assert_eq!(
        outcome.answer,
        "Minimum 75% attendance is required to sit examinations."
    );
    assert_eq!(outcome.used_model.as_deref(), Some("models/gemini-2.5-flash"));
    assert_eq!(outcome.sources.len(), 1);
    assert_eq!(outcome.sources[0].title, "Student Handbook (Part 1/2)");
    assert!(outcome.sources[0].similarity > 1.0);
    assert_eq!(
        log.recorded_queries().await,
        vec!["What attendance percentage is required?"]
    );
}

#[tokio::test]
async fn reingestion_replaces_prior_passages() {
    init_tracing();
    let server = MockServer::start();
    mock_embeddings(&server);

    let service = ServiceConfig::new("test-key", server.base_url());
    let config = test_config();
    let dir = tempdir().unwrap();
    let store = Arc::new(
        SqlitePassageStore::open(dir.path().join("handbook.db"))
            .await
            .unwrap(),
    );
    let ingestion = IngestionPipeline::new(
        Arc::new(GeminiEmbedder::new(service)),
        store.clone(),
        config,
    );

    let options = || IngestOptions::new("Student Handbook").with_category("policy");
    ingestion
        .ingest(&[handbook_text()], options())
        .await
        .unwrap();
    let stats = ingestion
        .ingest(&[handbook_text()], options())
        .await
        .unwrap();

    assert!(stats.cleanup.is_completed());
    assert_eq!(store.count().await.unwrap(), 2);
}

// An off-topic question must short-circuit to the apology without ever
// touching the generation endpoints.
#[tokio::test]
async fn off_topic_question_never_reaches_generation() {
    init_tracing();
    let server = MockServer::start();
    mock_embeddings(&server);
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/text-embedding-004:embedContent")
            .body_contains("hostel curfew");
        then.status(200)
            .json_body(serde_json::json!({"embedding": {"values": [0.0, -1.0]}}));
    });
    let list_models = server.mock(|when, then| {
        when.method(GET).path("/v1beta/models");
        then.status(200).json_body(serde_json::json!({"models": []}));
    });

    let service = ServiceConfig::new("test-key", server.base_url());
    let config = test_config();
    let store = Arc::new(MemoryStore::new());
    let embedder = Arc::new(GeminiEmbedder::new(service.clone()));

    let ingestion = IngestionPipeline::new(embedder.clone(), store.clone(), config.clone());
    ingestion
        .ingest(
            &[LIBRARY_PARAGRAPH.to_string()],
            IngestOptions::new("Student Handbook"),
        )
        .await
        .unwrap();

    let queries = QueryPipeline::new(
        embedder,
        Arc::new(GeminiGenerator::new(service)),
        store,
        config,
    );
    let outcome = queries
        .answer("What is the hostel curfew policy?", 3)
        .await
        .unwrap();

    assert_eq!(outcome.answer, APOLOGY);
    assert!(outcome.used_model.is_none());
    assert_eq!(list_models.hits(), 0);
}
