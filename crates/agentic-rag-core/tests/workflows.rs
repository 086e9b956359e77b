//! End-to-end workflow tests over in-memory collaborators.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use agentic_rag_core::agents::{IngestionAgent, RetrievalAgent, GREETING_ANSWER, NO_CONTEXT_ANSWER};
use agentic_rag_core::chunk::TextChunker;
use agentic_rag_core::llm::{LanguageModel, LlmError};
use agentic_rag_core::message::{
    AgentId, ContextResponse, IngestRequest, IngestStatus, Message, MessageType, Payload,
    RetrievalRequest,
};
use agentic_rag_core::models::{ChunkRecord, Speaker, StoredChunk};
use agentic_rag_core::parser::{DocumentParser, ParseError};
use agentic_rag_core::store::memory::InMemoryStore;
use agentic_rag_core::store::{StoreError, VectorStore};
use agentic_rag_core::{Router, Session, WorkflowError};

// ═══════════════════════════════════════════════════════════════════════
// Fakes
// ═══════════════════════════════════════════════════════════════════════

/// Parser backed by a path → text map; unknown paths fail to parse.
struct MapParser(HashMap<PathBuf, String>);

impl MapParser {
    fn new(files: &[(&str, String)]) -> Self {
        Self(
            files
                .iter()
                .map(|(p, t)| (PathBuf::from(p), t.clone()))
                .collect(),
        )
    }
}

#[async_trait]
impl DocumentParser for MapParser {
    async fn parse(&self, path: &Path) -> Result<String, ParseError> {
        self.0.get(path).cloned().ok_or_else(|| ParseError::Extract {
            path: path.to_path_buf(),
            message: "corrupt document".into(),
        })
    }
}

/// Store wrapper that counts queries.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryStore,
    queries: AtomicUsize,
}

#[async_trait]
impl VectorStore for CountingStore {
    async fn add(&self, chunks: &[StoredChunk]) -> Result<(), StoreError> {
        self.inner.add(chunks).await
    }

    async fn query(&self, text: &str, limit: usize) -> Result<Vec<ChunkRecord>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(text, limit).await
    }

    async fn count(&self) -> Result<usize, StoreError> {
        self.inner.count().await
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.inner.reset().await
    }
}

/// Classifies anything starting with "hello" as a greeting and answers
/// everything else with a fixed string. Counts generation calls.
#[derive(Default)]
struct ScriptedModel {
    generations: AtomicUsize,
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        if prompt.starts_with("Classify") {
            return Ok(if prompt.contains("User Query: \"hello") {
                "greeting".into()
            } else {
                "rag_query".into()
            });
        }
        self.generations.fetch_add(1, Ordering::SeqCst);
        Ok("Refunds are accepted within 30 days.".into())
    }
}

struct Harness {
    session: Session,
    store: Arc<CountingStore>,
    model: Arc<ScriptedModel>,
}

fn harness(files: &[(&str, String)]) -> Harness {
    let store = Arc::new(CountingStore::default());
    let model = Arc::new(ScriptedModel::default());
    let session = Session::standard(
        Arc::new(MapParser::new(files)),
        store.clone(),
        model.clone(),
        TextChunker::default(),
        5,
    );
    Harness {
        session,
        store,
        model,
    }
}

fn words_of_len(n: usize) -> String {
    let mut text = (0..)
        .map(|i| format!("w{:04}", i))
        .take(n / 5 + 1)
        .collect::<Vec<_>>()
        .join(" ");
    text.truncate(n);
    text
}

/// Length of the longest suffix of `a` that is also a prefix of `b`.
fn overlap_len(a: &str, b: &str) -> usize {
    let max = a.len().min(b.len());
    (1..=max)
        .rev()
        .find(|&k| a.is_char_boundary(a.len() - k) && b.is_char_boundary(k) && a[a.len() - k..] == b[..k])
        .unwrap_or(0)
}

// ═══════════════════════════════════════════════════════════════════════
// Scenarios
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn scenario_a_ingesting_a_long_text_file() {
    let text = words_of_len(2500);
    assert_eq!(text.chars().count(), 2500);
    let h = harness(&[("uploads/long.txt", text)]);

    let outcome = h
        .session
        .ingest(vec![PathBuf::from("uploads/long.txt")])
        .await
        .unwrap();

    assert_eq!(outcome.status, IngestStatus::Success);
    assert!(outcome.chunks_added >= 2);
    assert_eq!(h.store.count().await.unwrap(), outcome.chunks_added);

    let chunks = h.store.inner.query("", 100).await.unwrap();
    assert_eq!(chunks.len(), outcome.chunks_added);
    for c in &chunks {
        assert!(c.text.chars().count() <= 1000);
        assert_eq!(c.source, "uploads/long.txt");
    }
    for pair in chunks.windows(2) {
        let overlap = overlap_len(&pair[0].text, &pair[1].text);
        assert!(overlap > 0, "consecutive chunks should overlap");
        assert!(overlap <= 200, "overlap {overlap} exceeds 200");
    }
}

#[tokio::test]
async fn scenario_b_greeting_with_empty_store() {
    let h = harness(&[]);
    let outcome = h.session.chat("hello there").await.unwrap();

    assert_eq!(outcome.answered_by, AgentId::RetrievalAgent);
    assert_eq!(outcome.response.answer, GREETING_ANSWER);
    assert!(outcome.response.sources.is_empty());
    assert_eq!(h.store.queries.load(Ordering::SeqCst), 0);
    assert_eq!(h.model.generations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scenario_c_query_with_three_matching_chunks() {
    let h = harness(&[]);
    let chunks: Vec<StoredChunk> = [
        ("Our refund policy allows returns.", "uploads/policy.txt"),
        ("The refund policy excludes sale items.", "uploads/policy.txt"),
        ("What is covered by the refund policy?", "docs/faq.md"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (text, source))| StoredChunk {
        id: format!("c{i}"),
        record: ChunkRecord::new(*text, *source),
    })
    .collect();
    h.store.add(&chunks).await.unwrap();

    // Retrieval hop on its own: exactly min(5, 3) chunks.
    let retrieval = h
        .session
        .router()
        .route(&Message::new(
            AgentId::Coordinator,
            AgentId::RetrievalAgent,
            Payload::RetrievalRequest(RetrievalRequest {
                query: "what is the refund policy?".into(),
            }),
            None,
        ))
        .await
        .unwrap();
    let Payload::ContextResponse(ctx) = &retrieval.payload else {
        panic!("expected CONTEXT_RESPONSE, got {}", retrieval.kind());
    };
    assert_eq!(ctx.retrieved_context.len(), 3);

    let outcome = h.session.chat("what is the refund policy?").await.unwrap();
    assert_eq!(outcome.answered_by, AgentId::LlmResponseAgent);
    assert_eq!(outcome.response.answer, "Refunds are accepted within 30 days.");
    // Ranked by term overlap: the FAQ chunk matches the most query terms.
    assert_eq!(
        outcome.response.sources,
        vec!["faq.md".to_string(), "policy.txt".to_string()]
    );
}

#[tokio::test]
async fn scenario_d_unparseable_file_is_skipped() {
    let h = harness(&[("uploads/good.txt", "Refunds within 30 days.".to_string())]);
    let outcome = h
        .session
        .ingest(vec![
            PathBuf::from("uploads/broken.pdf"),
            PathBuf::from("uploads/good.txt"),
        ])
        .await
        .unwrap();

    assert_eq!(outcome.status, IngestStatus::Success);
    assert_eq!(outcome.chunks_added, 1);
    let stored = h.store.inner.query("refunds", 10).await.unwrap();
    assert!(stored.iter().all(|c| c.source == "uploads/good.txt"));
}

// ═══════════════════════════════════════════════════════════════════════
// Properties
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn empty_context_never_invokes_generator() {
    let h = harness(&[]);
    let outcome = h.session.chat("what is the refund policy?").await.unwrap();
    assert_eq!(outcome.response.answer, NO_CONTEXT_ANSWER);
    assert!(outcome.response.sources.is_empty());
    assert_eq!(h.model.generations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retrieval_never_exceeds_stored_count_or_five() {
    let h = harness(&[]);
    for n in [0usize, 2, 5, 9] {
        h.store.reset().await.unwrap();
        let chunks: Vec<StoredChunk> = (0..n)
            .map(|i| StoredChunk {
                id: format!("{n}-{i}"),
                record: ChunkRecord::new(format!("policy chunk {i}"), "a.txt"),
            })
            .collect();
        h.store.add(&chunks).await.unwrap();

        let reply = h
            .session
            .router()
            .route(&Message::new(
                AgentId::Coordinator,
                AgentId::RetrievalAgent,
                Payload::RetrievalRequest(RetrievalRequest {
                    query: "policy".into(),
                }),
                None,
            ))
            .await
            .unwrap();
        let Payload::ContextResponse(ContextResponse {
            retrieved_context, ..
        }) = reply.payload
        else {
            panic!("expected CONTEXT_RESPONSE");
        };
        assert_eq!(retrieved_context.len(), n.min(5));
    }
}

#[tokio::test]
async fn every_hop_shares_the_request_trace_id() {
    let h = harness(&[("a.txt", "alpha".to_string())]);
    let request = Message::new(
        AgentId::Coordinator,
        AgentId::IngestionAgent,
        Payload::IngestRequest(IngestRequest {
            file_paths: vec![PathBuf::from("a.txt")],
        }),
        Some("trace-123".into()),
    );
    let hop1 = h.session.router().route(&request).await.unwrap();
    let hop2 = h.session.router().route(&hop1).await.unwrap();
    assert_eq!(hop1.trace_id, "trace-123");
    assert_eq!(hop2.trace_id, "trace-123");
    assert_eq!(hop2.kind(), MessageType::IngestComplete);
}

#[tokio::test]
async fn chat_records_user_and_bot_turns() {
    let h = harness(&[]);
    h.session.chat("hello").await.unwrap();
    h.session.chat("what is the refund policy?").await.unwrap();

    let history = h.session.history();
    let speakers: Vec<Speaker> = history.iter().map(|t| t.sender).collect();
    assert_eq!(
        speakers,
        vec![Speaker::User, Speaker::Bot, Speaker::User, Speaker::Bot]
    );
    assert_eq!(history[1].text, GREETING_ANSWER);
    assert_eq!(history[3].sources, Some(vec![]));
}

#[tokio::test]
async fn missing_response_agent_is_a_routing_failure() {
    let store = Arc::new(InMemoryStore::new());
    let model = Arc::new(ScriptedModel::default());
    let router = Router::new()
        .with(Box::new(IngestionAgent::new(
            Arc::new(MapParser::new(&[])),
            TextChunker::default(),
        )))
        .with(Box::new(RetrievalAgent::new(store, model)));
    let session = Session::new(router);

    let err = session.chat("what is the refund policy?").await.unwrap_err();
    assert_eq!(
        err,
        WorkflowError::NoReply {
            workflow: "chat",
            stage: "answering"
        }
    );
    // Only the user turn was recorded.
    assert_eq!(session.history().len(), 1);
}

#[tokio::test]
async fn standard_session_lists_three_agents() {
    let h = harness(&[]);
    let names: Vec<String> = h.session.agents().into_iter().map(|a| a.name).collect();
    assert_eq!(
        names,
        vec!["IngestionAgent", "RetrievalAgent", "LLMResponseAgent"]
    );
}
