use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::llm::{LanguageModel, LlmError};
use crate::message::{
    AgentId, ContextResponse, EmbedAndStoreRequest, FinalResponse, IngestComplete, IngestStatus,
    Message, Payload, RetrievalRequest,
};
use crate::models::{ChunkRecord, Intent, StoredChunk};
use crate::store::{StoreError, VectorStore};

use super::Agent;

/// Default number of chunks retrieved per query.
pub const DEFAULT_TOP_K: usize = 5;

/// Canned reply for conversational queries.
pub const GREETING_ANSWER: &str = "Hello! How can I help you with your documents?";

/// Stores chunks, classifies query intent, and retrieves context.
///
/// # Query path
///
/// ```text
/// received ─▶ classifying ─┬─ greeting ─▶ FINAL_RESPONSE ─▶ Coordinator
///                          └─ rag_query ─▶ retrieving ─▶ CONTEXT_RESPONSE ─▶ LLMResponseAgent
/// ```
///
/// Classification fails open: if the model errors or answers anything
/// other than "greeting", the query is treated as a RAG query.
pub struct RetrievalAgent {
    store: Arc<dyn VectorStore>,
    classifier: Arc<dyn LanguageModel>,
    top_k: usize,
}

impl RetrievalAgent {
    pub fn new(store: Arc<dyn VectorStore>, classifier: Arc<dyn LanguageModel>) -> Self {
        Self {
            store,
            classifier,
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Override how many chunks a query retrieves (at least 1).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Ask the model to label `query`.
    ///
    /// Returns the model's verdict, or the classifier error so the caller
    /// can decide the fallback.
    async fn classify(&self, query: &str) -> Result<Intent, LlmError> {
        let label = self.classifier.generate(&intent_prompt(query)).await?;
        Ok(Intent::from_label(&label))
    }

    async fn classify_intent(&self, message: &Message, query: &str) -> Intent {
        match self.classify(query).await {
            Ok(intent) => intent,
            Err(LlmError::NotConfigured) => Intent::RagQuery,
            Err(e) => {
                warn!(trace_id = %message.trace_id, error = %e, "intent classification failed; assuming rag_query");
                Intent::RagQuery
            }
        }
    }

    async fn store_chunks(&self, chunks: &[ChunkRecord]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let batch: Vec<StoredChunk> = chunks
            .iter()
            .map(|record| StoredChunk {
                id: Uuid::new_v4().to_string(),
                record: record.clone(),
            })
            .collect();
        self.store.add(&batch).await?;
        debug!(added = batch.len(), "stored chunks");
        Ok(())
    }

    async fn retrieve_context(&self, query: &str) -> Result<Vec<ChunkRecord>, StoreError> {
        let stored = self.store.count().await?;
        if stored == 0 {
            return Ok(Vec::new());
        }
        let limit = self.top_k.min(stored);
        let mut hits = self.store.query(query, limit).await?;
        hits.truncate(limit);
        Ok(hits)
    }

    async fn handle_store(&self, message: &Message, request: &EmbedAndStoreRequest) -> Option<Message> {
        if let Err(e) = self.store_chunks(&request.chunks).await {
            error!(trace_id = %message.trace_id, error = %e, "failed to store chunks");
            return None;
        }
        Some(message.reply(
            self.id(),
            AgentId::Coordinator,
            Payload::IngestComplete(IngestComplete {
                status: IngestStatus::Success,
                chunks_added: request.chunks.len(),
            }),
        ))
    }

    async fn handle_query(&self, message: &Message, request: &RetrievalRequest) -> Message {
        let intent = self.classify_intent(message, &request.query).await;
        info!(trace_id = %message.trace_id, intent = intent.as_str(), "classified intent");

        if intent == Intent::Greeting {
            return message.reply(
                self.id(),
                AgentId::Coordinator,
                Payload::FinalResponse(FinalResponse {
                    answer: GREETING_ANSWER.to_string(),
                    sources: Vec::new(),
                }),
            );
        }

        let retrieved_context = match self.retrieve_context(&request.query).await {
            Ok(context) => context,
            Err(e) => {
                warn!(trace_id = %message.trace_id, error = %e, "retrieval failed; answering without context");
                Vec::new()
            }
        };
        debug!(trace_id = %message.trace_id, chunks = retrieved_context.len(), "retrieved context");

        message.reply(
            self.id(),
            AgentId::LlmResponseAgent,
            Payload::ContextResponse(ContextResponse {
                retrieved_context,
                query: request.query.clone(),
            }),
        )
    }
}

/// Fixed instruction asking the model to label a query.
fn intent_prompt(query: &str) -> String {
    format!(
        r#"Classify the user's query into exactly one of two categories:
1. "greeting": hellos, goodbyes, thank-yous, and other conversational pleasantries.
2. "rag_query": any question that requires looking up specific information, facts, or details.

User Query: "{query}"
Classification:"#
    )
}

#[async_trait]
impl Agent for RetrievalAgent {
    fn id(&self) -> AgentId {
        AgentId::RetrievalAgent
    }

    fn description(&self) -> &str {
        "Stores chunks, routes queries by intent, and retrieves matching context"
    }

    async fn process_message(&self, message: &Message) -> Option<Message> {
        match &message.payload {
            Payload::EmbedAndStoreRequest(request) => self.handle_store(message, request).await,
            Payload::RetrievalRequest(request) => Some(self.handle_query(message, request).await),
            _ => None,
        }
    }
}
