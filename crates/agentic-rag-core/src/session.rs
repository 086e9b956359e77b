//! One conversation: the agent router plus its chat history.
//!
//! A [`Session`] is the entry point the application layers call. It builds
//! the first message of each workflow, drives the workflow state machine
//! through the router, and records chat turns. Nothing here is global: two
//! sessions share no state unless they are handed the same store.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::agents::{AgentInfo, IngestionAgent, LlmResponseAgent, RetrievalAgent};
use crate::chunk::TextChunker;
use crate::llm::LanguageModel;
use crate::message::{
    AgentId, FinalResponse, IngestRequest, IngestStatus, Message, Payload, RetrievalRequest,
};
use crate::models::ChatTurn;
use crate::parser::DocumentParser;
use crate::router::Router;
use crate::store::VectorStore;
use crate::workflow::{drive, ChatAnswer, ChatState, IngestState, WorkflowError};

/// Result of a completed ingestion workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub trace_id: String,
    pub status: IngestStatus,
    pub chunks_added: usize,
}

/// Result of a completed chat workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutcome {
    pub trace_id: String,
    pub response: FinalResponse,
    /// The agent that produced the final answer.
    pub answered_by: AgentId,
}

/// Ordered chat history, append-only.
#[derive(Debug, Default)]
pub struct ConversationLog {
    turns: Mutex<Vec<ChatTurn>>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, turn: ChatTurn) {
        self.turns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(turn);
    }

    pub fn snapshot(&self) -> Vec<ChatTurn> {
        self.turns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.turns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Session {
    router: Router,
    log: ConversationLog,
}

impl Session {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            log: ConversationLog::new(),
        }
    }

    /// Wire the three standard agents around the given collaborators.
    ///
    /// The same model is used for intent classification and answer
    /// generation.
    pub fn standard(
        parser: Arc<dyn DocumentParser>,
        store: Arc<dyn VectorStore>,
        model: Arc<dyn LanguageModel>,
        chunker: TextChunker,
        top_k: usize,
    ) -> Self {
        let router = Router::new()
            .with(Box::new(IngestionAgent::new(parser, chunker)))
            .with(Box::new(
                RetrievalAgent::new(store, model.clone()).with_top_k(top_k),
            ))
            .with(Box::new(LlmResponseAgent::new(model)));
        Self::new(router)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn agents(&self) -> Vec<AgentInfo> {
        self.router.agents()
    }

    /// Chat turns so far, oldest first.
    pub fn history(&self) -> Vec<ChatTurn> {
        self.log.snapshot()
    }

    /// Parse, chunk, and store `file_paths` under one trace id.
    pub async fn ingest(&self, file_paths: Vec<PathBuf>) -> Result<IngestOutcome, WorkflowError> {
        let files = file_paths.len();
        let request = Message::new(
            AgentId::Coordinator,
            AgentId::IngestionAgent,
            Payload::IngestRequest(IngestRequest { file_paths }),
            None,
        );
        let trace_id = request.trace_id.clone();
        info!(%trace_id, files, "ingestion started");

        match drive(&self.router, IngestState::new(request)).await {
            Ok(done) => {
                info!(%trace_id, chunks = done.chunks_added, "ingestion complete");
                Ok(IngestOutcome {
                    trace_id,
                    status: done.status,
                    chunks_added: done.chunks_added,
                })
            }
            Err(e) => {
                warn!(%trace_id, error = %e, "ingestion failed");
                Err(e)
            }
        }
    }

    /// Answer `query` and record both turns in the history.
    ///
    /// The user turn is recorded before the workflow runs; the bot turn
    /// only when an answer was produced.
    pub async fn chat(&self, query: &str) -> Result<ChatOutcome, WorkflowError> {
        self.log.push(ChatTurn::user(query));

        let request = Message::new(
            AgentId::Coordinator,
            AgentId::RetrievalAgent,
            Payload::RetrievalRequest(RetrievalRequest {
                query: query.to_string(),
            }),
            None,
        );
        let trace_id = request.trace_id.clone();
        info!(%trace_id, "chat started");

        match drive(&self.router, ChatState::new(request)).await {
            Ok(ChatAnswer {
                response,
                answered_by,
            }) => {
                self.log
                    .push(ChatTurn::bot(&response.answer, response.sources.clone()));
                info!(%trace_id, %answered_by, sources = response.sources.len(), "chat answered");
                Ok(ChatOutcome {
                    trace_id,
                    response,
                    answered_by,
                })
            }
            Err(e) => {
                warn!(%trace_id, error = %e, "chat failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Speaker;

    #[test]
    fn conversation_log_keeps_order() {
        let log = ConversationLog::new();
        assert!(log.is_empty());
        log.push(ChatTurn::user("hi"));
        log.push(ChatTurn::bot("hello", vec![]));
        let turns = log.snapshot();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].sender, Speaker::User);
        assert_eq!(turns[1].sender, Speaker::Bot);
    }

    #[tokio::test]
    async fn chat_without_agents_fails_but_keeps_user_turn() {
        let session = Session::new(Router::new());
        let err = session.chat("anything").await.unwrap_err();
        assert!(matches!(err, WorkflowError::NoReply { stage: "routing", .. }));
        let history = session.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text, "anything");
    }

    #[tokio::test]
    async fn ingest_without_agents_fails() {
        let session = Session::new(Router::new());
        assert!(session.ingest(vec![PathBuf::from("a.txt")]).await.is_err());
    }
}
