//! Workflow state machines.
//!
//! Each user-facing workflow is a small state machine whose non-terminal
//! states hold the one message that must be routed next. The driver routes
//! that message, feeds the single reply into [`Workflow::on_reply`], and
//! repeats until a terminal state. The transitions fix the hop count: the
//! router never forwards anything on its own.
//!
//! # Ingestion
//!
//! ```text
//! Chunking ──EMBED_AND_STORE_REQUEST──▶ Storing ──INGEST_COMPLETE──▶ Complete
//!     │                                    │
//!     └────────── anything else ───────────┴──────────────────────▶ Failed
//! ```
//!
//! # Chat
//!
//! ```text
//! Routing ──FINAL_RESPONSE (greeting)─────────────────────────────▶ Answered
//!    │
//!    └──CONTEXT_RESPONSE──▶ Answering ──FINAL_RESPONSE──────────▶ Answered
//!
//! any missing or unexpected reply ───────────────────────────────▶ Failed
//! ```

use std::fmt;

use tracing::debug;

use crate::message::{AgentId, FinalResponse, IngestComplete, Message, MessageType, Payload};
use crate::router::Router;

/// Where a workflow stopped because a hop did not produce the expected reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("{workflow} workflow: no reply while {stage}")]
    NoReply {
        workflow: &'static str,
        stage: &'static str,
    },
    #[error("{workflow} workflow: unexpected {got} addressed to {receiver} while {stage}")]
    UnexpectedReply {
        workflow: &'static str,
        stage: &'static str,
        got: MessageType,
        receiver: AgentId,
    },
    #[error("{workflow} workflow stopped before finishing while {stage}")]
    Incomplete {
        workflow: &'static str,
        stage: &'static str,
    },
}

impl WorkflowError {
    /// The state the workflow was in when it failed.
    pub fn stage(&self) -> &'static str {
        match self {
            WorkflowError::NoReply { stage, .. }
            | WorkflowError::UnexpectedReply { stage, .. }
            | WorkflowError::Incomplete { stage, .. } => *stage,
        }
    }

    fn from_reply(workflow: &'static str, stage: &'static str, reply: Option<Message>) -> Self {
        match reply {
            None => WorkflowError::NoReply { workflow, stage },
            Some(m) => WorkflowError::UnexpectedReply {
                workflow,
                stage,
                got: m.kind(),
                receiver: m.receiver,
            },
        }
    }
}

/// A workflow state machine the driver can step through.
pub trait Workflow: Sized {
    /// What a successful run produces.
    type Output;

    /// The message to route next, or `None` in a terminal state.
    fn pending(&self) -> Option<&Message>;

    /// Consume the reply to the pending message and move to the next state.
    ///
    /// Calling this in a terminal state returns the state unchanged.
    fn on_reply(self, reply: Option<Message>) -> Self;

    /// Short state name for logs.
    fn state_name(&self) -> &'static str;

    /// Convert a state into the workflow result.
    ///
    /// Non-terminal states yield [`WorkflowError::Incomplete`].
    fn finish(self) -> Result<Self::Output, WorkflowError>;
}

/// Route pending messages through `router` until `state` is terminal.
pub async fn run_to_end<W: Workflow>(router: &Router, mut state: W) -> W {
    while let Some(message) = state.pending() {
        let trace_id = message.trace_id.clone();
        let from = state.state_name();
        let reply = router.route(message).await;
        state = state.on_reply(reply);
        debug!(%trace_id, from, to = state.state_name(), "workflow transition");
    }
    state
}

/// Run a workflow to its terminal state and return its result.
pub async fn drive<W: Workflow>(router: &Router, state: W) -> Result<W::Output, WorkflowError> {
    run_to_end(router, state).await.finish()
}

// ═══════════════════════════════════════════════════════════════════════
// Ingestion
// ═══════════════════════════════════════════════════════════════════════

/// Ingestion workflow: two hops, chunk then store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestState {
    /// `INGEST_REQUEST` pending for the ingestion agent.
    Chunking(Message),
    /// `EMBED_AND_STORE_REQUEST` pending for the retrieval agent.
    Storing(Message),
    Complete(IngestComplete),
    Failed(WorkflowError),
}

impl IngestState {
    const WORKFLOW: &'static str = "ingest";

    pub fn new(request: Message) -> Self {
        IngestState::Chunking(request)
    }
}

impl Workflow for IngestState {
    type Output = IngestComplete;

    fn pending(&self) -> Option<&Message> {
        match self {
            IngestState::Chunking(m) | IngestState::Storing(m) => Some(m),
            IngestState::Complete(_) | IngestState::Failed(_) => None,
        }
    }

    fn on_reply(self, reply: Option<Message>) -> Self {
        match self {
            IngestState::Chunking(_) => match reply {
                Some(m)
                    if m.kind() == MessageType::EmbedAndStoreRequest
                        && m.receiver == AgentId::RetrievalAgent =>
                {
                    IngestState::Storing(m)
                }
                other => IngestState::Failed(WorkflowError::from_reply(
                    Self::WORKFLOW,
                    "chunking",
                    other,
                )),
            },
            IngestState::Storing(_) => match reply {
                Some(Message {
                    receiver: AgentId::Coordinator,
                    payload: Payload::IngestComplete(done),
                    ..
                }) => IngestState::Complete(done),
                other => IngestState::Failed(WorkflowError::from_reply(
                    Self::WORKFLOW,
                    "storing",
                    other,
                )),
            },
            terminal => terminal,
        }
    }

    fn state_name(&self) -> &'static str {
        match self {
            IngestState::Chunking(_) => "chunking",
            IngestState::Storing(_) => "storing",
            IngestState::Complete(_) => "complete",
            IngestState::Failed(_) => "failed",
        }
    }

    fn finish(self) -> Result<IngestComplete, WorkflowError> {
        match self {
            IngestState::Complete(done) => Ok(done),
            IngestState::Failed(e) => Err(e),
            pending => Err(WorkflowError::Incomplete {
                workflow: Self::WORKFLOW,
                stage: pending.state_name(),
            }),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Chat
// ═══════════════════════════════════════════════════════════════════════

/// The final answer of a chat workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAnswer {
    pub response: FinalResponse,
    /// The agent that produced the answer.
    pub answered_by: AgentId,
}

/// Chat workflow: retrieval, then generation unless the query was a greeting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatState {
    /// `RETRIEVAL_REQUEST` pending for the retrieval agent.
    Routing(Message),
    /// `CONTEXT_RESPONSE` pending for the response agent.
    Answering(Message),
    Answered(ChatAnswer),
    Failed(WorkflowError),
}

impl ChatState {
    const WORKFLOW: &'static str = "chat";

    pub fn new(request: Message) -> Self {
        ChatState::Routing(request)
    }

    fn answered(reply: Message) -> Result<Self, Message> {
        match reply {
            Message {
                sender,
                receiver: AgentId::Coordinator,
                payload: Payload::FinalResponse(response),
                ..
            } => Ok(ChatState::Answered(ChatAnswer {
                response,
                answered_by: sender,
            })),
            other => Err(other),
        }
    }
}

impl Workflow for ChatState {
    type Output = ChatAnswer;

    fn pending(&self) -> Option<&Message> {
        match self {
            ChatState::Routing(m) | ChatState::Answering(m) => Some(m),
            ChatState::Answered(_) | ChatState::Failed(_) => None,
        }
    }

    fn on_reply(self, reply: Option<Message>) -> Self {
        match self {
            ChatState::Routing(_) => {
                let Some(reply) = reply else {
                    return ChatState::Failed(WorkflowError::NoReply {
                        workflow: Self::WORKFLOW,
                        stage: "routing",
                    });
                };
                match Self::answered(reply) {
                    Ok(done) => done,
                    Err(m)
                        if m.kind() == MessageType::ContextResponse
                            && m.receiver == AgentId::LlmResponseAgent =>
                    {
                        ChatState::Answering(m)
                    }
                    Err(m) => ChatState::Failed(WorkflowError::from_reply(
                        Self::WORKFLOW,
                        "routing",
                        Some(m),
                    )),
                }
            }
            ChatState::Answering(_) => match reply.map(Self::answered) {
                Some(Ok(done)) => done,
                Some(Err(m)) => ChatState::Failed(WorkflowError::from_reply(
                    Self::WORKFLOW,
                    "answering",
                    Some(m),
                )),
                None => ChatState::Failed(WorkflowError::NoReply {
                    workflow: Self::WORKFLOW,
                    stage: "answering",
                }),
            },
            terminal => terminal,
        }
    }

    fn state_name(&self) -> &'static str {
        match self {
            ChatState::Routing(_) => "routing",
            ChatState::Answering(_) => "answering",
            ChatState::Answered(_) => "answered",
            ChatState::Failed(_) => "failed",
        }
    }

    fn finish(self) -> Result<ChatAnswer, WorkflowError> {
        match self {
            ChatState::Answered(answer) => Ok(answer),
            ChatState::Failed(e) => Err(e),
            pending => Err(WorkflowError::Incomplete {
                workflow: Self::WORKFLOW,
                stage: pending.state_name(),
            }),
        }
    }
}

impl fmt::Display for ChatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_name())
    }
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{
        ContextResponse, EmbedAndStoreRequest, IngestRequest, IngestStatus, RetrievalRequest,
    };

    fn msg(sender: AgentId, receiver: AgentId, payload: Payload) -> Message {
        Message::new(sender, receiver, payload, Some("t".into()))
    }

    fn final_response(answer: &str) -> Payload {
        Payload::FinalResponse(FinalResponse {
            answer: answer.into(),
            sources: vec![],
        })
    }

    fn retrieval_request() -> Message {
        msg(
            AgentId::Coordinator,
            AgentId::RetrievalAgent,
            Payload::RetrievalRequest(RetrievalRequest { query: "q".into() }),
        )
    }

    #[test]
    fn ingest_happy_path_takes_two_hops() {
        let start = IngestState::new(msg(
            AgentId::Coordinator,
            AgentId::IngestionAgent,
            Payload::IngestRequest(IngestRequest { file_paths: vec![] }),
        ));
        let store = msg(
            AgentId::IngestionAgent,
            AgentId::RetrievalAgent,
            Payload::EmbedAndStoreRequest(EmbedAndStoreRequest { chunks: vec![] }),
        );
        let s1 = start.on_reply(Some(store.clone()));
        assert_eq!(s1, IngestState::Storing(store));

        let done = IngestComplete {
            status: IngestStatus::Success,
            chunks_added: 0,
        };
        let s2 = s1.on_reply(Some(msg(
            AgentId::RetrievalAgent,
            AgentId::Coordinator,
            Payload::IngestComplete(done.clone()),
        )));
        assert_eq!(s2, IngestState::Complete(done));
        assert!(s2.pending().is_none());
    }

    #[test]
    fn ingest_fails_on_missing_reply() {
        let start = IngestState::new(msg(
            AgentId::Coordinator,
            AgentId::IngestionAgent,
            Payload::IngestRequest(IngestRequest { file_paths: vec![] }),
        ));
        assert_eq!(
            start.on_reply(None),
            IngestState::Failed(WorkflowError::NoReply {
                workflow: "ingest",
                stage: "chunking"
            })
        );
    }

    #[test]
    fn greeting_answer_short_circuits_chat() {
        let s = ChatState::new(retrieval_request()).on_reply(Some(msg(
            AgentId::RetrievalAgent,
            AgentId::Coordinator,
            final_response("hello"),
        )));
        assert_eq!(
            s,
            ChatState::Answered(ChatAnswer {
                response: FinalResponse {
                    answer: "hello".into(),
                    sources: vec![]
                },
                answered_by: AgentId::RetrievalAgent,
            })
        );
    }

    #[test]
    fn context_response_moves_to_answering_then_answered() {
        let ctx = msg(
            AgentId::RetrievalAgent,
            AgentId::LlmResponseAgent,
            Payload::ContextResponse(ContextResponse {
                retrieved_context: vec![],
                query: "q".into(),
            }),
        );
        let s = ChatState::new(retrieval_request()).on_reply(Some(ctx.clone()));
        assert_eq!(s, ChatState::Answering(ctx));
        let s = s.on_reply(Some(msg(
            AgentId::LlmResponseAgent,
            AgentId::Coordinator,
            final_response("answer"),
        )));
        assert!(matches!(
            s,
            ChatState::Answered(ChatAnswer {
                answered_by: AgentId::LlmResponseAgent,
                ..
            })
        ));
    }

    #[test]
    fn unexpected_reply_fails_chat() {
        let s = ChatState::new(retrieval_request()).on_reply(Some(retrieval_request()));
        assert_eq!(
            s,
            ChatState::Failed(WorkflowError::UnexpectedReply {
                workflow: "chat",
                stage: "routing",
                got: MessageType::RetrievalRequest,
                receiver: AgentId::RetrievalAgent,
            })
        );
    }

    #[test]
    fn final_response_not_for_coordinator_is_rejected() {
        let s = ChatState::new(retrieval_request()).on_reply(Some(msg(
            AgentId::RetrievalAgent,
            AgentId::IngestionAgent,
            final_response("misrouted"),
        )));
        assert!(matches!(s, ChatState::Failed(_)));
    }

    #[test]
    fn terminal_states_ignore_further_replies() {
        let failed = ChatState::Failed(WorkflowError::NoReply {
            workflow: "chat",
            stage: "routing",
        });
        assert_eq!(failed.clone().on_reply(Some(retrieval_request())), failed);
    }

    #[test]
    fn finishing_early_is_an_error() {
        let err = ChatState::new(retrieval_request()).finish().unwrap_err();
        assert_eq!(
            err,
            WorkflowError::Incomplete {
                workflow: "chat",
                stage: "routing"
            }
        );
    }

    #[tokio::test]
    async fn drive_stops_at_failure_when_nothing_is_registered() {
        let router = Router::new();
        let end = run_to_end(&router, ChatState::new(retrieval_request())).await;
        assert_eq!(end.state_name(), "failed");
        assert!(drive(&router, ChatState::new(retrieval_request())).await.is_err());
    }
}
