use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::llm::{LanguageModel, LlmError};
use crate::message::{AgentId, ContextResponse, FinalResponse, Message, Payload};
use crate::models::ChunkRecord;

use super::Agent;

/// Answer when retrieval found nothing to ground a reply in.
pub const NO_CONTEXT_ANSWER: &str =
    "I could not find any relevant information in the documents to answer your question.";

/// Answer substituted when the model call fails.
pub const GENERATION_FAILED_ANSWER: &str =
    "Sorry, I encountered an error while generating a response.";

/// Answer substituted when no model is configured at all.
pub const MODEL_NOT_CONFIGURED_ANSWER: &str =
    "The AI model is not configured. Please check your API key.";

/// Turns retrieved context into a grounded natural-language answer.
///
/// The model is called at most once per message, and never when the
/// context is empty. Any model failure degrades to a fixed answer string;
/// the reply is always a `FINAL_RESPONSE`.
pub struct LlmResponseAgent {
    generator: Arc<dyn LanguageModel>,
}

impl LlmResponseAgent {
    pub fn new(generator: Arc<dyn LanguageModel>) -> Self {
        Self { generator }
    }

    async fn answer(&self, message: &Message, request: &ContextResponse) -> FinalResponse {
        if request.retrieved_context.is_empty() {
            return FinalResponse {
                answer: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            };
        }

        let prompt = answer_prompt(&request.query, &request.retrieved_context);
        let answer = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(LlmError::NotConfigured) => {
                return FinalResponse {
                    answer: MODEL_NOT_CONFIGURED_ANSWER.to_string(),
                    sources: Vec::new(),
                };
            }
            Err(e) => {
                warn!(
                    trace_id = %message.trace_id,
                    model = self.generator.model_name(),
                    error = %e,
                    "answer generation failed"
                );
                GENERATION_FAILED_ANSWER.to_string()
            }
        };

        FinalResponse {
            answer,
            sources: source_names(&request.retrieved_context),
        }
    }
}

/// Deduplicated source file names, in first-seen order.
fn source_names(context: &[ChunkRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    context
        .iter()
        .map(ChunkRecord::source_name)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Build the single grounded-answer prompt.
fn answer_prompt(query: &str, context: &[ChunkRecord]) -> String {
    let context_block: String = context
        .iter()
        .map(|chunk| format!("Source: {}\nContent: {}\n---\n", chunk.source_name(), chunk.text))
        .collect();

    format!(
        r#"You are a helpful assistant. Answer the user's question using ONLY the context below.
If the answer is not in the context, reply "I could not find the answer in the provided documents."
Do not invent facts. Be concise and answer the question directly.

CONTEXT:
{context_block}
QUESTION:
{query}

ANSWER:"#
    )
}

#[async_trait]
impl Agent for LlmResponseAgent {
    fn id(&self) -> AgentId {
        AgentId::LlmResponseAgent
    }

    fn description(&self) -> &str {
        "Composes a grounded answer from retrieved context"
    }

    async fn process_message(&self, message: &Message) -> Option<Message> {
        let Payload::ContextResponse(request) = &message.payload else {
            return None;
        };

        let response = self.answer(message, request).await;
        info!(
            trace_id = %message.trace_id,
            context = request.retrieved_context.len(),
            sources = response.sources.len(),
            "composed final response"
        );

        Some(message.reply(self.id(), AgentId::Coordinator, Payload::FinalResponse(response)))
    }
}
