use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::chunk::TextChunker;
use crate::message::{AgentId, EmbedAndStoreRequest, IngestRequest, Message, Payload};
use crate::models::ChunkRecord;
use crate::parser::DocumentParser;

use super::Agent;

/// Turns a batch of file paths into chunk records.
///
/// Parsing is best-effort: a file the parser rejects is logged and dropped,
/// and the rest of the batch carries on. Chunk size and overlap come from
/// the [`TextChunker`] the agent was built with, never from the caller.
pub struct IngestionAgent {
    parser: Arc<dyn DocumentParser>,
    chunker: TextChunker,
}

impl IngestionAgent {
    pub fn new(parser: Arc<dyn DocumentParser>, chunker: TextChunker) -> Self {
        Self { parser, chunker }
    }

    async fn chunk_files(&self, request: &IngestRequest) -> Vec<ChunkRecord> {
        let mut all_chunks = Vec::new();
        for path in &request.file_paths {
            let text = match self.parser.parse(path).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping file that failed to parse");
                    continue;
                }
            };
            let source = path.to_string_lossy();
            let chunks = self.chunker.chunk_document(&text, &source);
            debug!(path = %path.display(), chunks = chunks.len(), "chunked file");
            all_chunks.extend(chunks);
        }
        all_chunks
    }
}

#[async_trait]
impl Agent for IngestionAgent {
    fn id(&self) -> AgentId {
        AgentId::IngestionAgent
    }

    fn description(&self) -> &str {
        "Parses uploaded files and splits them into overlapping chunks"
    }

    async fn process_message(&self, message: &Message) -> Option<Message> {
        let Payload::IngestRequest(request) = &message.payload else {
            return None;
        };

        let chunks = self.chunk_files(request).await;
        info!(
            trace_id = %message.trace_id,
            files = request.file_paths.len(),
            chunks = chunks.len(),
            "ingestion produced chunks"
        );

        Some(message.reply(
            self.id(),
            AgentId::RetrievalAgent,
            Payload::EmbedAndStoreRequest(EmbedAndStoreRequest { chunks }),
        ))
    }
}
