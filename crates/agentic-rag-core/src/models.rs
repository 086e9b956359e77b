//! Core data types that flow through the pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A unit of indexed text tagged with the file it came from.
///
/// Created by the ingestion agent, persisted by the retrieval agent, and
/// returned read-only at query time. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub text: String,
    /// Originating file path, exactly as it appeared in the ingest request.
    pub source: String,
}

impl ChunkRecord {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }

    /// File name component of `source`, used when citing sources.
    ///
    /// Falls back to the full `source` string if it has no file name.
    pub fn source_name(&self) -> String {
        Path::new(&self.source)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.clone())
    }
}

/// A chunk paired with the unique id it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredChunk {
    pub id: String,
    pub record: ChunkRecord,
}

/// Who authored a [`ChatTurn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub sender: Speaker,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Speaker::User,
            text: text.into(),
            sources: None,
        }
    }

    pub fn bot(text: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            sender: Speaker::Bot,
            text: text.into(),
            sources: Some(sources),
        }
    }
}

/// What a user query is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Conversational pleasantry; answered without retrieval.
    Greeting,
    /// Information-seeking; answered from retrieved context.
    RagQuery,
}

impl Intent {
    /// Interpret a classifier's raw output.
    ///
    /// Any output containing the word `greeting` (case-insensitive) is a
    /// greeting; everything else is a RAG query.
    pub fn from_label(label: &str) -> Self {
        if label.trim().to_lowercase().contains("greeting") {
            Intent::Greeting
        } else {
            Intent::RagQuery
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::RagQuery => "rag_query",
        }
    }
}
