//! Vector store abstraction.
//!
//! The [`VectorStore`] trait is the only way agents touch persisted chunk
//! data. The store owns the chunks outright; agents hold a shared handle
//! and never cache what they read.
//!
//! Implementations must be `Send + Sync` and handle their own internal
//! synchronisation: one handle is created per process and shared by every
//! request.

pub mod memory;

use async_trait::async_trait;

use crate::models::{ChunkRecord, StoredChunk};

/// Failure inside a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("vector store backend error: {0}")]
    Backend(String),
    #[error("vector store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Wrap any backend error by its display text.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Abstract similarity-searchable chunk store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](VectorStore::add) | Persist a batch of chunks under their ids |
/// | [`query`](VectorStore::query) | Nearest chunks to a query text |
/// | [`count`](VectorStore::count) | Number of stored chunks |
/// | [`reset`](VectorStore::reset) | Remove every stored chunk |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Persist all `chunks` in one batch. An empty batch is a no-op.
    async fn add(&self, chunks: &[StoredChunk]) -> Result<(), StoreError>;

    /// Return up to `limit` chunks ranked by relevance to `text`, nearest first.
    ///
    /// Never returns more chunks than are stored.
    async fn query(&self, text: &str, limit: usize) -> Result<Vec<ChunkRecord>, StoreError>;

    /// Number of chunks currently stored.
    async fn count(&self) -> Result<usize, StoreError>;

    /// Remove every stored chunk.
    async fn reset(&self) -> Result<(), StoreError>;
}
