//! In-memory [`VectorStore`] implementation for testing and WASM targets.
//!
//! Chunks live in a `Vec` behind `std::sync::RwLock`. Ranking is a
//! term-overlap score: the number of distinct query terms that occur in the
//! chunk, ties broken by insertion order. Every stored chunk is a
//! candidate, so a query returns `min(limit, count)` chunks just as a
//! nearest-neighbour search would.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::models::{ChunkRecord, StoredChunk};

use super::{StoreError, VectorStore};

/// In-memory chunk store.
#[derive(Default)]
pub struct InMemoryStore {
    chunks: RwLock<Vec<StoredChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every stored chunk, in insertion order.
    pub fn ids(&self) -> Result<Vec<String>, StoreError> {
        let chunks = self.chunks.read().map_err(|_| StoreError::Poisoned)?;
        Ok(chunks.iter().map(|c| c.id.clone()).collect())
    }
}

fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn add(&self, chunks: &[StoredChunk]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let mut stored = self.chunks.write().map_err(|_| StoreError::Poisoned)?;
        for chunk in chunks {
            if stored.iter().any(|c| c.id == chunk.id) {
                return Err(StoreError::Backend(format!("duplicate chunk id: {}", chunk.id)));
            }
        }
        stored.extend(chunks.iter().cloned());
        Ok(())
    }

    async fn query(&self, text: &str, limit: usize) -> Result<Vec<ChunkRecord>, StoreError> {
        let query_terms = terms(text);
        let stored = self.chunks.read().map_err(|_| StoreError::Poisoned)?;

        let mut scored: Vec<(usize, usize)> = stored
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let chunk_terms = terms(&c.record.text);
                (query_terms.intersection(&chunk_terms).count(), i)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, i)| stored[i].record.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.chunks.read().map_err(|_| StoreError::Poisoned)?.len())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        self.chunks.write().map_err(|_| StoreError::Poisoned)?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(id: &str, text: &str, source: &str) -> StoredChunk {
        StoredChunk {
            id: id.to_string(),
            record: ChunkRecord::new(text, source),
        }
    }

    #[tokio::test]
    async fn query_ranks_by_term_overlap() {
        let store = InMemoryStore::new();
        store
            .add(&[
                stored("1", "Shipping takes five days.", "shipping.txt"),
                stored("2", "The refund policy allows returns within 30 days.", "policy.txt"),
                stored("3", "Refund requests go to support.", "support.txt"),
            ])
            .await
            .unwrap();

        let hits = store.query("what is the refund policy?", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "policy.txt");
        assert_eq!(hits[1].source, "support.txt");
    }

    #[tokio::test]
    async fn query_never_exceeds_stored_count() {
        let store = InMemoryStore::new();
        store.add(&[stored("1", "alpha", "a.txt")]).await.unwrap();
        assert_eq!(store.query("beta", 5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_store_returns_empty() {
        let store = InMemoryStore::new();
        assert!(store.query("anything", 5).await.unwrap().is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = InMemoryStore::new();
        store.add(&[stored("1", "a", "a.txt")]).await.unwrap();
        assert!(store.add(&[stored("1", "b", "b.txt")]).await.is_err());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let store = InMemoryStore::new();
        store
            .add(&[stored("1", "a", "a.txt"), stored("2", "b", "b.txt")])
            .await
            .unwrap();
        store.reset().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.ids().unwrap().is_empty());
    }
}
