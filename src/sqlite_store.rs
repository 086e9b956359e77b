//! SQLite-backed [`VectorStore`].
//!
//! Chunks live in `chunks` with a mirrored FTS5 index in `chunks_fts`.
//! When an embedding provider is configured, every chunk also gets a vector
//! in `chunk_vectors` and queries rank by cosine similarity. Without one,
//! queries rank by BM25 over the query's terms.
//!
//! Either way a query returns `min(limit, count)` chunks, nearest first:
//! keyword ranking is padded with the remaining chunks in insertion order
//! so that callers see nearest-neighbour semantics from both modes.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use tracing::{debug, warn};

use agentic_rag_core::models::{ChunkRecord, StoredChunk};
use agentic_rag_core::store::{StoreError, VectorStore};

use crate::config::EmbeddingConfig;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::migrate;

/// Persistent chunk store over a SQLite pool.
pub struct SqliteStore {
    pool: SqlitePool,
    embedder: Option<Box<dyn EmbeddingProvider>>,
    batch_size: usize,
}

impl SqliteStore {
    /// Open the database at `db_path`, run migrations, and build the
    /// embedding provider described by `embedding`.
    pub async fn open(db_path: &Path, embedding: &EmbeddingConfig) -> Result<Self> {
        let pool = db::connect(db_path).await?;
        migrate::run_migrations(&pool).await?;
        let embedder = if embedding.is_enabled() {
            Some(embedding::create_provider(embedding)?)
        } else {
            None
        };
        Ok(Self::new(pool, embedder, embedding.batch_size))
    }

    /// Wrap an already-migrated pool.
    pub fn new(
        pool: SqlitePool,
        embedder: Option<Box<dyn EmbeddingProvider>>,
        batch_size: usize,
    ) -> Self {
        Self {
            pool,
            embedder,
            batch_size,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn insert(&self, chunks: &[StoredChunk]) -> Result<()> {
        let vectors = match &self.embedder {
            Some(provider) => {
                let texts: Vec<String> = chunks.iter().map(|c| c.record.text.clone()).collect();
                Some(embedding::embed_batched(provider.as_ref(), &texts, self.batch_size).await?)
            }
            None => None,
        };

        let mut tx = self.pool.begin().await?;

        for chunk in chunks {
            sqlx::query("INSERT INTO chunks (id, text, source) VALUES (?, ?, ?)")
                .bind(&chunk.id)
                .bind(&chunk.record.text)
                .bind(&chunk.record.source)
                .execute(&mut *tx)
                .await?;

            sqlx::query("INSERT INTO chunks_fts (chunk_id, text) VALUES (?, ?)")
                .bind(&chunk.id)
                .bind(&chunk.record.text)
                .execute(&mut *tx)
                .await?;
        }

        if let (Some(provider), Some(vectors)) = (&self.embedder, vectors) {
            for (chunk, vector) in chunks.iter().zip(vectors) {
                sqlx::query(
                    "INSERT INTO chunk_vectors (chunk_id, model, dims, embedding) VALUES (?, ?, ?, ?)",
                )
                .bind(&chunk.id)
                .bind(provider.model_name())
                .bind(vector.len() as i64)
                .bind(embedding::vec_to_blob(&vector))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        debug!(added = chunks.len(), "inserted chunks");
        Ok(())
    }

    async fn nearest(&self, text: &str, limit: usize) -> Result<Vec<ChunkRecord>> {
        if let Some(provider) = &self.embedder {
            match embedding::embed_query(provider.as_ref(), text).await {
                Ok(query_vec) => return self.vector_search(&query_vec, limit).await,
                Err(e) => warn!(error = %e, "query embedding failed; falling back to keyword search"),
            }
        }
        self.keyword_search(text, limit).await
    }

    async fn vector_search(&self, query_vec: &[f32], limit: usize) -> Result<Vec<ChunkRecord>> {
        // Fetch all vectors and compute cosine similarity in Rust
        let rows = sqlx::query(
            r#"
            SELECT c.seq, c.text, c.source, cv.embedding
            FROM chunks c
            LEFT JOIN chunk_vectors cv ON cv.chunk_id = c.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut scored: Vec<(f32, i64, ChunkRecord)> = rows
            .iter()
            .map(|row| {
                let blob: Option<Vec<u8>> = row.get("embedding");
                let similarity = blob
                    .map(|b| embedding::cosine_similarity(query_vec, &embedding::blob_to_vec(&b)))
                    .unwrap_or(-1.0);
                (
                    similarity,
                    row.get::<i64, _>("seq"),
                    ChunkRecord::new(row.get::<String, _>("text"), row.get::<String, _>("source")),
                )
            })
            .collect();

        // Sort by similarity desc, then insertion order
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(limit);

        Ok(scored.into_iter().map(|(_, _, record)| record).collect())
    }

    async fn keyword_search(&self, text: &str, limit: usize) -> Result<Vec<ChunkRecord>> {
        let mut seen = HashSet::new();
        let mut out = Vec::with_capacity(limit);

        if let Some(expr) = fts_expression(text) {
            let rows = sqlx::query(
                r#"
                SELECT c.id, c.text, c.source
                FROM (
                    SELECT chunk_id, rank
                    FROM chunks_fts
                    WHERE chunks_fts MATCH ?
                    ORDER BY rank
                    LIMIT ?
                ) hits
                JOIN chunks c ON c.id = hits.chunk_id
                ORDER BY hits.rank, c.seq
                "#,
            )
            .bind(&expr)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

            for row in rows {
                seen.insert(row.get::<String, _>("id"));
                out.push(ChunkRecord::new(
                    row.get::<String, _>("text"),
                    row.get::<String, _>("source"),
                ));
            }
        }

        if out.len() < limit {
            let rows = sqlx::query("SELECT id, text, source FROM chunks ORDER BY seq LIMIT ?")
                .bind((limit + seen.len()) as i64)
                .fetch_all(&self.pool)
                .await?;
            for row in rows {
                if out.len() >= limit {
                    break;
                }
                if seen.contains(&row.get::<String, _>("id")) {
                    continue;
                }
                out.push(ChunkRecord::new(
                    row.get::<String, _>("text"),
                    row.get::<String, _>("source"),
                ));
            }
        }

        Ok(out)
    }
}

/// Turn free text into an FTS5 expression: quoted terms joined with `OR`.
///
/// Returns `None` when the text has no word characters, since FTS5 rejects
/// an empty match expression.
pub fn fts_expression(text: &str) -> Option<String> {
    let mut seen = HashSet::new();
    let terms: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .filter(|t| seen.insert(t.clone()))
        .map(|t| format!("\"{}\"", t))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn add(&self, chunks: &[StoredChunk]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }
        self.insert(chunks).await.map_err(StoreError::backend)
    }

    async fn query(&self, text: &str, limit: usize) -> Result<Vec<ChunkRecord>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.nearest(text, limit).await.map_err(StoreError::backend)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;
        Ok(n as usize)
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::backend)?;
        for table in ["chunk_vectors", "chunks_fts", "chunks"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await
                .map_err(StoreError::backend)?;
        }
        tx.commit().await.map_err(StoreError::backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fts_expression_quotes_and_dedups_terms() {
        assert_eq!(
            fts_expression("What is the refund policy? Refund!").as_deref(),
            Some("\"what\" OR \"is\" OR \"the\" OR \"refund\" OR \"policy\"")
        );
        assert_eq!(fts_expression("?!  --"), None);
    }

    #[test]
    fn fts_expression_neutralises_operators() {
        let expr = fts_expression("NOT near(a\"b)").unwrap();
        assert_eq!(expr, "\"not\" OR \"near\" OR \"a\" OR \"b\"");
    }
}
