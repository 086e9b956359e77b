//! Recursive character text splitter.
//!
//! Splits extracted document text into overlapping segments of at most
//! `chunk_size` characters, preferring to break on paragraph boundaries,
//! then line breaks, then spaces, and only as a last resort between
//! individual characters.
//!
//! Lengths are measured in Unicode scalar values (`char`s), not bytes, so
//! multi-byte text is never split inside a character.
//!
//! # Algorithm
//!
//! 1. Pick the first separator in `["\n\n", "\n", " ", ""]` that occurs in
//!    the text (the empty separator always matches).
//! 2. Split the text so each separator stays attached to the start of the
//!    piece that follows it.
//! 3. Pieces shorter than `chunk_size` are greedily merged into chunks.
//!    When a chunk is flushed, pieces are dropped from its front until at
//!    most `chunk_overlap` characters remain; those carry into the next chunk.
//! 4. Pieces that are too long are split recursively with the remaining,
//!    finer separators.
//! 5. Every chunk is whitespace-trimmed; empty chunks are discarded.
//!
//! # Example
//!
//! ```rust
//! use agentic_rag_core::chunk::TextChunker;
//!
//! let chunker = TextChunker::new(1000, 200);
//! let chunks = chunker.split_text("Hello world.\n\nSecond paragraph.");
//! assert_eq!(chunks, vec!["Hello world.\n\nSecond paragraph.".to_string()]);
//! ```

use std::collections::VecDeque;

use crate::models::ChunkRecord;

/// Default maximum chunk length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Default number of characters carried over between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Separators tried in order, coarsest first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Fixed-size, overlapping text splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl TextChunker {
    /// Create a chunker. `chunk_size` is clamped to at least 1.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty chunks in document order.
    ///
    /// Empty or whitespace-only text yields no chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &SEPARATORS)
    }

    /// Split `text` and tag every chunk with `source`.
    pub fn chunk_document(&self, text: &str, source: &str) -> Vec<ChunkRecord> {
        self.split_text(text)
            .into_iter()
            .map(|chunk| ChunkRecord::new(chunk, source))
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = "";
        let mut finer: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                break;
            }
            if text.contains(sep) {
                separator = sep;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut short: Vec<&str> = Vec::new();

        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge_pieces(&short));
                short.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !short.is_empty() {
            chunks.extend(self.merge_pieces(&short));
        }

        chunks
    }

    /// Greedily merge pieces into chunks of at most `chunk_size` characters,
    /// keeping up to `chunk_overlap` trailing characters between chunks.
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                if let Some(chunk) = join_trimmed(&window) {
                    chunks.push(chunk);
                }
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match window.pop_front() {
                        Some((_, dropped)) => total -= dropped,
                        None => break,
                    }
                }
            }
            window.push_back((piece, len));
            total += len;
        }

        if let Some(chunk) = join_trimmed(&window) {
            chunks.push(chunk);
        }

        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split on `separator`, attaching each separator to the start of the piece
/// after it. The empty separator splits into single characters.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn join_trimmed(window: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = window.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
