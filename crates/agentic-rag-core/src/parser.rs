//! Document parser seam.
//!
//! The ingestion agent turns file paths into raw text through a
//! [`DocumentParser`]. Format-specific extraction lives in the application
//! crate; the core only needs the contract.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// Why a file could not be turned into text.
///
/// The ingestion agent never propagates these: a file that fails to parse
/// is logged and left out of the batch.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unsupported file type: {}", .0.display())]
    Unsupported(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to extract text from {}: {message}", path.display())]
    Extract { path: PathBuf, message: String },
}

/// Extracts the full text of a document from a path on disk.
///
/// Implementations that read files or decode large formats should move
/// that work off the async executor.
#[async_trait]
pub trait DocumentParser: Send + Sync {
    async fn parse(&self, path: &Path) -> Result<String, ParseError>;
}
