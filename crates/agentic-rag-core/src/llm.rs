//! Language model seam.
//!
//! Both the intent classifier (inside the retrieval agent) and the answer
//! generator (inside the response agent) are a single prompt-in, text-out
//! call against a [`LanguageModel`]. Concrete HTTP clients live in the
//! application crate.

use async_trait::async_trait;

/// Failure of a single generation call.
///
/// Agents convert these into fallback values; they never cross an agent
/// boundary.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// No model is configured (e.g. missing API key or `provider = "disabled"`).
    #[error("language model is not configured")]
    NotConfigured,
    #[error("language model request failed: {0}")]
    Request(String),
    #[error("language model returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// A text-generation backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Identifier used in logs (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Run one completion for `prompt` and return the generated text.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}
