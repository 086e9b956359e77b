//! Language model clients.
//!
//! Implementations of [`LanguageModel`] selected by `[llm].provider`:
//!
//! | Config Value | Client | Endpoint |
//! |-------------|--------|----------|
//! | `"disabled"` | [`DisabledModel`] | none; every call is [`LlmError::NotConfigured`] |
//! | `"openai"` | [`OpenAiModel`] | `POST /v1/chat/completions` |
//! | `"ollama"` | [`OllamaModel`] | `POST /api/generate` |
//!
//! Each call is a single attempt unless `[llm].max_retries` opts into the
//! backoff in [`crate::http`]. Failures surface as [`LlmError::Request`] and
//! the agents substitute their fallback answers.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use agentic_rag_core::llm::{LanguageModel, LlmError};

use crate::config::LlmConfig;
use crate::http;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Stand-in when no model is configured.
pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

/// OpenAI chat completions client. Reads `OPENAI_API_KEY` at construction.
pub struct OpenAiModel {
    model: String,
    api_key: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAiModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for OpenAI provider"))?;
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            model,
            api_key,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_CHAT_URL.to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let json = http::post_json(
            &self.client,
            "OpenAI",
            &self.url,
            Some(&self.api_key),
            &body,
            self.max_retries,
        )
        .await
        .map_err(|e| LlmError::Request(e.to_string()))?;
        parse_openai_chat(&json)
    }
}

fn parse_openai_chat(json: &serde_json::Value) -> Result<String, LlmError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".into()))
}

/// Ollama generate client (non-streaming).
pub struct OllamaModel {
    model: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("llm.model required for Ollama provider"))?;
        Ok(Self {
            model,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            max_retries: config.max_retries,
            client: http::client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        let json = http::post_json(
            &self.client,
            "Ollama",
            &format!("{}/api/generate", self.url.trim_end_matches('/')),
            None,
            &body,
            self.max_retries,
        )
        .await
        .map_err(|e| LlmError::Request(e.to_string()))?;
        parse_ollama_generate(&json)
    }
}

fn parse_ollama_generate(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|r| r.trim().to_string())
        .ok_or_else(|| LlmError::InvalidResponse("missing response field".into()))
}

/// Build the model named by `config.provider`.
pub fn create_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledModel)),
        "openai" => Ok(Arc::new(OpenAiModel::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaModel::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn disabled_model_is_not_configured() {
        let model = create_model(&LlmConfig::default()).unwrap();
        assert_eq!(model.model_name(), "disabled");
        assert!(matches!(
            model.generate("hi").await,
            Err(LlmError::NotConfigured)
        ));
    }

    #[test]
    fn parses_openai_chat_content() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": " greeting\n" } }]
        });
        assert_eq!(parse_openai_chat(&json).unwrap(), "greeting");
        assert!(matches!(
            parse_openai_chat(&serde_json::json!({ "choices": [] })),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn parses_ollama_generate_response() {
        let json = serde_json::json!({ "model": "llama3", "response": "rag_query", "done": true });
        assert_eq!(parse_ollama_generate(&json).unwrap(), "rag_query");
    }

    #[test]
    fn ollama_requires_model() {
        let config = LlmConfig {
            provider: "ollama".into(),
            ..LlmConfig::default()
        };
        assert!(create_model(&config).is_err());
    }

    /// Accepts connections forever, answering each with 503.
    async fn always_unavailable(requests: Arc<AtomicUsize>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                requests.fetch_add(1, Ordering::SeqCst);
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    )
                    .await;
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn failing_provider_is_called_once_by_default() {
        let requests = Arc::new(AtomicUsize::new(0));
        let url = always_unavailable(requests.clone()).await;
        let config = LlmConfig {
            provider: "ollama".into(),
            model: Some("llama3".into()),
            url: Some(url),
            ..LlmConfig::default()
        };
        let model = create_model(&config).unwrap();

        let started = Instant::now();
        let result = model.generate("hi").await;
        assert!(matches!(result, Err(LlmError::Request(_))), "got: {:?}", result);
        assert_eq!(requests.load(Ordering::SeqCst), 1);
        // No backoff sleep before the caller can fall back.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn unreachable_ollama_is_a_request_error() {
        let config = LlmConfig {
            provider: "ollama".into(),
            model: Some("llama3".into()),
            url: Some("http://127.0.0.1:9".into()),
            max_retries: 0,
            timeout_secs: 1,
        };
        let model = create_model(&config).unwrap();
        assert!(matches!(
            model.generate("hi").await,
            Err(LlmError::Request(_))
        ));
    }
}
