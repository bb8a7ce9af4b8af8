use async_trait::async_trait;
use lookout_common::{stream_text, LookoutError, Result, TextStream};
use lookout_http::HttpError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    #[error("API error: {0}")]
    Api(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Malformed stream event: {0}")]
    Stream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<LlmError> for LookoutError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::Config(msg) => LookoutError::Config(msg),
            other => LookoutError::Llm(other.to_string()),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse>;

    /// Generate incrementally. The returned stream ends with a chunk marked
    /// final.
    ///
    /// Providers without native streaming fall back to a single final chunk
    /// holding the whole completion.
    async fn generate_stream(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<TextStream> {
        let response = self
            .generate(prompt, system_prompt, max_tokens, temperature)
            .await?;
        Ok(stream_text(response.text, true))
    }

    /// Check if the LLM service is available
    async fn health_check(&self) -> Result<bool>;

    /// Get the model name being used
    fn model_name(&self) -> &str;

    fn default_research_system_prompt(&self) -> &str {
        r#"You are a careful research assistant working inside an autonomous agent.

Your role:
- Turn raw web search findings into a direct, useful answer for the current task
- Keep only facts supported by the provided material
- Prefer concrete names, numbers and dates over generalities

Guidelines:
- Never invent facts or sources
- Say plainly when the material does not answer the task
- Be concise; use markdown lists or short paragraphs"#
    }
}
