//! Provider‑agnostic LLM integration for Lookout.
//!
//! This crate exposes a common [`traits::LlmClient`] interface, concrete
//! provider implementations for OpenAI-compatible APIs and Ollama, and the
//! [`summarize::Summarizer`] stage that turns search snippets into a streamed
//! answer. [`ensure_llm_ready`] builds a client from a
//! [`lookout_common::LlmConfig`].
//!
//! # Examples
//! ```no_run
//! use lookout_common::{LlmConfig, ModelSettings, Result};
//! use lookout_llm::{ensure_llm_ready, summarize::LlmSummarizer};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let cfg = LlmConfig::Ollama {
//!     model: "llama3.2:3b".into(),
//!     endpoint: "http://localhost:11434".into(),
//! };
//! let client = ensure_llm_ready(&cfg).await?;
//! let _summarizer = LlmSummarizer::new(client, ModelSettings::default());
//! # Ok(())
//! # }
//! ```
mod lines;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod summarize;
pub mod traits;

use lookout_common::{LlmConfig, LookoutError};
use std::sync::Arc;
use traits::LlmClient;

/// Default model recommendations for summarization
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Build an LLM client and make sure it can serve requests (for Ollama this
/// may pull the model).
pub async fn ensure_llm_ready(
    config: &LlmConfig,
) -> lookout_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        #[cfg(feature = "ollama")]
        LlmConfig::Ollama { model, endpoint } => {
            let client = ollama::OllamaClient::connect(endpoint, model.clone()).await?;
            Ok(Arc::new(client))
        }
        #[cfg(feature = "openai")]
        LlmConfig::Openai {
            model,
            auth_token,
            endpoint,
        } => {
            if auth_token.trim().is_empty() {
                return Err(LookoutError::Config(
                    "OpenAI provider requires a non-empty auth_token".to_string(),
                ));
            }
            let client =
                openai::OpenAiClient::with_endpoint(endpoint, auth_token.clone(), model.clone())?;
            Ok(Arc::new(client))
        }
        LlmConfig::None => Err(LookoutError::Config("No LLM configured".to_string())),
        #[allow(unreachable_patterns)]
        _ => Err(LookoutError::Config("LLM provider not enabled".to_string())),
    }
}
