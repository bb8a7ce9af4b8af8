//! Common types and utilities shared across Lookout crates.
//!
//! This crate defines the configuration value types, the text streaming
//! primitives, observability helpers, and the shared error type used
//! throughout the Lookout workspace. Every other crate depends on it, so it
//! stays free of HTTP and LLM specifics.
//!
//! # Overview
//!
//! - [`SearchConfig`]: search provider credentials and endpoint
//! - [`LlmConfig`]: provider-agnostic LLM configuration
//! - [`ModelSettings`]: generation knobs handed to the summarizer
//! - [`stream`]: incremental text delivery (`TextStream`, `stream_text`)
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`LookoutError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use lookout_common::SearchConfig;
//!
//! let cfg = SearchConfig::default();
//! assert_eq!(cfg.base_url, "https://google.serper.dev");
//! assert_eq!(cfg.search_type, "search");
//! assert!(cfg.credential().is_none());
//! ```
use serde::{Deserialize, Serialize};

pub mod observability;
pub mod stream;

pub use stream::{boxed_stream, collect_text, stream_text, TextChunk, TextStream};

pub const DEFAULT_SERPER_BASE_URL: &str = "https://google.serper.dev";
pub const DEFAULT_SEARCH_TYPE: &str = "search";

/// Search provider settings.
///
/// The credential is optional: a missing key is how the tool learns that it
/// is unavailable in the current environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Provider endpoint path, e.g. `search`, `news`, `images`.
    #[serde(default = "default_search_type")]
    pub search_type: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl SearchConfig {
    /// The configured API key, if it is usable.
    ///
    /// Empty keys and `${VAR}` placeholders that survived environment
    /// expansion count as unset.
    ///
    /// ```
    /// use lookout_common::SearchConfig;
    ///
    /// let mut cfg = SearchConfig::default();
    /// cfg.api_key = Some("${SERPER_API_KEY}".into());
    /// assert!(cfg.credential().is_none());
    ///
    /// cfg.api_key = Some("  abc123 ".into());
    /// assert_eq!(cfg.credential(), Some("abc123"));
    /// ```
    pub fn credential(&self) -> Option<&str> {
        let key = self.api_key.as_deref()?.trim();
        if key.is_empty() || (key.starts_with("${") && key.ends_with('}')) {
            None
        } else {
            Some(key)
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            search_type: default_search_type(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_SERPER_BASE_URL.to_string()
}
fn default_search_type() -> String {
    DEFAULT_SEARCH_TYPE.to_string()
}
fn default_timeout_secs() -> u64 {
    15
}

/// Configuration for the LLM provider behind the summarizer.
///
/// See the `lookout-llm` crate for concrete client implementations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum LlmConfig {
    Openai {
        model: String,
        auth_token: String,
        #[serde(default = "default_openai_endpoint")]
        endpoint: String,
    },
    Ollama {
        model: String,
        #[serde(default = "default_ollama_endpoint")]
        endpoint: String,
    },
    #[default]
    None,
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".into()
}
fn default_ollama_endpoint() -> String {
    "http://localhost:11434".into()
}

/// Generation settings passed to the summarization stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Language the summary must be written in.
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            language: default_language(),
        }
    }
}

fn default_temperature() -> f32 {
    0.4
}
fn default_max_tokens() -> u32 {
    500
}
fn default_language() -> String {
    "English".into()
}

/// Logging preferences as they appear in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub format: observability::LogFormat,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub dir: Option<std::path::PathBuf>,
    #[serde(default)]
    pub stderr: bool,
}

/// Error types used across the Lookout system.
#[derive(thiserror::Error, Debug)]
pub enum LookoutError {
    /// The search provider request failed or returned a non-success status.
    /// `status` is set when the provider answered with an HTTP error.
    #[error("Search provider error: {message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    /// The LLM backend failed while generating text.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A text stream broke before completion.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`LookoutError`].
pub type Result<T> = std::result::Result<T, LookoutError>;
