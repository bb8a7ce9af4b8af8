//! Agent-facing tool boundary and the Google search tool.

use std::sync::Arc;

use async_trait::async_trait;
use lookout_common::{LookoutError, Result, SearchConfig, TextStream};
use lookout_llm::summarize::Summarizer;

use crate::extract::extract;
use crate::route::{route, Routed};
use crate::serper::{SearchError, SearchQuery, SerperClient};

/// A capability an agent can invoke with free-form input.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// Instructions for the model choosing tools.
    fn description(&self) -> &str;

    /// Short text shown to end users.
    fn public_description(&self) -> &str;

    /// Whether the tool can run with the current configuration. Never touches
    /// the network.
    fn available(&self) -> bool;

    async fn call(&self, goal: &str, task: &str, input: &str) -> Result<TextStream>;
}

impl From<SearchError> for LookoutError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::MissingCredential | SearchError::InvalidSearchType(_) => {
                LookoutError::Config(e.to_string())
            }
            SearchError::Provider(inner) => LookoutError::Provider {
                status: inner.status().map(|s| s.as_u16()),
                message: inner.to_string(),
            },
        }
    }
}

/// Google search via Serper, answered directly or summarized.
pub struct SearchTool {
    client: Option<SerperClient>,
    summarizer: Arc<dyn Summarizer>,
    search_type: String,
}

impl SearchTool {
    /// Without a usable credential the tool is built anyway and reports
    /// itself unavailable.
    pub fn new(config: &SearchConfig, summarizer: Arc<dyn Summarizer>) -> Result<Self> {
        let client = match SerperClient::new(config) {
            Ok(client) => Some(client),
            Err(SearchError::MissingCredential) => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            client,
            summarizer,
            search_type: config.search_type.clone(),
        })
    }

    pub fn with_search_type(mut self, search_type: impl Into<String>) -> Self {
        self.search_type = search_type.into();
        self
    }

    /// Search and route, keeping the routing outcome visible to the caller.
    pub async fn run(&self, goal: &str, task: &str, input: &str) -> Result<Routed> {
        let client = self.client.as_ref().ok_or_else(|| {
            LookoutError::Config("search tool is unavailable: no API key configured".into())
        })?;
        let query = SearchQuery::new(input).with_type(self.search_type.as_str());
        let raw = client.fetch(&query).await?;
        let candidate = extract(&raw);
        Ok(route(candidate, goal, task, self.summarizer.as_ref()))
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search Google for short up to date searches for simple questions news and people.\n\
         The argument should be the search query."
    }

    fn public_description(&self) -> &str {
        "Search google for information about current events."
    }

    fn available(&self) -> bool {
        self.client.is_some()
    }

    async fn call(&self, goal: &str, task: &str, input: &str) -> Result<TextStream> {
        Ok(self.run(goal, task, input).await?.into_stream())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_common::stream_text;

    struct EchoSummarizer;

    impl Summarizer for EchoSummarizer {
        fn summarize(&self, _goal: &str, _task: &str, snippets: Vec<String>) -> TextStream {
            stream_text(snippets.join(" | "), true)
        }
    }

    #[test]
    fn availability_follows_credential() {
        let summarizer: Arc<dyn Summarizer> = Arc::new(EchoSummarizer);

        let missing = SearchTool::new(&SearchConfig::default(), summarizer.clone()).unwrap();
        assert!(!missing.available());

        let placeholder = SearchConfig {
            api_key: Some("${SERPER_API_KEY}".into()),
            ..SearchConfig::default()
        };
        assert!(!SearchTool::new(&placeholder, summarizer.clone()).unwrap().available());

        let present = SearchConfig {
            api_key: Some("key".into()),
            ..SearchConfig::default()
        };
        assert!(SearchTool::new(&present, summarizer).unwrap().available());
    }

    #[tokio::test]
    async fn calling_unavailable_tool_is_config_error() {
        let tool = SearchTool::new(&SearchConfig::default(), Arc::new(EchoSummarizer)).unwrap();
        let err = tool.call("g", "t", "q").await.err().unwrap();
        assert!(matches!(err, LookoutError::Config(_)));
    }

    #[test]
    fn metadata_describes_google_search() {
        let tool = SearchTool::new(&SearchConfig::default(), Arc::new(EchoSummarizer)).unwrap();
        assert_eq!(tool.name(), "search");
        assert_eq!(
            tool.description(),
            "Search Google for short up to date searches for simple questions news and people.\n\
             The argument should be the search query."
        );
        assert_eq!(
            tool.public_description(),
            "Search google for information about current events."
        );
    }

    #[tokio::test]
    async fn search_type_outside_base_url_is_config_error() {
        let cfg = SearchConfig {
            api_key: Some("key".into()),
            ..SearchConfig::default()
        };
        let tool = SearchTool::new(&cfg, Arc::new(EchoSummarizer))
            .unwrap()
            .with_search_type("https://other.example/steal");
        let err = tool.call("g", "t", "q").await.err().unwrap();
        assert!(matches!(err, LookoutError::Config(_)));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let cfg = SearchConfig {
            api_key: Some("key".into()),
            base_url: "not a url".into(),
            ..SearchConfig::default()
        };
        assert!(SearchTool::new(&cfg, Arc::new(EchoSummarizer)).is_err());
    }
}
