use super::types::{RawSearchResult, SearchQuery};
use lookout_common::SearchConfig;
use lookout_http::{Auth, HeaderName, HttpClient, HttpError, RequestOpts};
use std::time::{Duration, Instant};

#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    /// Transport failure, non-success status or undecodable body.
    #[error("search provider request failed: {0}")]
    Provider(#[from] HttpError),

    #[error("search API key is not configured")]
    MissingCredential,

    /// Search types name one endpoint path segment under the base URL.
    #[error("invalid search type {0:?}")]
    InvalidSearchType(String),
}

/// Minimal client for the Serper Google Search API.
#[derive(Clone)]
pub struct SerperClient {
    http: HttpClient,
    api_key: String,
    timeout: Duration,
}

impl SerperClient {
    /// Build a client from configuration. Fails without a usable API key.
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let api_key = config
            .credential()
            .ok_or(SearchError::MissingCredential)?
            .to_string();
        let timeout = Duration::from_secs(config.timeout_secs);
        let http = HttpClient::new(&config.base_url)?
            .with_timeout(timeout)
            .with_retries(0);
        Ok(Self {
            http,
            api_key,
            timeout,
        })
    }

    /// One POST to `{base_url}/{search_type}?q=<term>`. No retry: any
    /// transport error or non-2xx status is returned as is.
    pub async fn fetch(&self, query: &SearchQuery) -> Result<RawSearchResult, SearchError> {
        if !is_path_segment(&query.search_type) {
            return Err(SearchError::InvalidSearchType(query.search_type.clone()));
        }
        let query_snippet = snip_query(&query.term);
        let started = Instant::now();
        tracing::info!(
            target: "web.serper",
            query = %query_snippet,
            search_type = %query.search_type,
            "serper.fetch.start"
        );

        let opts = RequestOpts {
            auth: Some(Auth::api_key_header(
                HeaderName::from_static("x-api-key"),
                &self.api_key,
            )?),
            query: Some(vec![("q", query.term.as_str().into())]),
            retries: Some(0),
            timeout: Some(self.timeout),
            ..Default::default()
        };

        match self
            .http
            .post_empty_json::<RawSearchResult>(&query.search_type, opts)
            .await
        {
            Ok(resp) => {
                tracing::info!(
                    target: "web.serper",
                    query = %query_snippet,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    has_answer_box = resp.answer_box.is_some(),
                    has_knowledge_graph = resp.knowledge_graph.is_some(),
                    organic = resp.organic.as_ref().map_or(0, Vec::len),
                    "serper.fetch.success"
                );
                Ok(resp)
            }
            Err(e) => {
                tracing::warn!(
                    target: "web.serper",
                    query = %query_snippet,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "serper.fetch.error"
                );
                Err(SearchError::Provider(e))
            }
        }
    }
}

fn is_path_segment(search_type: &str) -> bool {
    !search_type.is_empty()
        && search_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn snip_query(term: &str) -> String {
    const MAX: usize = 160;
    match term.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}…", &term[..idx]),
        None => term.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_requires_credential() {
        let err = SerperClient::new(&SearchConfig::default()).err().unwrap();
        assert!(matches!(err, SearchError::MissingCredential));

        let cfg = SearchConfig {
            api_key: Some("k".into()),
            ..SearchConfig::default()
        };
        assert!(SerperClient::new(&cfg).is_ok());
    }

    #[test]
    fn search_type_must_be_single_segment() {
        assert!(is_path_segment("search"));
        assert!(is_path_segment("news"));
        for bad in ["", "https://other.example/x", "//other.example", "../admin", "a/b", "a?b"] {
            assert!(!is_path_segment(bad), "{bad} accepted");
        }
    }

    #[tokio::test]
    async fn fetch_rejects_foreign_search_type_before_sending() {
        let cfg = SearchConfig {
            api_key: Some("k".into()),
            ..SearchConfig::default()
        };
        let client = SerperClient::new(&cfg).unwrap();
        let query = SearchQuery::new("q").with_type("https://other.example/x");
        let err = client.fetch(&query).await.err().unwrap();
        assert!(matches!(err, SearchError::InvalidSearchType(t) if t == "https://other.example/x"));
    }

    #[test]
    fn long_queries_are_snipped_on_char_boundary() {
        let term = "é".repeat(200);
        let snip = snip_query(&term);
        assert_eq!(snip.chars().count(), 161);
        assert!(snip.ends_with('…'));
        assert_eq!(snip_query("short"), "short");
    }
}
