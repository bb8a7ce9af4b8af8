//! Minimal JSON-over-HTTP client with safe logging and optional retries.
//!
//! - Request options: headers, `Auth`, query params, timeout, retry budget
//! - Redacts secret headers (`Authorization`, `X-API-KEY`) and secret-looking
//!   query params; logs only ever name the auth kind, never the value
//! - Retries network failures, 429 and 5xx with exponential backoff and
//!   `Retry-After` support, but only when the caller grants a retry budget
//! - Streaming responses are handed back unread via [`HttpClient::post_stream`]
//! - Optional *raw* request/response logging via `LOOKOUT_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), lookout_http::HttpError> {
//! let client = lookout_http::HttpClient::new("https://api.example.com")?;
//! let got: serde_json::Value = client
//!     .get_json("v1/items", lookout_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```

use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
pub use reqwest::{Response, StatusCode};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;

pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

const RAW_ENV: &str = "LOOKOUT_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

const SECRET_HEADERS: &[&str] = &["authorization", "x-api-key", "x-subscription-token"];
const SECRET_PARAMS: &[&str] = &[
    "access_token",
    "authorization",
    "auth",
    "key",
    "api_key",
    "apikey",
    "token",
    "secret",
    "client_secret",
    "bearer",
];

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for [`HttpError::Api`], `None` for transport-level failures.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Authentication strategies supported by the HTTP client helpers.
///
/// ```
/// use lookout_http::{Auth, HeaderName};
///
/// let auth = Auth::api_key_header(HeaderName::from_static("x-api-key"), "secret").unwrap();
/// assert_eq!(auth.kind(), "header");
/// ```
#[derive(Clone, Debug)]
pub enum Auth<'a> {
    /// Authorization: Bearer <token>
    Bearer(&'a str),
    /// Custom header (e.g., Serper: X-API-KEY)
    Header {
        name: HeaderName,
        value: HeaderValue,
    },
    None,
}

impl Auth<'_> {
    /// Build a header credential, rejecting values that are not valid header text.
    pub fn api_key_header(name: HeaderName, key: &str) -> Result<Self, HttpError> {
        let mut value = HeaderValue::from_str(key.trim())
            .map_err(|e| HttpError::Build(format!("invalid {name} header value: {e}")))?;
        value.set_sensitive(true);
        Ok(Auth::Header { name, value })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Auth::Bearer(_) => "bearer",
            Auth::Header { .. } => "header",
            Auth::None => "none",
        }
    }
}

/// Per-request tuning knobs for the HTTP client.
///
/// ```
/// use lookout_http::RequestOpts;
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(30)),
///     retries: Some(0),
///     query: Some(vec![("q", Cow::Borrowed("rust"))]),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 30);
/// assert_eq!(opts.retries, Some(0));
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub retries: Option<usize>,
    pub auth: Option<Auth<'a>>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

#[derive(Clone)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    pub default_timeout: Duration,
    pub max_retries: usize,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// The base is treated as a directory, so `https://host/v1` and
    /// `https://host/v1/` resolve relative paths identically.
    ///
    /// ```no_run
    /// use lookout_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://api.example.com/v1")?;
    /// assert_eq!(client.base_url().as_str(), "https://api.example.com/v1/");
    /// assert_eq!(client.default_timeout, Duration::from_secs(15));
    /// assert_eq!(client.max_retries, 2);
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        let mut normalized = base.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base = Url::parse(&normalized).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            default_timeout: Duration::from_secs(15),
            max_retries: 2,
        })
    }

    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    pub fn with_retries(mut self, n: usize) -> Self {
        self.max_retries = n;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// GET JSON with per-request options.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let (resp, req_id) = self.execute(Method::GET, path, None, false, &opts).await?;
        read_json(resp, &req_id).await
    }

    /// POST a JSON body and decode a JSON response.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))?;
        let (resp, req_id) = self
            .execute(Method::POST, path, Some(&bytes), true, &opts)
            .await?;
        read_json(resp, &req_id).await
    }

    /// POST with `Content-Type: application/json` but no body; parameters
    /// travel in the query string.
    pub async fn post_empty_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let (resp, req_id) = self.execute(Method::POST, path, None, true, &opts).await?;
        read_json(resp, &req_id).await
    }

    /// POST a JSON body and return the successful response with its body unread,
    /// for callers that consume `bytes_stream()` themselves.
    pub async fn post_stream<B>(
        &self,
        path: &str,
        body: &B,
        opts: RequestOpts<'_>,
    ) -> Result<Response, HttpError>
    where
        B: Serialize + ?Sized,
    {
        let bytes = serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))?;
        let (resp, _) = self
            .execute(Method::POST, path, Some(&bytes), true, &opts)
            .await?;
        Ok(resp)
    }

    fn resolve(&self, path: &str) -> Result<Url, HttpError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| HttpError::Url(e.to_string()))
    }

    fn build(
        &self,
        method: &Method,
        url: &Url,
        timeout: Duration,
        body: Option<&[u8]>,
        json: bool,
        opts: &RequestOpts<'_>,
    ) -> Result<RequestBuilder, HttpError> {
        let mut rb = self.inner.request(method.clone(), url.clone()).timeout(timeout);

        if let Some(q) = &opts.query {
            let pairs: Vec<(&str, &str)> = q.iter().map(|(k, v)| (*k, v.as_ref())).collect();
            rb = rb.query(&pairs);
        }
        if json {
            rb = rb.header(CONTENT_TYPE, "application/json");
        }
        if let Some(bytes) = body {
            rb = rb.body(bytes.to_vec());
        }
        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }
        match &opts.auth {
            Some(Auth::Bearer(tok)) => rb = rb.bearer_auth(sanitize_api_key(tok)?),
            Some(Auth::Header { name, value }) => rb = rb.header(name, value),
            Some(Auth::None) | None => {}
        }
        Ok(rb)
    }

    /// Send with the retry policy and return a successful response, body unread.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
        json: bool,
        opts: &RequestOpts<'_>,
    ) -> Result<(Response, String), HttpError> {
        let url = self.resolve(path)?;
        let max_retries = opts.retries.unwrap_or(self.max_retries);
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let auth_kind = opts.auth.as_ref().map(Auth::kind).unwrap_or("none");
        let redacted_q = redact_query(opts.query.as_deref().unwrap_or_default());
        let req_id = new_request_id();
        let mut attempt = 0usize;

        loop {
            let rb = self.build(&method, &url, timeout, body, json, opts)?;

            tracing::debug!(
                req_id=%req_id,
                attempt=attempt + 1,
                max_retries,
                method=%method,
                host_path=%host_path(&url),
                query=?redacted_q,
                timeout_ms=timeout.as_millis() as u64,
                auth_kind,
                has_body=%body.is_some(),
                "http.request.start"
            );
            if raw_enabled() {
                let curl = make_curl(&method, &url, &redacted_q, opts.headers.as_ref(), body);
                tracing::debug!(target: "http.raw", %req_id, %curl, "request");
            }

            let t0 = Instant::now();
            let resp = match rb.send().await {
                Ok(resp) => resp,
                Err(err) => {
                    let message = err.to_string();
                    if attempt < max_retries {
                        attempt += 1;
                        let delay = backoff(attempt);
                        tracing::warn!(
                            req_id=%req_id,
                            attempt,
                            max_retries,
                            backoff_ms=delay.as_millis() as u64,
                            message=%message,
                            "http.retrying.network_send"
                        );
                        sleep(delay).await;
                        continue;
                    }
                    tracing::warn!(req_id=%req_id, attempt, message=%message, "http.network_error.send");
                    return Err(HttpError::Network(message));
                }
            };

            let status = resp.status();
            let request_id = response_request_id(resp.headers());
            tracing::debug!(
                req_id=%req_id,
                %status,
                duration_ms=t0.elapsed().as_millis() as u64,
                x_request_id=%request_id,
                "http.response.headers"
            );

            if status.is_success() {
                return Ok((resp, req_id));
            }

            let headers = resp.headers().clone();
            let bytes = resp.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
            let message = extract_error_message(&bytes);
            let snippet = snip_body(&bytes);
            if raw_enabled() {
                log_raw_response(&req_id, status, &headers, &bytes);
            }

            let retryable = status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
            if retryable && attempt < max_retries {
                attempt += 1;
                let delay = match retry_after_delay_secs(&headers) {
                    Some(secs) => Duration::from_secs(secs),
                    None if status == StatusCode::TOO_MANY_REQUESTS => {
                        backoff(attempt).max(Duration::from_millis(1100))
                    }
                    None => backoff(attempt),
                };
                tracing::warn!(
                    req_id=%req_id,
                    %status,
                    attempt,
                    max_retries,
                    backoff_ms=delay.as_millis() as u64,
                    message=%message,
                    "http.retrying"
                );
                sleep(delay).await;
                continue;
            }

            tracing::warn!(
                req_id=%req_id,
                %status,
                message=%message,
                x_request_id=%request_id,
                body_snippet=%snippet,
                "http.error"
            );
            return Err(HttpError::Api {
                status,
                message,
                request_id,
            });
        }
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response, req_id: &str) -> Result<T, HttpError> {
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| HttpError::Network(e.to_string()))?;
    if raw_enabled() {
        log_raw_response(req_id, status, &headers, &bytes);
    }
    let snippet = snip_body(&bytes);
    tracing::trace!(req_id=%req_id, body_len=bytes.len(), body_snippet=%snippet, "http.response.body_snippet");

    serde_json::from_slice::<T>(&bytes).map_err(|e| {
        tracing::warn!(
            req_id=%req_id,
            serde_line=%e.line(),
            serde_col=%e.column(),
            serde_err=%e,
            body_snippet=%snippet,
            "http.response.decode_error"
        );
        HttpError::Decode(e.to_string(), snippet)
    })
}

fn new_request_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("r{}", &id[..12])
}

fn backoff(attempt: usize) -> Duration {
    Duration::from_millis(200u64.saturating_mul(1 << (attempt.saturating_sub(1)).min(16)))
}

fn host_path(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or("-"), url.path())
}

fn response_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .or_else(|| headers.get("x-correlation-id"))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

fn is_secret_param(name: &str) -> bool {
    SECRET_PARAMS.contains(&name.to_ascii_lowercase().as_str())
}

fn is_secret_header(name: &str) -> bool {
    SECRET_HEADERS.contains(&name.to_ascii_lowercase().as_str())
}

fn redact_query(query: &[(&str, Cow<'_, str>)]) -> Vec<(String, String)> {
    query
        .iter()
        .map(|(k, v)| {
            let value = if is_secret_param(k) {
                "<redacted>".to_string()
            } else {
                v.to_string()
            };
            ((*k).to_string(), value)
        })
        .collect()
}

fn redact_headers(h: &HeaderMap) -> Vec<(String, String)> {
    h.iter()
        .map(|(k, v)| {
            let key = k.as_str().to_string();
            let val = if is_secret_header(&key) {
                "<redacted>".to_string()
            } else {
                v.to_str().unwrap_or("").to_string()
            };
            (key, val)
        })
        .collect()
}

/// Render a best-effort curl command for repro/debug, with secrets redacted.
fn make_curl(
    method: &Method,
    url: &Url,
    query: &[(String, String)],
    headers: Option<&HeaderMap>,
    body: Option<&[u8]>,
) -> String {
    let mut parts = vec!["curl".to_string(), format!("-X{method}")];
    for (name, val) in headers.map(redact_headers).unwrap_or_default() {
        parts.push(format!("-H '{}: {}'", name, val.replace('\'', r"'\''")));
    }
    if let Some(bytes) = body {
        let mut s = String::from_utf8_lossy(bytes).to_string();
        if s.len() > RAW_MAX_BODY {
            s = truncate_at_char_boundary(&s, RAW_MAX_BODY);
            s.push('…');
        }
        parts.push(format!("-d '{}'", s.replace('\'', r"'\''")));
    }
    let mut shown = url.clone();
    if !query.is_empty() {
        shown
            .query_pairs_mut()
            .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    parts.push(format!("'{}'", shown.as_str()));
    parts.join(" ")
}

fn log_raw_response(req_id: &str, status: StatusCode, headers: &HeaderMap, body: &[u8]) {
    let truncated = body.len() > RAW_MAX_BODY;
    let text = String::from_utf8_lossy(&body[..body.len().min(RAW_MAX_BODY)]);
    tracing::info!(
        target: "http.raw",
        %req_id,
        status=%status,
        headers=?redact_headers(headers),
        body=%text,
        truncated
    );
}

fn extract_error_message(body: &[u8]) -> String {
    // OpenAI style: {"error":{"message":"..."}}
    #[derive(Deserialize)]
    struct Nested {
        error: NestedDetail,
    }
    #[derive(Deserialize)]
    struct NestedDetail {
        message: String,
    }

    // Generic: {"message":"..."} or {"detail":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Flat {
        #[serde(default)]
        message: String,
        #[serde(default)]
        detail: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(env) = serde_json::from_slice::<Nested>(body) {
        return env.error.message;
    }
    if let Ok(m) = serde_json::from_slice::<Flat>(body) {
        for candidate in [m.message, m.detail, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

fn retry_after_delay_secs(h: &HeaderMap) -> Option<u64> {
    h.get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())?
        .trim()
        .parse()
        .ok()
}

fn snip_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() > SNIPPET_MAX {
        format!("{}...", truncate_at_char_boundary(&text, SNIPPET_MAX))
    } else {
        text.to_string()
    }
}

fn truncate_at_char_boundary(s: &str, max: usize) -> String {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

fn sanitize_api_key(raw: &str) -> Result<String, HttpError> {
    let mut s = raw
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();
    s.retain(|ch| !ch.is_ascii_whitespace());

    if !s.is_ascii() {
        return Err(HttpError::Build("API key contains non-ASCII bytes".into()));
    }
    if s.bytes().any(|b| b < 0x20 || b == 0x7F) {
        return Err(HttpError::Build(
            "API key contains control characters".into(),
        ));
    }
    HeaderValue::from_str(&format!("Bearer {s}"))
        .map_err(|e| HttpError::Build(format!("invalid Authorization header: {e}")))?;
    Ok(s)
}
