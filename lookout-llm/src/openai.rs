use crate::lines::LineBuffer;
use crate::traits::{LlmClient, LlmError, LlmResponse};
use async_trait::async_trait;
use futures::StreamExt;
use lookout_common::{boxed_stream, LookoutError, Result, TextChunk, TextStream};
use lookout_http::{Auth, HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

/// Client for the OpenAI Chat Completions API and compatible gateways.
pub struct OpenAiClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatContent>,
    #[serde(default)]
    delta: Option<ChatContent>,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: Option<u32>,
}

/// One parsed line of a `text/event-stream` body.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(String),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> std::result::Result<SseEvent, LlmError> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }
    if data.is_empty() {
        return Ok(SseEvent::Skip);
    }
    let chunk: ChatResponse =
        serde_json::from_str(data).map_err(|e| LlmError::Stream(format!("{e}: {data}")))?;
    let text = chunk
        .choices
        .into_iter()
        .filter_map(|c| c.delta.and_then(|d| d.content))
        .collect::<String>();
    if text.is_empty() {
        Ok(SseEvent::Skip)
    } else {
        Ok(SseEvent::Delta(text))
    }
}

impl OpenAiClient {
    /// Create a new client for the given API key and model.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        Self::with_endpoint(OPENAI_API_BASE, api_key, model)
    }

    /// Point the client at an OpenAI-compatible endpoint (Azure, gateways,
    /// local servers). `endpoint` is the API root that owns `chat/completions`.
    pub fn with_endpoint(endpoint: &str, api_key: String, model: String) -> Result<Self> {
        let client = HttpClient::new(endpoint)
            .map_err(|e| LookoutError::Config(format!("HttpClient init failed: {e}")))?
            .with_timeout(Duration::from_secs(60));

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    fn request<'a>(
        &'a self,
        prompt: &'a str,
        system_prompt: Option<&'a str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        stream: bool,
    ) -> ChatRequest<'a> {
        let system = system_prompt.unwrap_or("You are an objective, unbiased researcher.");
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens,
            temperature,
            stream,
        }
    }

    fn opts(&self) -> RequestOpts<'_> {
        RequestOpts {
            auth: Some(Auth::Bearer(&self.api_key)),
            ..Default::default()
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let req = self.request(prompt, system_prompt, max_tokens, temperature, false);
        let resp: ChatResponse = self
            .client
            .post_json("chat/completions", &req, self.opts())
            .await
            .map_err(LlmError::from)?;

        let text = resp
            .choices
            .into_iter()
            .find_map(|c| c.message.and_then(|m| m.content))
            .ok_or_else(|| LlmError::Api("completion contained no message content".into()))?;

        Ok(LlmResponse {
            text,
            model: resp.model,
            tokens_used: resp.usage.and_then(|u| u.total_tokens),
        })
    }

    async fn generate_stream(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<TextStream> {
        let req = self.request(prompt, system_prompt, max_tokens, temperature, true);
        let resp = self
            .client
            .post_stream("chat/completions", &req, self.opts())
            .await
            .map_err(LlmError::from)?;
        tracing::debug!(target: "llm.openai", model = %self.model, "llm.openai.stream.open");

        let mut body = resp.bytes_stream();
        Ok(boxed_stream(async_stream::try_stream! {
            let mut lines = LineBuffer::default();
            let mut done = false;
            while !done {
                let Some(part) = body.next().await else { break };
                let part = part.map_err(|e| LookoutError::Llm(format!("stream read failed: {e}")))?;
                for line in lines.push(&part) {
                    match parse_sse_line(&line).map_err(LookoutError::from)? {
                        SseEvent::Delta(text) => yield TextChunk::partial(text),
                        SseEvent::Done => {
                            done = true;
                            break;
                        }
                        SseEvent::Skip => {}
                    }
                }
            }
            if !done {
                if let Some(line) = lines.finish() {
                    if let SseEvent::Delta(text) = parse_sse_line(&line).map_err(LookoutError::from)? {
                        yield TextChunk::partial(text);
                    }
                }
            }
            yield TextChunk::last("");
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        match self.generate("Respond with just 'OK'", None, Some(5), Some(0.0)).await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_lines_parse_into_events() {
        let delta = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert_eq!(parse_sse_line(delta).unwrap(), SseEvent::Delta("Hel".into()));
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseEvent::Done);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseEvent::Skip);
        assert_eq!(parse_sse_line("").unwrap(), SseEvent::Skip);

        let role_only = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(role_only).unwrap(), SseEvent::Skip);
    }

    #[test]
    fn malformed_sse_payload_is_an_error() {
        assert!(matches!(
            parse_sse_line("data: {not json"),
            Err(LlmError::Stream(_))
        ));
    }

    #[test]
    fn non_streaming_request_omits_stream_flag() {
        let client = OpenAiClient::new("sk".into(), "gpt-4o-mini".into()).unwrap();
        let req = client.request("hi", None, Some(10), None, false);
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("stream").is_none());
        assert!(v.get("temperature").is_none());
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "hi");
    }
}
