use crate::lines::LineBuffer;
use crate::traits::{LlmClient, LlmError, LlmResponse};
use async_trait::async_trait;
use futures::StreamExt;
use lookout_common::{boxed_stream, LookoutError, Result, TextChunk, TextStream};
use lookout_http::{HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";

/// Ollama client for local model inference.
///
/// Expects a running Ollama server (see https://github.com/ollama/ollama).
pub struct OllamaClient {
    client: HttpClient,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize, Default)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Both the one-shot body and each NDJSON line of a streamed reply.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

fn parse_ndjson_line(line: &str) -> std::result::Result<Option<GenerateResponse>, LlmError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let parsed: GenerateResponse =
        serde_json::from_str(line).map_err(|e| LlmError::Stream(format!("{e}: {line}")))?;
    if let Some(err) = parsed.error {
        return Err(LlmError::Api(err));
    }
    Ok(Some(parsed))
}

impl OllamaClient {
    /// Create a client without contacting the server.
    pub fn new(base_url: &str, model: String) -> Result<Self> {
        let client = HttpClient::new(base_url)
            .map_err(|e| LookoutError::Config(format!("HttpClient init failed: {e}")))?
            .with_timeout(Duration::from_secs(120))
            .with_retries(0);
        Ok(Self { client, model })
    }

    /// Create a client and verify server/model availability, pulling the
    /// model when the server does not have it yet.
    pub async fn connect(base_url: &str, model: String) -> Result<Self> {
        let client = Self::new(base_url, model)?;
        client.ensure_model_available().await?;
        Ok(client)
    }

    async fn fetch_available_models(&self) -> Result<Vec<String>> {
        let tags: TagsResponse = self
            .client
            .get_json(
                "api/tags",
                RequestOpts {
                    timeout: Some(Duration::from_secs(10)),
                    ..Default::default()
                },
            )
            .await
            .map_err(|_| LookoutError::Llm(OLLAMA_CONNECTION_ERROR.to_string()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn ensure_model_available(&self) -> Result<()> {
        let models = self.fetch_available_models().await?;
        if models.iter().any(|m| m == &self.model) {
            return Ok(());
        }

        tracing::info!(target: "llm.ollama", model = %self.model, "llm.ollama.pull.start");
        let _: serde_json::Value = self
            .client
            .post_json(
                "api/pull",
                &serde_json::json!({ "model": self.model, "stream": false }),
                RequestOpts {
                    timeout: Some(Duration::from_secs(600)),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| LlmError::ModelNotAvailable(format!("{}: {e}", self.model)))?;
        tracing::info!(target: "llm.ollama", model = %self.model, "llm.ollama.pull.done");
        Ok(())
    }

    fn request<'a>(
        &'a self,
        prompt: &'a str,
        system_prompt: Option<&'a str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
        stream: bool,
    ) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.model,
            prompt,
            system: system_prompt,
            stream,
            options: GenerateOptions {
                temperature,
                num_predict: max_tokens,
            },
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let req = self.request(prompt, system_prompt, max_tokens, temperature, false);
        let resp: GenerateResponse = self
            .client
            .post_json("api/generate", &req, RequestOpts::default())
            .await
            .map_err(LlmError::from)?;
        if let Some(err) = resp.error {
            return Err(LlmError::Api(err).into());
        }

        Ok(LlmResponse {
            text: resp.response,
            model: Some(self.model.clone()),
            tokens_used: resp.eval_count,
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
            .post_stream("api/generate", &req, RequestOpts::default())
            .await
            .map_err(LlmError::from)?;

        let mut body = resp.bytes_stream();
        Ok(boxed_stream(async_stream::try_stream! {
            let mut lines = LineBuffer::default();
            let mut done = false;
            while !done {
                let Some(part) = body.next().await else { break };
                let part = part.map_err(|e| LookoutError::Llm(format!("stream read failed: {e}")))?;
                for line in lines.push(&part) {
                    let Some(event) = parse_ndjson_line(&line).map_err(LookoutError::from)? else {
                        continue;
                    };
                    if !event.response.is_empty() {
                        yield TextChunk::partial(event.response);
                    }
                    if event.done {
                        done = true;
                        break;
                    }
                }
            }
            if !done {
                if let Some(line) = lines.finish() {
                    if let Some(event) = parse_ndjson_line(&line).map_err(LookoutError::from)? {
                        if !event.response.is_empty() {
                            yield TextChunk::partial(event.response);
                        }
                    }
                }
            }
            yield TextChunk::last("");
        }))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.fetch_available_models().await.is_ok())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ndjson_lines_parse() {
        let ev = parse_ndjson_line(r#"{"response":"Hi","done":false}"#)
            .unwrap()
            .unwrap();
        assert_eq!(ev.response, "Hi");
        assert!(!ev.done);
        assert!(parse_ndjson_line("   ").unwrap().is_none());
    }

    #[test]
    fn ndjson_error_field_is_api_error() {
        let err = parse_ndjson_line(r#"{"error":"model not found"}"#).unwrap_err();
        assert!(matches!(err, LlmError::Api(msg) if msg == "model not found"));
    }

    #[test]
    fn request_maps_max_tokens_to_num_predict() {
        let client = OllamaClient::new("http://localhost:11434", "llama3.2:3b".into()).unwrap();
        let req = client.request("p", Some("s"), Some(64), Some(0.1), true);
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["options"]["num_predict"], 64);
        assert_eq!(v["system"], "s");
        assert_eq!(v["stream"], true);
    }
}
