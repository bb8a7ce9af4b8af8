//! Summarization stage for search results that carry no direct answer.
//!
//! A [`Summarizer`] turns the agent's goal, its current task and a set of
//! extracted snippets into a [`TextStream`]. The stream is lazy: nothing is
//! sent to the model until the caller starts polling it.

use std::sync::Arc;

use futures::StreamExt;
use lookout_common::{boxed_stream, ModelSettings, TextChunk, TextStream};

use crate::traits::LlmClient;

/// Produces a streamed answer from search snippets.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, goal: &str, task: &str, snippets: Vec<String>) -> TextStream;
}

/// [`Summarizer`] backed by any [`LlmClient`].
pub struct LlmSummarizer {
    llm: Arc<dyn LlmClient + Send + Sync>,
    settings: ModelSettings,
}

impl LlmSummarizer {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>, settings: ModelSettings) -> Self {
        Self { llm, settings }
    }

    pub fn settings(&self) -> &ModelSettings {
        &self.settings
    }
}

pub(crate) fn build_prompt(language: &str, goal: &str, task: &str, snippets: &[String]) -> String {
    let mut prompt = format!(
        "You are working towards the overall objective: \"{goal}\".\n\
         Your current task is: \"{task}\".\n\n\
         Below are Google search results gathered for this task:\n"
    );
    for (i, snippet) in snippets.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, snippet));
    }
    prompt.push_str(&format!(
        "\nUsing only the information above, write a concise answer to the task. \
         Do not add facts that are not in the results. \
         If the results do not answer the task, say so. \
         Write the answer in {language}."
    ));
    prompt
}

impl Summarizer for LlmSummarizer {
    fn summarize(&self, goal: &str, task: &str, snippets: Vec<String>) -> TextStream {
        let llm = Arc::clone(&self.llm);
        let prompt = build_prompt(&self.settings.language, goal, task, &snippets);
        let max_tokens = self.settings.max_tokens;
        let temperature = self.settings.temperature;

        boxed_stream(async_stream::try_stream! {
            tracing::debug!(
                target: "llm.summarize",
                model = %llm.model_name(),
                snippets = snippets.len(),
                "llm.summarize.start"
            );
            let system = llm.default_research_system_prompt().to_string();
            let mut inner = llm
                .generate_stream(&prompt, Some(system.as_str()), Some(max_tokens), Some(temperature))
                .await?;
            let mut finished = false;
            while !finished {
                let Some(item) = inner.next().await else { break };
                let chunk = item?;
                finished = chunk.is_final;
                yield chunk;
            }
            if !finished {
                yield TextChunk::last("");
            }
        })
    }
}
