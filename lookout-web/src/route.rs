//! Final decision: stream an answer, stream the sentinel, or hand the facts
//! to the summarizer.

use lookout_common::{stream_text, TextStream};
use lookout_llm::summarize::Summarizer;

use crate::extract::AnswerCandidate;

pub const NO_RESULTS_SENTINEL: &str = "No good Google Search Result was found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    DirectAnswer,
    NoResults,
    Delegated,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::DirectAnswer => "direct_answer",
            Outcome::NoResults => "no_results",
            Outcome::Delegated => "delegated",
        }
    }
}

/// A routed answer: which path was taken and the stream it produced.
pub struct Routed {
    outcome: Outcome,
    stream: TextStream,
}

impl Routed {
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn into_stream(self) -> TextStream {
        self.stream
    }
}

/// Turn an extraction result into a stream.
///
/// Links gathered during extraction are not part of the output.
pub fn route(
    candidate: AnswerCandidate,
    goal: &str,
    task: &str,
    summarizer: &dyn Summarizer,
) -> Routed {
    let (outcome, stream) = match candidate {
        AnswerCandidate::DirectAnswer(answer) => {
            (Outcome::DirectAnswer, stream_text(answer, true))
        }
        AnswerCandidate::Facts(facts) if !facts.is_empty() => {
            let links = facts.links().len();
            let snippets = facts.into_snippets();
            tracing::debug!(
                target: "web.route",
                snippets = snippets.len(),
                links,
                "route.delegate"
            );
            (
                Outcome::Delegated,
                summarizer.summarize(goal, task, snippets),
            )
        }
        AnswerCandidate::Facts(_) | AnswerCandidate::NoResults => {
            (Outcome::NoResults, stream_text(NO_RESULTS_SENTINEL, true))
        }
    };
    tracing::info!(target: "web.route", outcome = outcome.as_str(), "route.decided");
    Routed { outcome, stream }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use crate::serper::RawSearchResult;
    use lookout_common::{collect_text, TextChunk};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingSummarizer {
        calls: Mutex<Vec<(String, String, Vec<String>)>>,
    }

    impl Summarizer for CapturingSummarizer {
        fn summarize(&self, goal: &str, task: &str, snippets: Vec<String>) -> TextStream {
            self.calls
                .lock()
                .unwrap()
                .push((goal.into(), task.into(), snippets));
            Box::pin(futures::stream::iter(vec![
                Ok(TextChunk::partial("summary")),
                Ok(TextChunk::last("")),
            ]))
        }
    }

    fn candidate(v: serde_json::Value) -> AnswerCandidate {
        let raw: RawSearchResult = serde_json::from_value(v).unwrap();
        extract(&raw)
    }

    #[tokio::test]
    async fn direct_answer_is_one_final_chunk() {
        let summarizer = CapturingSummarizer::default();
        let routed = route(
            candidate(serde_json::json!({ "answerBox": { "answer": "42" } })),
            "g",
            "t",
            &summarizer,
        );
        assert_eq!(routed.outcome(), Outcome::DirectAnswer);

        let chunks: Vec<_> = futures::StreamExt::collect(routed.into_stream()).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &TextChunk::last("42"));
        assert!(summarizer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn no_results_streams_sentinel() {
        let summarizer = CapturingSummarizer::default();
        let routed = route(AnswerCandidate::NoResults, "g", "t", &summarizer);
        assert_eq!(routed.outcome(), Outcome::NoResults);
        assert_eq!(
            collect_text(routed.into_stream()).await.unwrap(),
            NO_RESULTS_SENTINEL
        );
        assert!(summarizer.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn facts_are_delegated_in_order() {
        let summarizer = CapturingSummarizer::default();
        let routed = route(
            candidate(serde_json::json!({
                "knowledgeGraph": { "title": "X", "type": "Person" },
                "organic": [{ "snippet": "o1", "link": "https://a" }]
            })),
            "goal",
            "task",
            &summarizer,
        );
        assert_eq!(routed.outcome(), Outcome::Delegated);
        assert_eq!(collect_text(routed.into_stream()).await.unwrap(), "summary");

        let calls = summarizer.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "goal");
        assert_eq!(calls[0].1, "task");
        assert_eq!(calls[0].2, vec!["X: Person.".to_string(), "o1".to_string()]);
    }

    #[tokio::test]
    async fn empty_facts_never_reach_summarizer() {
        let summarizer = CapturingSummarizer::default();
        let routed = route(
            AnswerCandidate::Facts(Default::default()),
            "g",
            "t",
            &summarizer,
        );
        assert_eq!(routed.outcome(), Outcome::NoResults);
        assert_eq!(
            collect_text(routed.into_stream()).await.unwrap(),
            NO_RESULTS_SENTINEL
        );
        assert!(summarizer.calls.lock().unwrap().is_empty());
    }
}
