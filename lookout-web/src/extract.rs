//! Tiered fact extraction from a raw search payload.
//!
//! The answer box is consulted first and short-circuits everything else.
//! Otherwise facts are gathered from the knowledge graph and then from the
//! leading organic results, in payload order. Absent or wrong-shaped fields
//! are skipped, never reported.

use serde_json::{Map, Value};

use crate::serper::{AnswerBox, KnowledgeGraph, OrganicResult, RawSearchResult};

/// Organic entries considered per search.
pub const MAX_ORGANIC: usize = 6;
/// Links retained from organic entries.
pub const MAX_LINKS: usize = 3;

/// Snippets and links in extraction order. At most [`MAX_LINKS`] links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFacts {
    snippets: Vec<String>,
    links: Vec<String>,
}

impl ExtractedFacts {
    pub fn snippets(&self) -> &[String] {
        &self.snippets
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    pub fn into_snippets(self) -> Vec<String> {
        self.snippets
    }

    fn push_snippet(&mut self, snippet: String) {
        self.snippets.push(snippet);
    }

    fn push_link(&mut self, link: &str) {
        if self.links.len() < MAX_LINKS {
            self.links.push(link.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerCandidate {
    /// Terminal: stream as is.
    DirectAnswer(String),
    /// Needs summarization. Never empty.
    Facts(ExtractedFacts),
    NoResults,
}

type AnswerRule = fn(&AnswerBox) -> Option<String>;
type GraphRule = fn(&KnowledgeGraph, &str, &mut ExtractedFacts);

/// First rule that fires wins.
const ANSWER_BOX_RULES: &[(&str, AnswerRule)] = &[
    ("answer", answer_verbatim),
    ("snippet", snippet_single_line),
    ("snippetHighlighted", highlights_joined),
];

/// Every rule runs, in order.
const KNOWLEDGE_GRAPH_RULES: &[(&str, GraphRule)] = &[
    ("type", graph_type),
    ("description", graph_description),
    ("attributes", graph_attributes),
];

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.is_empty())
}

fn answer_verbatim(answer_box: &AnswerBox) -> Option<String> {
    non_empty(&answer_box.answer).map(str::to_string)
}

fn snippet_single_line(answer_box: &AnswerBox) -> Option<String> {
    non_empty(&answer_box.snippet).map(|s| s.replace('\n', " "))
}

fn highlights_joined(answer_box: &AnswerBox) -> Option<String> {
    answer_box
        .snippet_highlighted
        .as_ref()
        .filter(|parts| !parts.is_empty())
        .map(|parts| parts.join(", "))
}

fn graph_type(kg: &KnowledgeGraph, title: &str, facts: &mut ExtractedFacts) {
    if let Some(kind) = non_empty(&kg.kind) {
        facts.push_snippet(format!("{title}: {kind}."));
    }
}

fn graph_description(kg: &KnowledgeGraph, _title: &str, facts: &mut ExtractedFacts) {
    if let Some(description) = non_empty(&kg.description) {
        facts.push_snippet(description.to_string());
    }
}

fn graph_attributes(kg: &KnowledgeGraph, title: &str, facts: &mut ExtractedFacts) {
    for (attribute, value) in attributes(&kg.attributes) {
        facts.push_snippet(format!("{title} {attribute}: {}.", render_value(value)));
    }
}

fn organic_entry(result: &OrganicResult, facts: &mut ExtractedFacts) {
    if let Some(snippet) = &result.snippet {
        facts.push_snippet(snippet.clone());
    }
    if let Some(link) = &result.link {
        facts.push_link(link);
    }
    for (attribute, value) in attributes(&result.attributes) {
        facts.push_snippet(format!("{attribute}: {}.", render_value(value)));
    }
}

fn attributes(map: &Option<Map<String, Value>>) -> impl Iterator<Item = (&String, &Value)> {
    map.iter().flat_map(|m| m.iter())
}

/// Strings render bare; anything else as its JSON text.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Direct answer from the answer box, if any rule fires.
pub fn direct_answer(answer_box: &AnswerBox) -> Option<String> {
    ANSWER_BOX_RULES.iter().find_map(|(name, rule)| {
        let hit = rule(answer_box);
        if hit.is_some() {
            tracing::debug!(target: "web.extract", rule = *name, "extract.answer_box.hit");
        }
        hit
    })
}

/// Run the full extraction policy over a payload.
///
/// ```
/// use lookout_web::extract::{extract, AnswerCandidate};
/// use lookout_web::serper::RawSearchResult;
///
/// let raw: RawSearchResult =
///     serde_json::from_str(r#"{"answerBox":{"answer":"42"},"organic":[]}"#).unwrap();
/// assert_eq!(extract(&raw), AnswerCandidate::DirectAnswer("42".into()));
/// ```
pub fn extract(raw: &RawSearchResult) -> AnswerCandidate {
    if let Some(answer) = raw.answer_box.as_ref().and_then(direct_answer) {
        return AnswerCandidate::DirectAnswer(answer);
    }

    let mut facts = ExtractedFacts::default();

    if let Some(kg) = &raw.knowledge_graph {
        let title = kg.title.as_deref().unwrap_or_default();
        for (_, rule) in KNOWLEDGE_GRAPH_RULES {
            rule(kg, title, &mut facts);
        }
    }

    for result in raw.organic.iter().flatten().take(MAX_ORGANIC) {
        organic_entry(result, &mut facts);
    }

    tracing::debug!(
        target: "web.extract",
        snippets = facts.snippets.len(),
        links = facts.links.len(),
        "extract.facts"
    );

    if facts.is_empty() {
        AnswerCandidate::NoResults
    } else {
        AnswerCandidate::Facts(facts)
    }
}
