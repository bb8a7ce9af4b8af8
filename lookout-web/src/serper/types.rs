use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One search request, built per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub term: String,
    /// Endpoint path segment: `search`, `news`, `images`, ...
    pub search_type: String,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            search_type: lookout_common::DEFAULT_SEARCH_TYPE.to_string(),
        }
    }

    pub fn with_type(mut self, search_type: impl Into<String>) -> Self {
        self.search_type = search_type.into();
        self
    }
}

/// Provider payload. Every section is optional and a section of the wrong
/// shape reads as absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSearchResult {
    #[serde(rename = "answerBox", default, deserialize_with = "lenient")]
    pub answer_box: Option<AnswerBox>,

    #[serde(rename = "knowledgeGraph", default, deserialize_with = "lenient")]
    pub knowledge_graph: Option<KnowledgeGraph>,

    #[serde(default, deserialize_with = "lenient_organic")]
    pub organic: Option<Vec<OrganicResult>>,
}

/// Google "featured snippet" / direct answer block.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AnswerBox {
    #[serde(default, deserialize_with = "lenient")]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub snippet: Option<String>,
    #[serde(rename = "snippetHighlighted", default, deserialize_with = "lenient")]
    pub snippet_highlighted: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KnowledgeGraph {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    /// Key order follows the payload.
    #[serde(default, deserialize_with = "lenient")]
    pub attributes: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OrganicResult {
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub snippet: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub attributes: Option<Map<String, Value>>,
}

/// Accept any JSON value; keep it only if it has the expected shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// A non-array `organic` is absent; a malformed entry becomes an empty
/// result so it still occupies its position.
fn lenient_organic<'de, D>(deserializer: D) -> Result<Option<Vec<OrganicResult>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(entries) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        entries
            .into_iter()
            .map(|entry| serde_json::from_value(entry).unwrap_or_default())
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sections_are_optional() {
        let raw: RawSearchResult = serde_json::from_value(json!({})).unwrap();
        assert!(raw.answer_box.is_none());
        assert!(raw.knowledge_graph.is_none());
        assert!(raw.organic.is_none());
    }

    #[test]
    fn wrong_shapes_read_as_absent() {
        let raw: RawSearchResult = serde_json::from_value(json!({
            "answerBox": "not an object",
            "knowledgeGraph": { "title": 7, "type": "Person", "attributes": [1, 2] },
            "organic": { "oops": true }
        }))
        .unwrap();
        assert!(raw.answer_box.is_none());
        let kg = raw.knowledge_graph.unwrap();
        assert!(kg.title.is_none());
        assert_eq!(kg.kind.as_deref(), Some("Person"));
        assert!(kg.attributes.is_none());
        assert!(raw.organic.is_none());
    }

    #[test]
    fn malformed_organic_entry_keeps_its_slot() {
        let raw: RawSearchResult = serde_json::from_value(json!({
            "organic": [42, { "snippet": "ok", "link": null }]
        }))
        .unwrap();
        let organic = raw.organic.unwrap();
        assert_eq!(organic.len(), 2);
        assert!(organic[0].snippet.is_none());
        assert_eq!(organic[1].snippet.as_deref(), Some("ok"));
        assert!(organic[1].link.is_none());
    }

    #[test]
    fn attributes_keep_payload_order() {
        let raw: RawSearchResult = serde_json::from_str(
            r#"{"knowledgeGraph":{"attributes":{"Zeta":"1","Alpha":"2","Mid":"3"}}}"#,
        )
        .unwrap();
        let keys: Vec<_> = raw
            .knowledge_graph
            .unwrap()
            .attributes
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(keys, ["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn query_defaults_to_search_type() {
        let q = SearchQuery::new("rust 1.0 release date");
        assert_eq!(q.search_type, "search");
        assert_eq!(q.with_type("news").search_type, "news");
    }
}
