//! Serper (Google Search) API: client and payload types.

mod client;
mod types;

pub use client::{SearchError, SerperClient};
pub use types::{AnswerBox, KnowledgeGraph, OrganicResult, RawSearchResult, SearchQuery};
