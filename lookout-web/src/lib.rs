//! Web search answering for agents.
//!
//! - Serper Google Search client and payload types (`serper`)
//! - Tiered fact extraction from a search payload (`extract`)
//! - Routing of the extraction result to a stream or the summarizer (`route`)
//! - The agent-facing [`tool::Tool`] trait and [`tool::SearchTool`] (`tool`)
//!
//! Data flows one way per call: fetch, extract, route. Nothing is cached and
//! no state survives between calls.

pub mod extract;
pub mod route;
pub mod serper;
pub mod tool;

pub use extract::{AnswerCandidate, ExtractedFacts, extract};
pub use route::{NO_RESULTS_SENTINEL, Outcome, Routed, route};
pub use tool::{SearchTool, Tool};
