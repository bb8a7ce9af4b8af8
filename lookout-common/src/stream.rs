//! Incremental text delivery.
//!
//! Every answer leaves Lookout as a [`TextStream`]: an ordered sequence of
//! [`TextChunk`]s where the last chunk carries `is_final = true`. Fixed
//! strings go through [`stream_text`]; LLM-backed streams are built in
//! `lookout-llm`.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::{LookoutError, Result};

/// One piece of streamed output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub is_final: bool,
}

impl TextChunk {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    pub fn last(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
        }
    }
}

pub type TextStream = Pin<Box<dyn Stream<Item = Result<TextChunk>> + Send>>;

/// Erase a concrete chunk stream into a [`TextStream`].
pub fn boxed_stream<S>(stream: S) -> TextStream
where
    S: Stream<Item = Result<TextChunk>> + Send + 'static,
{
    Box::pin(stream)
}

/// Stream a complete string as a single chunk.
///
/// ```
/// use futures::StreamExt;
/// use lookout_common::{stream_text, TextChunk};
///
/// # futures::executor::block_on(async {
/// let mut s = stream_text("42", true);
/// let first = s.next().await.unwrap().unwrap();
/// assert_eq!(first, TextChunk::last("42"));
/// assert!(s.next().await.is_none());
/// # });
/// ```
pub fn stream_text(content: impl Into<String>, is_final: bool) -> TextStream {
    let chunk = TextChunk {
        text: content.into(),
        is_final,
    };
    Box::pin(futures::stream::once(async move { Ok(chunk) }))
}

/// Drain a stream into one string, stopping after the final chunk.
///
/// Fails on the first `Err` item, or when the stream ends without a chunk
/// marked final.
pub async fn collect_text(mut stream: TextStream) -> Result<String> {
    let mut out = String::new();
    while let Some(item) = stream.next().await {
        let chunk = item?;
        out.push_str(&chunk.text);
        if chunk.is_final {
            return Ok(out);
        }
    }
    Err(LookoutError::Stream(
        "stream ended without a final chunk".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_text_yields_exactly_one_chunk() {
        let chunks: Vec<_> = stream_text("hello", true).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap(), &TextChunk::last("hello"));
    }

    #[tokio::test]
    async fn collect_text_concatenates_until_final() {
        let s: TextStream = Box::pin(futures::stream::iter(vec![
            Ok(TextChunk::partial("a")),
            Ok(TextChunk::partial("b")),
            Ok(TextChunk::last("")),
            Ok(TextChunk::partial("ignored")),
        ]));
        assert_eq!(collect_text(s).await.unwrap(), "ab");
    }

    #[tokio::test]
    async fn collect_text_requires_final_chunk() {
        let err = collect_text(stream_text("partial", false)).await.unwrap_err();
        assert!(matches!(err, LookoutError::Stream(_)));
    }

    #[tokio::test]
    async fn collect_text_surfaces_stream_errors() {
        let s: TextStream = Box::pin(futures::stream::iter(vec![
            Ok(TextChunk::partial("a")),
            Err(LookoutError::Llm("boom".into())),
        ]));
        let err = collect_text(s).await.unwrap_err();
        assert!(matches!(err, LookoutError::Llm(msg) if msg == "boom"));
    }
}
