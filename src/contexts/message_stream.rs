use crate::contexts::answer_synthesizer::build_tree_from_answer;
use crate::contexts::canned_answers::build_summary_tree;
use crate::contexts::stream_extractor::{extract_spec, StreamPhase};
use crate::data::{Profile, Spec};
use serde::Serialize;
use std::fmt;

/// Where a resolved answer's tree came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    /// Extracted from the model's JSON
    Structured,
    /// Synthesized from the model's prose
    Fallback,
    /// Built from the profile alone
    Canned,
}

/// The final state of one assistant message
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAnswer {
    pub spec: Spec,
    pub source: AnswerSource,
    pub text: String,
}

/// Accumulates one message's streamed text and the latest tree seen in it.
///
/// Every message gets its own stream; nothing carries over between them.
#[derive(Debug, Clone)]
pub struct MessageStream {
    question: String,
    buffer: String,
    latest: Option<Spec>,
    chunks: usize,
}

impl MessageStream {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            buffer: String::new(),
            latest: None,
            chunks: 0,
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Text accumulated so far
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Most recent tree extracted from the buffer
    pub fn latest(&self) -> Option<&Spec> {
        self.latest.as_ref()
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Appends a chunk and re-extracts over the whole buffer.
    ///
    /// Returns the tree when this chunk produced one; it replaces any
    /// earlier tree.
    pub fn push_chunk(&mut self, chunk: &str) -> Option<&Spec> {
        self.buffer.push_str(chunk);
        self.chunks += 1;

        let spec = extract_spec(&self.buffer, StreamPhase::Streaming)?;
        self.latest = Some(spec);
        self.latest.as_ref()
    }

    /// Resolves the message once the stream has ended normally
    pub fn finish(self, profile: &Profile) -> ResolvedAnswer {
        if let Some(spec) = extract_spec(&self.buffer, StreamPhase::Ended).or(self.latest) {
            return ResolvedAnswer {
                spec,
                source: AnswerSource::Structured,
                text: self.buffer,
            };
        }

        if self.buffer.trim().is_empty() {
            tracing::debug!("empty response, using summary");
            return ResolvedAnswer {
                spec: build_summary_tree(profile),
                source: AnswerSource::Canned,
                text: self.buffer,
            };
        }

        tracing::debug!(chars = self.buffer.len(), "synthesizing tree from prose");
        ResolvedAnswer {
            spec: build_tree_from_answer(&self.question, &self.buffer, profile),
            source: AnswerSource::Fallback,
            text: self.buffer,
        }
    }

    /// Resolves the message after the request failed
    pub fn fail(self, profile: &Profile, error: &dyn fmt::Display) -> ResolvedAnswer {
        tracing::warn!(error = %error, chunks = self.chunks, "request failed, using summary");
        ResolvedAnswer {
            spec: build_summary_tree(profile),
            source: AnswerSource::Canned,
            text: self.buffer,
        }
    }
}
