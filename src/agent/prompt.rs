//! Prompt text and the typed synthesis prompt builder.
//!
//! [`SynthesisPrompt`] holds everything sent to the vision model for one
//! question. Rendering is a pure function so the exact wording can be
//! tested without a network call.

use std::fmt::Write;

use crate::core::{PageRecord, PngImage};

/// System instruction for the synthesizer.
pub const SYNTHESIZER_SYSTEM_PROMPT: &str = "You are a technical assistant. When images are provided, examine them carefully for specific information like locations on maps, values in charts, or specifications in tables.";

/// Opening sentence of every synthesis prompt.
pub const FRAMING: &str = "You are a technical assistant helping with engineering specifications.";

/// Closing instruction of every synthesis prompt.
pub const IMAGE_INSTRUCTION: &str = "Please provide a comprehensive answer. If images are provided, carefully examine them for specific information like maps, charts, or diagrams that may contain data not in the text.";

/// Characters of record content kept per context fragment.
pub const CONTEXT_CHARS: usize = 500;

/// Formats one record as `[<section> - Page <page>]` followed by the first
/// [`CONTEXT_CHARS`] characters of its content and a literal `...`.
#[must_use]
pub fn context_fragment(record: &PageRecord) -> String {
    let excerpt: String = record.content.chars().take(CONTEXT_CHARS).collect();
    format!("[{} - Page {}]\n{excerpt}...", record.section, record.page)
}

/// One-line list of matched pages in result order, duplicates kept.
#[must_use]
pub fn page_summary(records: &[PageRecord]) -> String {
    let pages = records
        .iter()
        .map(|r| r.page.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("Found relevant information on pages: {pages}")
}

/// Everything the synthesizer receives for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisPrompt {
    question: String,
    summary: String,
    fragments: Vec<String>,
    images: Vec<PngImage>,
}

impl SynthesisPrompt {
    /// Builds the prompt from matched records, preserving their order.
    #[must_use]
    pub fn from_records(question: &str, records: &[PageRecord]) -> Self {
        Self {
            question: question.to_string(),
            summary: page_summary(records),
            fragments: records.iter().map(context_fragment).collect(),
            images: records.iter().filter_map(|r| r.visual.clone()).collect(),
        }
    }

    /// Builds the prompt around a query agent's answer, which takes the
    /// place of the page summary. `records` are the agent's cited sources.
    #[must_use]
    pub fn from_agent_answer(question: &str, answer: &str, records: &[PageRecord]) -> Self {
        Self {
            summary: answer.to_string(),
            ..Self::from_records(question, records)
        }
    }

    /// Context fragments, one per matched record.
    #[must_use]
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Critical visuals in match order.
    #[must_use]
    pub fn images(&self) -> &[PngImage] {
        &self.images
    }

    /// Renders the user message text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = String::new();
        let _ = write!(
            text,
            "{FRAMING}\n\n\
             Question: {question}\n\n\
             Initial analysis from search system:\n{summary}\n\n\
             Additional context from relevant sections:\n{context}\n\n\
             {IMAGE_INSTRUCTION}",
            question = self.question,
            summary = self.summary,
            context = self.fragments.join("\n"),
        );
        text
    }
}
