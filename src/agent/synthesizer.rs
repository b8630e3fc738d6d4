//! Synthesizer agent for answering from retrieved manual excerpts.
//!
//! Receives the rendered [`SynthesisPrompt`](super::prompt::SynthesisPrompt)
//! together with the critical visuals of the matched pages and produces
//! the final answer text.

use async_trait::async_trait;

use super::config::AgentConfig;
use super::prompt::SYNTHESIZER_SYSTEM_PROMPT;
use super::traits::Agent;

/// Agent that turns retrieved context and images into one answer.
pub struct SynthesizerAgent {
    model: String,
    max_tokens: u32,
}

impl SynthesizerAgent {
    /// Creates a synthesizer with the default system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        SYNTHESIZER_SYSTEM_PROMPT
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
