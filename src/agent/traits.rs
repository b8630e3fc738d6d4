//! Agent trait definition.
//!
//! An agent pairs a fixed role (system prompt, model, output budget) with
//! a provider call. The orchestrator only talks to agents through this
//! trait, which keeps the provider swappable in tests.

use async_trait::async_trait;

use super::message::{
    ChatRequest, ChatResponse, TokenUsage, system_message, user_message_with_images,
};
use super::provider::LlmProvider;
use crate::core::PngImage;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by answer-producing agents.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Sampling temperature. `0.0` leaves the provider default in place.
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Executes the agent with a user message and optional images.
    ///
    /// Builds a two-message [`ChatRequest`] (system, then user with the
    /// images appended after the text) and delegates to the provider.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or empty responses.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
        images: Vec<PngImage>,
    ) -> Result<AgentResponse, AgentError> {
        let request = ChatRequest {
            model: self.model().to_string(),
            messages: vec![
                system_message(self.system_prompt()),
                user_message_with_images(user_msg, images),
            ],
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
        };

        let response: ChatResponse = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
