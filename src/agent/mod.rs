//! Answer assembly for manual questions.
//!
//! Provides the vision-model client and the two procedures served by every
//! transport. Uses a pluggable provider abstraction backed by
//! OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! Tool call → Orchestrator
//!   ├── PageStore (near-text or exact page filter)
//!   ├── SynthesisPrompt (fragments, page summary, critical visuals)
//!   └── SynthesizerAgent → LlmProvider → answer text
//! ```

pub mod client;
pub mod config;
pub mod message;
pub mod orchestrator;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod synthesizer;
pub mod traits;

// Re-export key types
pub use client::create_provider;
pub use config::AgentConfig;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage};
pub use orchestrator::{NO_RESULTS_MESSAGE, Orchestrator};
pub use prompt::SynthesisPrompt;
pub use provider::LlmProvider;
pub use synthesizer::SynthesizerAgent;
pub use traits::{Agent, AgentResponse};
