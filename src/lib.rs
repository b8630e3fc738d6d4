//! # manual-mcp
//!
//! Engineering handbook tools for Model Context Protocol clients.
//!
//! An indexed engineering manual (text plus critical figures) lives in a
//! managed vector store. This crate answers questions about it with a
//! vision-capable model and serves two tools, `search_engineering_manual`
//! and `get_page_direct`, over MCP stdio, MCP streamable HTTP, and a JSON
//! REST API, optionally behind bearer-token authentication.
//!
//! ## Architecture
//!
//! - **Core**: page records, PNG visuals, and ordered tool output
//! - **Store**: [`store::PageStore`] and its Weaviate GraphQL client
//! - **Agent**: vision-model provider, synthesis prompt, and the
//!   [`agent::Orchestrator`] implementing both tools
//! - **Auth**: identity-provider token verification and axum middleware
//! - **MCP / REST**: transports over the shared orchestrator
//! - **CLI**: command-line interface
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use manual_mcp::agent::{AgentConfig, Orchestrator, create_provider};
//! use manual_mcp::store::{StoreConfig, WeaviateStore};
//!
//! # async fn run() -> manual_mcp::Result<()> {
//! let agent_config = AgentConfig::from_env()?;
//! let store = WeaviateStore::new(&StoreConfig::from_env()?)?;
//! let provider = create_provider(&agent_config)?;
//! let orchestrator = Orchestrator::new(Arc::new(store), Arc::from(provider), &agent_config);
//!
//! let answer = orchestrator.search("Is Missouri a high wind zone?").await?;
//! println!("{}", answer.text_content());
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod auth;
pub mod cli;
pub mod core;
pub mod error;
pub mod mcp;
pub mod rest;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use agent::Orchestrator;
pub use core::{ContentBlock, PageRecord, PngImage, ToolOutput};
pub use error::{Error, Result};
pub use store::PageStore;

/// Reads a non-blank environment variable.
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Reads and parses a non-blank environment variable.
///
/// An unset variable is `Ok(None)`; a value that does not parse is a
/// [`ConfigError::InvalidValue`](error::ConfigError::InvalidValue).
pub(crate) fn env_parse<T>(name: &'static str) -> std::result::Result<Option<T>, error::ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    parse_setting(name, env_var(name))
}

fn parse_setting<T>(
    name: &'static str,
    raw: Option<String>,
) -> std::result::Result<Option<T>, error::ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value
            .trim()
            .parse()
            .map_err(|e: T::Err| error::ConfigError::InvalidValue {
                name,
                reason: format!("{value:?}: {e}"),
            })
    })
    .transpose()
}
