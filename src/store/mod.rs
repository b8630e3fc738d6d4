//! Page content store.
//!
//! The manual lives in a managed vector database. This module defines the
//! [`PageStore`] seam the answer pipeline depends on, the optional
//! [`QueryAgent`] seam used by the agent-backed search mode, and the
//! configuration for the production clients.

pub mod query_agent;
pub mod weaviate;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::PageRecord;
use crate::{env_parse, env_var};
use crate::error::{ConfigError, StoreError};

pub use query_agent::WeaviateQueryAgent;
pub use weaviate::WeaviateStore;

/// Default collection holding the manual.
pub const DEFAULT_COLLECTION: &str = "Cook_Engineering_Manual";
/// Default hosted query agent endpoint.
pub const DEFAULT_AGENTS_URL: &str = "https://api.agents.weaviate.io";
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How `search_engineering_manual` finds its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Raw nearest-neighbour query; every answer goes through the vision model.
    #[default]
    NearText,
    /// Hosted query agent answers first; the vision model only runs when a
    /// cited source carries a critical visual.
    QueryAgent,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "near_text" | "neartext" | "vector" => Ok(Self::NearText),
            "qa" | "query_agent" | "agent" => Ok(Self::QueryAgent),
            other => Err(format!("unknown search mode {other:?} (expected near_text or qa)")),
        }
    }
}

/// Answer from the hosted query agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentAnswer {
    /// The agent's own answer text.
    pub final_answer: String,
    /// Ids of the store objects the answer cites, in citation order.
    pub source_ids: Vec<String>,
}

/// Read-only access to indexed manual pages.
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Nearest-neighbour search keyed by `query`, best match first.
    async fn near_text(&self, query: &str, limit: usize) -> Result<Vec<PageRecord>, StoreError>;

    /// Records whose `page` equals `page`, in store order.
    async fn fetch_page(&self, page: i64, limit: usize) -> Result<Vec<PageRecord>, StoreError>;

    /// The record with object id `id`, if it exists.
    async fn fetch_by_id(&self, id: &str) -> Result<Option<PageRecord>, StoreError>;

    /// Succeeds when the store is reachable and serving.
    async fn is_ready(&self) -> Result<(), StoreError>;
}

/// Managed question-answering agent over the manual collection.
#[async_trait]
pub trait QueryAgent: Send + Sync {
    /// Asks one question.
    async fn ask(&self, question: &str) -> Result<AgentAnswer, StoreError>;
}

/// Store connection settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Cluster URL.
    pub url: String,
    /// Cluster API key.
    pub api_key: String,
    /// Collection holding the manual.
    pub collection: String,
    /// Forwarded as `X-OpenAI-Api-Key` for server-side vectorization.
    pub openai_key: Option<String>,
    /// Forwarded as `X-Cohere-Api-Key` for server-side vectorization.
    pub cohere_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Search strategy.
    pub search_mode: SearchMode,
    /// Query agent service base URL, used in [`SearchMode::QueryAgent`].
    pub agents_url: String,
}

impl StoreConfig {
    /// Creates a new builder for `StoreConfig`.
    #[must_use]
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] if `WEAVIATE_URL` or
    /// `WEAVIATE_API_KEY` is unset and [`ConfigError::InvalidValue`] for a
    /// malformed optional setting.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env()?.build()
    }
}

/// Builder for [`StoreConfig`].
#[derive(Debug, Clone, Default)]
pub struct StoreConfigBuilder {
    url: Option<String>,
    api_key: Option<String>,
    collection: Option<String>,
    openai_key: Option<String>,
    cohere_key: Option<String>,
    timeout: Option<Duration>,
    search_mode: Option<SearchMode>,
    agents_url: Option<String>,
}

impl StoreConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed
    /// `MANUAL_STORE_TIMEOUT_SECS` or `MANUAL_SEARCH_MODE`.
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        if self.url.is_none() {
            self.url = env_var("WEAVIATE_URL");
        }
        if self.api_key.is_none() {
            self.api_key = env_var("WEAVIATE_API_KEY");
        }
        if self.collection.is_none() {
            self.collection = env_var("MANUAL_COLLECTION");
        }
        if self.openai_key.is_none() {
            self.openai_key = env_var("OPENAI_API_KEY");
        }
        if self.cohere_key.is_none() {
            self.cohere_key = env_var("COHERE_KEY");
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("MANUAL_STORE_TIMEOUT_SECS")?.map(Duration::from_secs);
        }
        if self.search_mode.is_none() {
            self.search_mode = env_parse("MANUAL_SEARCH_MODE")?;
        }
        if self.agents_url.is_none() {
            self.agents_url = env_var("MANUAL_QUERY_AGENT_URL");
        }
        Ok(self)
    }

    /// Sets the cluster URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the cluster API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the collection name.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = Some(name.into());
        self
    }

    /// Sets the forwarded `OpenAI` key.
    #[must_use]
    pub fn openai_key(mut self, key: impl Into<String>) -> Self {
        self.openai_key = Some(key.into());
        self
    }

    /// Sets the forwarded Cohere key.
    #[must_use]
    pub fn cohere_key(mut self, key: impl Into<String>) -> Self {
        self.cohere_key = Some(key.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the search strategy.
    #[must_use]
    pub const fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = Some(mode);
        self
    }

    /// Sets the query agent service base URL.
    #[must_use]
    pub fn agents_url(mut self, url: impl Into<String>) -> Self {
        self.agents_url = Some(url.into());
        self
    }

    /// Builds the [`StoreConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] if the URL or API key was not set.
    pub fn build(self) -> Result<StoreConfig, ConfigError> {
        let url = self
            .url
            .ok_or(ConfigError::MissingVar { name: "WEAVIATE_URL" })?;
        let api_key = self.api_key.ok_or(ConfigError::MissingVar {
            name: "WEAVIATE_API_KEY",
        })?;

        Ok(StoreConfig {
            url,
            api_key,
            collection: self
                .collection
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            openai_key: self.openai_key,
            cohere_key: self.cohere_key,
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            search_mode: self.search_mode.unwrap_or_default(),
            agents_url: self
                .agents_url
                .map_or_else(|| DEFAULT_AGENTS_URL.to_string(), |u| u.trim_end_matches('/').to_string()),
        })
    }
}
