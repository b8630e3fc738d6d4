//! Hosted query agent client.
//!
//! The agent answers a question over the manual collection on its own and
//! cites the store objects it used. Those ids are resolved through
//! [`PageStore::fetch_by_id`](super::PageStore::fetch_by_id) by the
//! orchestrator.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::weaviate::{MAX_ERROR_BODY, header_value, http_client, normalize_base_url, transport_error};
use super::{AgentAnswer, QueryAgent, StoreConfig};
use crate::error::{ConfigError, StoreError};

/// Header naming the cluster the agent should query.
const CLUSTER_HEADER: &str = "X-Weaviate-Cluster-Url";

/// [`QueryAgent`] backed by the hosted Weaviate query agent service.
pub struct WeaviateQueryAgent {
    client: Client,
    endpoint: String,
    cluster_url: reqwest::header::HeaderValue,
    collection: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for WeaviateQueryAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaviateQueryAgent")
            .field("endpoint", &self.endpoint)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl WeaviateQueryAgent {
    /// Builds a client sharing the store's credentials.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unusable header value
    /// or HTTP client setup.
    pub fn new(config: &StoreConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: http_client(config)?,
            endpoint: format!("{}/v1/query", config.agents_url),
            cluster_url: header_value("WEAVIATE_URL", &normalize_base_url(&config.url))?,
            collection: config.collection.clone(),
            timeout_secs: config.timeout.as_secs(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    #[serde(default)]
    final_answer: Option<String>,
    #[serde(default)]
    sources: Vec<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    object_id: String,
}

#[async_trait]
impl QueryAgent for WeaviateQueryAgent {
    async fn ask(&self, question: &str) -> Result<AgentAnswer, StoreError> {
        tracing::debug!(collection = %self.collection, query_len = question.len(), "query agent request");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CLUSTER_HEADER, self.cluster_url.clone())
            .json(&serde_json::json!({
                "query": question,
                "collections": [self.collection],
            }))
            .send()
            .await
            .map_err(|e| transport_error(&e, self.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&e, self.timeout_secs))?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        parse_ask_response(&body)
    }
}

fn parse_ask_response(body: &str) -> Result<AgentAnswer, StoreError> {
    let response: AskResponse = serde_json::from_str(body).map_err(|e| StoreError::Decode {
        message: e.to_string(),
    })?;
    Ok(AgentAnswer {
        final_answer: response.final_answer.unwrap_or_default(),
        source_ids: response.sources.into_iter().map(|s| s.object_id).collect(),
    })
}
