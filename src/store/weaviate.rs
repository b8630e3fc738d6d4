//! Weaviate Cloud client over the GraphQL endpoint.
//!
//! Only the two read paths the tools need are implemented: a `nearText`
//! similarity query (vectorized server-side) and an exact `page` filter.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{PageStore, StoreConfig};
use crate::core::{PageRecord, RawPageRecord};
use crate::error::{ConfigError, StoreError};

/// Properties requested for every record.
const PROPERTIES: &str = "content section page content_type has_critical_visual visual_content";
/// Maximum characters of an error body kept in [`StoreError::Status`].
pub(super) const MAX_ERROR_BODY: usize = 500;

/// [`PageStore`] backed by a Weaviate cluster.
pub struct WeaviateStore {
    client: Client,
    base_url: String,
    collection: String,
    timeout_secs: u64,
}

impl std::fmt::Debug for WeaviateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeaviateStore")
            .field("base_url", &self.base_url)
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl WeaviateStore {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unusable collection name,
    /// header value, or HTTP client setup.
    pub fn new(config: &StoreConfig) -> Result<Self, ConfigError> {
        if !is_graphql_class_name(&config.collection) {
            return Err(ConfigError::InvalidValue {
                name: "MANUAL_COLLECTION",
                reason: format!("{:?} is not a valid collection name", config.collection),
            });
        }

        Ok(Self {
            client: http_client(config)?,
            base_url: normalize_base_url(&config.url),
            collection: config.collection.clone(),
            timeout_secs: config.timeout.as_secs(),
        })
    }

    async fn graphql(&self, query: String) -> Result<Vec<PageRecord>, StoreError> {
        let url = format!("{}/v1/graphql", self.base_url);
        tracing::debug!(collection = %self.collection, query_len = query.len(), "store graphql request");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.request_error(&e))?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        parse_get_response(&body, &self.collection)
    }

    fn request_error(&self, e: &reqwest::Error) -> StoreError {
        transport_error(e, self.timeout_secs)
    }
}

#[async_trait]
impl PageStore for WeaviateStore {
    fn name(&self) -> &'static str {
        "weaviate"
    }

    async fn near_text(&self, query: &str, limit: usize) -> Result<Vec<PageRecord>, StoreError> {
        self.graphql(near_text_query(&self.collection, query, limit))
            .await
    }

    async fn fetch_page(&self, page: i64, limit: usize) -> Result<Vec<PageRecord>, StoreError> {
        self.graphql(page_filter_query(&self.collection, page, limit))
            .await
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<PageRecord>, StoreError> {
        let mut records = self.graphql(id_filter_query(&self.collection, id)).await?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.swap_remove(0))
        })
    }

    async fn is_ready(&self) -> Result<(), StoreError> {
        let url = format!("{}/v1/.well-known/ready", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.request_error(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(StoreError::Status {
            status: status.as_u16(),
            body: if status == StatusCode::SERVICE_UNAVAILABLE {
                "cluster not ready".to_string()
            } else {
                String::new()
            },
        })
    }
}

pub(super) fn transport_error(e: &reqwest::Error, timeout_secs: u64) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout {
            seconds: timeout_secs,
        }
    } else {
        StoreError::Request {
            message: e.to_string(),
        }
    }
}

/// HTTP client carrying the cluster credentials and forwarded
/// vectorizer keys on every request.
pub(super) fn http_client(config: &StoreConfig) -> Result<Client, ConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        header_value("WEAVIATE_API_KEY", &format!("Bearer {}", config.api_key.trim()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = &config.openai_key {
        headers.insert("X-OpenAI-Api-Key", header_value("OPENAI_API_KEY", key.trim())?);
    }
    if let Some(key) = &config.cohere_key {
        headers.insert("X-Cohere-Api-Key", header_value("COHERE_KEY", key.trim())?);
    }

    Client::builder()
        .timeout(config.timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| ConfigError::InvalidValue {
            name: "WEAVIATE_URL",
            reason: format!("failed to build HTTP client: {e}"),
        })
}

pub(super) fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidValue {
        name,
        reason: e.to_string(),
    })
}

/// Adds `https://` to bare cluster hosts and strips trailing slashes.
pub(super) fn normalize_base_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// GraphQL class names start with an uppercase letter and contain only
/// ASCII alphanumerics and underscores.
fn is_graphql_class_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// JSON string literals are valid GraphQL string literals.
fn graphql_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

fn near_text_query(collection: &str, query: &str, limit: usize) -> String {
    format!(
        "{{ Get {{ {collection}(nearText: {{concepts: [{concept}]}}, limit: {limit}) {{ {PROPERTIES} }} }} }}",
        concept = graphql_string(query),
    )
}

fn page_filter_query(collection: &str, page: i64, limit: usize) -> String {
    format!(
        "{{ Get {{ {collection}(where: {{path: [\"page\"], operator: Equal, valueInt: {page}}}, limit: {limit}) {{ {PROPERTIES} }} }} }}"
    )
}

fn id_filter_query(collection: &str, id: &str) -> String {
    format!(
        "{{ Get {{ {collection}(where: {{path: [\"id\"], operator: Equal, valueText: {id}}}, limit: 1) {{ {PROPERTIES} }} }} }}",
        id = graphql_string(id),
    )
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Option<Vec<GraphQlErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    #[serde(rename = "Get", default)]
    get: Option<HashMap<String, Option<Vec<RawPageRecord>>>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

/// Extracts the records for `collection` from a `Get` response body.
fn parse_get_response(body: &str, collection: &str) -> Result<Vec<PageRecord>, StoreError> {
    let response: GraphQlResponse =
        serde_json::from_str(body).map_err(|e| StoreError::Decode {
            message: e.to_string(),
        })?;

    if let Some(errors) = response.errors.filter(|errs| !errs.is_empty()) {
        return Err(StoreError::Query {
            message: errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; "),
        });
    }

    let mut get = response
        .data
        .and_then(|d| d.get)
        .ok_or_else(|| StoreError::Decode {
            message: "response has no data.Get object".to_string(),
        })?;

    let raw = get.remove(collection).ok_or_else(|| StoreError::Decode {
        message: format!("response has no results for collection {collection}"),
    })?;

    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(PageRecord::from_raw)
        .collect())
}
