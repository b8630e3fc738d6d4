//! Answer assembly over the page store and the vision model.
//!
//! Two procedures share one store handle and one provider handle:
//!
//! ```text
//! search(question)
//!   ├── validate question
//!   ├── near-text query (top 5)      → no matches: sentinel, no model call
//!   │   or query agent + cited ids   → no cited visuals: agent answer, no model call
//!   ├── SynthesisPrompt
//!   ├── SynthesizerAgent (bounded by timeout)
//!   └── answer text + one image per flagged record
//!
//! get_page(n)
//!   ├── exact page filter (up to 10) → no matches: sentinel
//!   └── page text + one image per flagged record
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::AgentConfig;
use super::prompt::SynthesisPrompt;
use super::provider::LlmProvider;
use super::synthesizer::SynthesizerAgent;
use super::traits::{Agent, AgentResponse};
use crate::core::record::{FIRST_PAGE, LAST_PAGE};
use crate::core::{PageRecord, ToolOutput};
use crate::error::{AgentError, Error, Result, StoreError};
use crate::store::{PageStore, QueryAgent};

/// Matches requested from the store per question.
pub const SEARCH_LIMIT: usize = 5;
/// Records returned for one page.
pub const PAGE_LIMIT: usize = 10;
/// Longest accepted question, in bytes.
pub const MAX_QUERY_LEN: usize = 10_000;

/// Returned when a question matches nothing.
pub const NO_RESULTS_MESSAGE: &str =
    "No relevant information found in the engineering manual for your query.";

/// Separator between records of one page.
const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Runs the search and page-lookup procedures.
pub struct Orchestrator {
    store: Arc<dyn PageStore>,
    provider: Arc<dyn LlmProvider>,
    query_agent: Option<Arc<dyn QueryAgent>>,
    synthesizer: SynthesizerAgent,
    timeout: Duration,
}

impl Orchestrator {
    /// Creates an orchestrator over shared store and provider handles.
    pub fn new(
        store: Arc<dyn PageStore>,
        provider: Arc<dyn LlmProvider>,
        config: &AgentConfig,
    ) -> Self {
        Self {
            store,
            provider,
            query_agent: None,
            synthesizer: SynthesizerAgent::new(config),
            timeout: config.timeout,
        }
    }

    /// Routes `search` through a managed query agent instead of the raw
    /// near-text query.
    #[must_use]
    pub fn with_query_agent(mut self, agent: Arc<dyn QueryAgent>) -> Self {
        self.query_agent = Some(agent);
        self
    }

    /// The shared store handle.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn PageStore> {
        &self.store
    }

    /// Name of the configured provider.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Answers a question from the manual.
    ///
    /// Store and model failures do not surface as errors: they are turned
    /// into explanatory answer text so the caller always gets a result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty or oversized question.
    pub async fn search(&self, query: &str) -> Result<ToolOutput> {
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query cannot be empty".to_string()));
        }

        if query.len() > MAX_QUERY_LEN {
            return Err(Error::InvalidInput(format!(
                "query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                query.len()
            )));
        }

        tracing::debug!(query_len = query.len(), "searching manual");

        if let Some(agent) = &self.query_agent {
            return Ok(self.search_with_agent(agent.as_ref(), query).await);
        }

        let start = Instant::now();
        let records = match self.store.near_text(query, SEARCH_LIMIT).await {
            Ok(records) => records,
            Err(e) => return Ok(search_failed(&e, self.store.name())),
        };

        if records.is_empty() {
            tracing::info!("no matching pages");
            return Ok(ToolOutput::text(NO_RESULTS_MESSAGE));
        }

        let prompt = SynthesisPrompt::from_records(query, &records);
        Ok(self.answer(&prompt, records.len(), start).await)
    }

    /// Agent-backed search: the agent answers and cites objects; the vision
    /// model only runs when a cited object carries a critical visual.
    async fn search_with_agent(&self, agent: &dyn QueryAgent, query: &str) -> ToolOutput {
        let start = Instant::now();
        let answer = match agent.ask(query).await {
            Ok(answer) => answer,
            Err(e) => return search_failed(&e, "query agent"),
        };

        let mut sources = Vec::with_capacity(answer.source_ids.len());
        for id in &answer.source_ids {
            match self.store.fetch_by_id(id).await {
                Ok(Some(record)) => sources.push(record),
                Ok(None) => tracing::warn!(id = %id, "cited object not found"),
                Err(e) => tracing::warn!(id = %id, error = %e, "failed to fetch cited object"),
            }
        }

        if !sources.iter().any(PageRecord::has_critical_visual) {
            tracing::info!(
                sources = sources.len(),
                elapsed_ms = start.elapsed().as_millis(),
                "search answered by query agent"
            );
            if answer.final_answer.trim().is_empty() {
                return ToolOutput::text(NO_RESULTS_MESSAGE);
            }
            return ToolOutput::text(answer.final_answer);
        }

        let prompt = SynthesisPrompt::from_agent_answer(query, &answer.final_answer, &sources);
        self.answer(&prompt, sources.len(), start).await
    }

    /// Runs the synthesizer and appends the prompt's images to its answer.
    async fn answer(&self, prompt: &SynthesisPrompt, matches: usize, start: Instant) -> ToolOutput {
        let answer = match self.synthesize(prompt).await {
            Ok(response) => {
                tracing::info!(
                    matches,
                    images = prompt.images().len(),
                    prompt_tokens = response.usage.prompt_tokens,
                    completion_tokens = response.usage.completion_tokens,
                    finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
                    elapsed_ms = start.elapsed().as_millis(),
                    "search answered"
                );
                response.content
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis(),
                    "vision model call failed"
                );
                format!("Error calling vision model: {e}")
            }
        };

        ToolOutput::with_images(answer, prompt.images().iter().cloned())
    }

    /// Returns the stored text and visuals of one page.
    ///
    /// Page numbers outside the manual's range are still looked up; they
    /// simply find nothing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be queried.
    pub async fn get_page(&self, page: i64) -> std::result::Result<ToolOutput, StoreError> {
        let records = self.store.fetch_page(page, PAGE_LIMIT).await?;

        if records.is_empty() {
            tracing::info!(page, "page not found");
            return Ok(ToolOutput::text(format!(
                "No content found for page {page}. The manual contains pages {FIRST_PAGE}-{LAST_PAGE}."
            )));
        }

        tracing::info!(page, records = records.len(), "page retrieved");

        let text = page_text(page, &records);
        let images: Vec<_> = records.into_iter().filter_map(|r| r.visual).collect();
        Ok(ToolOutput::with_images(text, images))
    }

    async fn synthesize(
        &self,
        prompt: &SynthesisPrompt,
    ) -> std::result::Result<AgentResponse, AgentError> {
        let text = prompt.render();
        let call = self
            .synthesizer
            .execute(&*self.provider, &text, prompt.images().to_vec());

        match tokio::time::timeout(self.timeout, call).await {
            Ok(response) => response,
            Err(_) => Err(AgentError::Timeout {
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}

fn search_failed(error: &StoreError, source: &str) -> ToolOutput {
    tracing::warn!(error = %error, source, "manual search failed");
    ToolOutput::text(format!("Error searching manual: {error}"))
}

/// `Content from Page N:` followed by each record's section and content.
fn page_text(page: i64, records: &[PageRecord]) -> String {
    let body = records
        .iter()
        .map(|r| format!("[{}]\n\n{}", r.section, r.content))
        .collect::<Vec<_>>()
        .join(PAGE_SEPARATOR);
    format!("Content from Page {page}:\n\n{body}")
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("store", &self.store.name())
            .field("provider", &self.provider.name())
            .field("query_agent", &self.query_agent.is_some())
            .field("model", &self.synthesizer.model())
            .field("timeout", &self.timeout)
            .finish()
    }
}
