//! In-memory collaborators shared by unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
use crate::agent::provider::LlmProvider;
use crate::auth::{Session, TokenVerifier};
use crate::core::PageRecord;
use crate::error::{AgentError, AuthError, StoreError};
use crate::store::{AgentAnswer, PageStore, QueryAgent};

/// Store serving a fixed record list.
///
/// `near_text` returns the first `limit` records regardless of the query;
/// `fetch_page` applies the exact page filter; `fetch_by_id` resolves ids
/// registered with [`MockStore::with_ids`].
pub struct MockStore {
    records: Vec<PageRecord>,
    by_id: Vec<(String, PageRecord)>,
    fail: bool,
    pub near_text_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub last_limit: AtomicUsize,
    pub fetch_by_id_calls: AtomicUsize,
}

impl MockStore {
    pub const fn new(records: Vec<PageRecord>) -> Self {
        Self {
            records,
            by_id: Vec::new(),
            fail: false,
            near_text_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            last_limit: AtomicUsize::new(0),
            fetch_by_id_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_ids(records: Vec<(&str, PageRecord)>) -> Self {
        let mut store = Self::empty();
        store.by_id = records
            .into_iter()
            .map(|(id, record)| (id.to_string(), record))
            .collect();
        store
    }

    pub const fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing() -> Self {
        let mut store = Self::empty();
        store.fail = true;
        store
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail {
            Err(StoreError::Request {
                message: "connection refused".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PageStore for MockStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn near_text(&self, _query: &str, limit: usize) -> Result<Vec<PageRecord>, StoreError> {
        self.near_text_calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(limit, Ordering::SeqCst);
        self.check()?;
        Ok(self.records.iter().take(limit).cloned().collect())
    }

    async fn fetch_page(&self, page: i64, limit: usize) -> Result<Vec<PageRecord>, StoreError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.last_limit.store(limit, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .records
            .iter()
            .filter(|r| r.page == page)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<PageRecord>, StoreError> {
        self.fetch_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .by_id
            .iter()
            .find(|(known, _)| known == id)
            .map(|(_, record)| record.clone()))
    }

    async fn is_ready(&self) -> Result<(), StoreError> {
        self.check()
    }
}

/// Query agent returning a fixed answer.
pub struct MockQueryAgent {
    answer: Option<AgentAnswer>,
    pub call_count: AtomicUsize,
}

impl MockQueryAgent {
    pub fn answering(final_answer: &str, source_ids: &[&str]) -> Self {
        Self {
            answer: Some(AgentAnswer {
                final_answer: final_answer.to_string(),
                source_ids: source_ids.iter().map(|id| (*id).to_string()).collect(),
            }),
            call_count: AtomicUsize::new(0),
        }
    }

    pub const fn failing() -> Self {
        Self {
            answer: None,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueryAgent for MockQueryAgent {
    async fn ask(&self, _question: &str) -> Result<AgentAnswer, StoreError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.answer.clone().ok_or(StoreError::Status {
            status: 502,
            body: "agent unavailable".to_string(),
        })
    }
}

/// Provider answering every request with the same text.
pub struct MockProvider {
    answer: Result<String, String>,
    delay: Option<Duration>,
    pub call_count: AtomicUsize,
    pub last_request: Mutex<Option<ChatRequest>>,
}

impl MockProvider {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            delay: None,
            call_count: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            ..Self::answering("")
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::answering("late")
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.last_request
            .lock()
            .map_or(None, |guard| guard.clone())
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.last_request.lock() {
            *slot = Some(request.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.answer {
            Ok(content) => Ok(ChatResponse {
                content: content.clone(),
                usage: TokenUsage::default(),
                finish_reason: Some("stop".to_string()),
            }),
            Err(message) => Err(AgentError::ApiRequest {
                message: message.clone(),
                status: Some(500),
            }),
        }
    }
}

/// Verifier accepting exactly one token.
pub struct MockVerifier {
    valid_token: String,
    pub call_count: AtomicUsize,
}

impl MockVerifier {
    pub fn accepting(token: &str) -> Self {
        Self {
            valid_token: token.to_string(),
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenVerifier for MockVerifier {
    async fn verify(&self, token: &str) -> Result<Session, AuthError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if token == self.valid_token {
            Ok(Session {
                user_id: Some("user_123".to_string()),
            })
        } else {
            Err(AuthError::Rejected { status: 401 })
        }
    }
}

/// Three records for the wind-zone scenario: pages 3, 5, 5 with a map on
/// the first page-5 record.
pub fn wind_zone_records() -> Vec<PageRecord> {
    vec![
        PageRecord::text("Design Criteria", 3, "Design wind speed is 90 mph."),
        PageRecord::text("Wind Zones", 5, "See the wind zone map.")
            .with_visual(crate::core::PngImage::new(vec![0x89, b'P', b'N', b'G'])),
        PageRecord::text("Wind Zones", 5, "Zone II covers the central states."),
    ]
}
