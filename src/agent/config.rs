//! Vision model configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::time::Duration;

use crate::error::{AgentError, ConfigError};
use crate::{env_parse, env_var};

/// Default vision-capable model.
const DEFAULT_MODEL: &str = "gpt-4o";
/// Default maximum output tokens for a synthesized answer.
pub const DEFAULT_MAX_TOKENS: u32 = 1500;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for the answer synthesizer.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Vision-capable model used for synthesis.
    pub model: String,
    /// Maximum tokens for a synthesized answer.
    pub max_tokens: u32,
    /// Wall-clock limit for one synthesis call.
    pub timeout: Duration,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed numeric
    /// setting and [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> crate::Result<Self> {
        Ok(Self::builder().from_env()?.build()?)
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `MANUAL_MAX_TOKENS` or
    /// `MANUAL_SYNTH_TIMEOUT_SECS` is set but not a non-negative integer.
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        if self.provider.is_none() {
            self.provider = env_var("MANUAL_PROVIDER");
        }
        if self.api_key.is_none() {
            self.api_key = env_var("OPENAI_API_KEY");
        }
        if self.base_url.is_none() {
            self.base_url = env_var("OPENAI_BASE_URL");
        }
        if self.model.is_none() {
            self.model = env_var("MANUAL_VISION_MODEL");
        }
        if self.max_tokens.is_none() {
            self.max_tokens = env_parse("MANUAL_MAX_TOKENS")?;
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("MANUAL_SYNTH_TIMEOUT_SECS")?.map(Duration::from_secs);
        }
        Ok(self)
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the vision model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum output tokens.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        })
    }
}
