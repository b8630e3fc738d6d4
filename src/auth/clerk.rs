//! Session verification against the Clerk backend API.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{AuthConfig, Session, TokenVerifier};
use crate::error::{AuthError, ConfigError};

/// Verifies tokens with `GET /v1/sessions/verify`.
pub struct ClerkVerifier {
    client: Client,
    verify_url: String,
    timeout_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
struct VerifiedSession {
    #[serde(default)]
    user_id: Option<String>,
}

impl ClerkVerifier {
    /// Builds a verifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the secret key is not a
    /// valid header value or the HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.secret_key.trim()))
            .map_err(|_| ConfigError::InvalidValue {
                name: "CLERK_SECRET_KEY",
                reason: "not a valid header value".to_string(),
            })?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                name: "CLERK_API_URL",
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            verify_url: format!("{}/v1/sessions/verify", config.api_url),
            timeout_secs: config.timeout.as_secs(),
        })
    }
}

impl std::fmt::Debug for ClerkVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkVerifier")
            .field("verify_url", &self.verify_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenVerifier for ClerkVerifier {
    async fn verify(&self, token: &str) -> Result<Session, AuthError> {
        let response = self
            .client
            .get(&self.verify_url)
            .query(&[("token", token)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::Timeout {
                        seconds: self.timeout_secs,
                    }
                } else {
                    AuthError::Verification {
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "token rejected by identity provider");
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            });
        }

        // A 200 with an unexpected body still counts as verified.
        let session: VerifiedSession = response.json().await.unwrap_or_default();
        tracing::info!(user_id = session.user_id.as_deref().unwrap_or("unknown"), "token verified");

        Ok(Session {
            user_id: session.user_id,
        })
    }
}
