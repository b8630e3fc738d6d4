//! Bearer-token authentication against the identity provider.
//!
//! Every authenticated request triggers exactly one verification call;
//! results are never cached. [`require_bearer`] is the axum middleware the
//! HTTP transports install in front of tool routes.

pub mod clerk;
pub mod middleware;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::{env_parse, env_var};
use crate::error::{AuthError, ConfigError};

pub use clerk::ClerkVerifier;
pub use middleware::{BearerAuth, require_bearer};

/// Default identity provider API base.
pub const DEFAULT_API_URL: &str = "https://api.clerk.com";
/// Default public URL of this server.
pub const DEFAULT_RESOURCE_URL: &str = "http://localhost:8000";
/// Scope every access token must carry.
pub const REQUIRED_SCOPE: &str = "user";
/// Default verification timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A verified caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Identity provider user id, when reported.
    pub user_id: Option<String>,
}

/// Verifies bearer tokens.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies one token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the token is rejected or cannot be checked.
    async fn verify(&self, token: &str) -> Result<Session, AuthError>;
}

/// Extracts the token from an `Authorization` header value.
///
/// # Errors
///
/// Returns [`AuthError::MissingHeader`] when there is no header and
/// [`AuthError::MalformedHeader`] when it is not `Bearer <token>`.
pub fn parse_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingHeader)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MalformedHeader)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(token)
}

/// OAuth endpoints advertised to clients for the interactive login flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OAuthEndpoints {
    /// Issuer base URL of the identity provider instance.
    #[serde(skip)]
    pub issuer: String,
    /// Authorization endpoint.
    pub authorization_url: String,
    /// Token endpoint.
    pub token_url: String,
}

impl OAuthEndpoints {
    /// Derives the endpoints from a publishable key of the form
    /// `pk_<environment>_<instance>`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the key has no instance part.
    pub fn from_publishable_key(key: &str) -> Result<Self, ConfigError> {
        let instance = key
            .trim()
            .split('_')
            .nth(2)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::InvalidValue {
                name: "CLERK_PUBLISHABLE_KEY",
                reason: "expected pk_<environment>_<instance>".to_string(),
            })?;

        let issuer = format!("https://{instance}.clerk.accounts.dev");
        Ok(Self {
            authorization_url: format!("{issuer}/oauth/authorize"),
            token_url: format!("{issuer}/oauth/token"),
            issuer,
        })
    }
}

/// OAuth 2.0 protected resource metadata (RFC 9728) for this server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtectedResource {
    /// Public URL of this server.
    pub resource: String,
    /// Issuers whose tokens are accepted.
    pub authorization_servers: Vec<String>,
    /// Scopes a token must carry.
    pub scopes_supported: Vec<String>,
    /// Where the token is presented.
    pub bearer_methods_supported: Vec<String>,
}

impl ProtectedResource {
    /// Path the metadata is served at.
    pub const PATH: &'static str = "/.well-known/oauth-protected-resource";

    /// Metadata for `resource_url` accepting tokens from `endpoints`' issuer.
    #[must_use]
    pub fn new(resource_url: &str, endpoints: &OAuthEndpoints) -> Self {
        Self {
            resource: resource_url.trim_end_matches('/').to_string(),
            authorization_servers: vec![endpoints.issuer.clone()],
            scopes_supported: vec![REQUIRED_SCOPE.to_string()],
            bearer_methods_supported: vec!["header".to_string()],
        }
    }

    /// Absolute URL of the metadata document.
    #[must_use]
    pub fn metadata_url(&self) -> String {
        format!("{}{}", self.resource, Self::PATH)
    }
}

/// Identity provider settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key used to call the verification API.
    pub secret_key: String,
    /// Verification API base URL.
    pub api_url: String,
    /// Endpoints derived from the publishable key.
    pub endpoints: OAuthEndpoints,
    /// Per-verification timeout.
    pub timeout: Duration,
    /// Public URL of this server, advertised as the protected resource.
    pub resource_url: String,
}

impl AuthConfig {
    /// Creates a new builder for `AuthConfig`.
    #[must_use]
    pub fn builder() -> AuthConfigBuilder {
        AuthConfigBuilder::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a key is missing or the publishable key
    /// is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::builder().from_env()?.build()
    }

    /// Protected resource metadata for this server.
    #[must_use]
    pub fn protected_resource(&self) -> ProtectedResource {
        ProtectedResource::new(&self.resource_url, &self.endpoints)
    }
}

/// Builder for [`AuthConfig`].
#[derive(Debug, Clone, Default)]
pub struct AuthConfigBuilder {
    secret_key: Option<String>,
    publishable_key: Option<String>,
    api_url: Option<String>,
    timeout: Option<Duration>,
    resource_url: Option<String>,
}

impl AuthConfigBuilder {
    /// Populates unset fields from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed
    /// `MANUAL_AUTH_TIMEOUT_SECS`.
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        if self.secret_key.is_none() {
            self.secret_key = env_var("CLERK_SECRET_KEY");
        }
        if self.publishable_key.is_none() {
            self.publishable_key = env_var("NEXT_PUBLIC_CLERK_PUBLISHABLE_KEY")
                .or_else(|| env_var("CLERK_PUBLISHABLE_KEY"));
        }
        if self.api_url.is_none() {
            self.api_url = env_var("CLERK_API_URL");
        }
        if self.timeout.is_none() {
            self.timeout = env_parse("MANUAL_AUTH_TIMEOUT_SECS")?.map(Duration::from_secs);
        }
        if self.resource_url.is_none() {
            self.resource_url = env_var("SERVER_URL");
        }
        Ok(self)
    }

    /// Sets the secret key.
    #[must_use]
    pub fn secret_key(mut self, key: impl Into<String>) -> Self {
        self.secret_key = Some(key.into());
        self
    }

    /// Sets the publishable key.
    #[must_use]
    pub fn publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = Some(key.into());
        self
    }

    /// Sets the verification API base URL.
    #[must_use]
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the verification timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the public URL of this server.
    #[must_use]
    pub fn resource_url(mut self, url: impl Into<String>) -> Self {
        self.resource_url = Some(url.into());
        self
    }

    /// Builds the [`AuthConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVar`] for a missing key and
    /// [`ConfigError::InvalidValue`] for a malformed publishable key.
    pub fn build(self) -> Result<AuthConfig, ConfigError> {
        let secret_key = self.secret_key.ok_or(ConfigError::MissingVar {
            name: "CLERK_SECRET_KEY",
        })?;
        let publishable_key = self.publishable_key.ok_or(ConfigError::MissingVar {
            name: "NEXT_PUBLIC_CLERK_PUBLISHABLE_KEY",
        })?;

        Ok(AuthConfig {
            secret_key,
            endpoints: OAuthEndpoints::from_publishable_key(&publishable_key)?,
            api_url: self
                .api_url
                .map_or_else(|| DEFAULT_API_URL.to_string(), |u| u.trim_end_matches('/').to_string()),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            resource_url: self
                .resource_url
                .map_or_else(|| DEFAULT_RESOURCE_URL.to_string(), |u| u.trim_end_matches('/').to_string()),
        })
    }
}
