//! Error types for manual-mcp.
//!
//! Each external collaborator gets its own error enum so that callers can
//! map failures onto the user-visible taxonomy: sentinel text, fail-soft
//! text, 400, 401, 500, or a fatal startup error.

use thiserror::Error;

/// Convenience result alias using the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Document store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Vision model failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Credential verification failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Caller supplied an unusable argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Configuration errors. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required environment variable {name}")]
    MissingVar {
        /// Variable name.
        name: &'static str,
    },

    /// A value is present but unusable.
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// Setting name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Errors from the page content store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The HTTP request could not be completed.
    #[error("store request failed: {message}")]
    Request {
        /// Transport error message.
        message: String,
    },

    /// The store answered with a non-success status.
    #[error("store returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (possibly truncated).
        body: String,
    },

    /// The store reported query errors.
    #[error("store query failed: {message}")]
    Query {
        /// Joined error messages.
        message: String,
    },

    /// The response did not have the expected shape.
    #[error("unexpected store response: {message}")]
    Decode {
        /// What was wrong.
        message: String,
    },

    /// The request exceeded its deadline.
    #[error("store request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },
}

/// Errors from the vision model client.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key configured.
    #[error("vision model API key missing (set OPENAI_API_KEY)")]
    ApiKeyMissing,

    /// Provider name not recognised.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },

    /// API call failed.
    #[error("{message}")]
    ApiRequest {
        /// Error message from the SDK.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// Response contained no usable text.
    #[error("empty response from model")]
    EmptyResponse,

    /// The request exceeded its deadline.
    #[error("request timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },
}

/// Errors from bearer-token verification.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header.
    #[error("No authorization header")]
    MissingHeader,

    /// Header present but not `Bearer <token>`.
    #[error("Invalid authorization header format")]
    MalformedHeader,

    /// Identity provider refused the token.
    #[error("Invalid token (identity provider returned HTTP {status})")]
    Rejected {
        /// Status returned by the identity provider.
        status: u16,
    },

    /// Verification call failed in transport.
    #[error("Token verification failed: {message}")]
    Verification {
        /// Transport error message.
        message: String,
    },

    /// Verification call exceeded its deadline.
    #[error("Token verification timed out after {seconds}s")]
    Timeout {
        /// Configured timeout.
        seconds: u64,
    },
}

/// CLI command errors.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Command could not be executed.
    #[error("{0}")]
    ExecutionFailed(String),
}
