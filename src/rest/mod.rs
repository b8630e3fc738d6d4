//! HTTP JSON API over the manual tools.
//!
//! Open routes: `/`, `/health`, `/.well-known/mcp`, and the OAuth protected
//! resource metadata when advertised. Tool routes (`/tools`,
//! `/tools/{tool_name}`) sit behind [`require_bearer`](crate::auth::require_bearer)
//! when authentication is configured.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{FromRef, Path, State};
use axum::http::{Extensions, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;

use crate::agent::Orchestrator;
use crate::auth::{BearerAuth, OAuthEndpoints, Session};
use crate::core::ToolOutput;
use crate::error::Error;
use crate::mcp::{ManualMcpServer, PAGE_TOOL, SEARCH_TOOL};

/// Service name reported by `/`.
const SERVICE_NAME: &str = "Cook Engineering Manual MCP";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    endpoints: Option<OAuthEndpoints>,
}

impl AppState {
    /// Creates handler state. `endpoints` are advertised in discovery
    /// metadata and mark the service as authenticated.
    #[must_use]
    pub const fn new(orchestrator: Arc<Orchestrator>, endpoints: Option<OAuthEndpoints>) -> Self {
        Self {
            orchestrator,
            endpoints,
        }
    }
}

impl FromRef<AppState> for Arc<Orchestrator> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.orchestrator)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct ToolResponse {
    result: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
}

impl From<ToolOutput> for ToolResponse {
    fn from(output: ToolOutput) -> Self {
        Self {
            result: output.text_content(),
            images: output.images().map(|image| image.to_base64()).collect(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn bad_request(message: impl Into<String>) -> ApiError {
    error(StatusCode::BAD_REQUEST, message)
}

fn internal_error(message: impl Into<String>) -> ApiError {
    error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

/// Builds the REST router.
pub fn router(state: AppState, auth: Option<BearerAuth>) -> Router {
    let mut tools = Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/{tool_name}", post(call_tool));
    if let Some(auth) = &auth {
        tools = auth.protect(tools);
    }

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/.well-known/mcp", get(discovery))
        .merge(tools)
        .with_state(state);

    match &auth {
        Some(auth) => app.merge(auth.metadata_router()),
        None => app,
    }
}

/// Serves the REST API until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(
    state: AppState,
    auth: Option<BearerAuth>,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let auth_enabled = auth.is_some();
    let app = router(state, auth);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(auth = auth_enabled, "REST API listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "auth": if state.endpoints.is_some() { "Clerk OAuth" } else { "none" },
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Store readiness check shared by the HTTP transports.
pub async fn health(State(orchestrator): State<Arc<Orchestrator>>) -> Response {
    match orchestrator.store().is_ready().await {
        Ok(()) => Json(serde_json::json!({
            "status": "healthy",
            "store": "connected",
            "synthesizer": "configured",
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unhealthy", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn discovery(State(state): State<AppState>) -> Json<Value> {
    let mut metadata = serde_json::json!({
        "name": "cook-engineering-manual",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Search the Cook Engineering Handbook",
        "protocol": "mcp/1.0",
    });
    if let Some(endpoints) = &state.endpoints {
        metadata["auth"] = serde_json::json!({
            "type": "oauth2",
            "authorization_url": endpoints.authorization_url,
            "token_url": endpoints.token_url,
        });
    }
    Json(metadata)
}

async fn list_tools() -> Json<Vec<Value>> {
    Json(
        ManualMcpServer::tools()
            .into_iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema.as_ref(),
                })
            })
            .collect(),
    )
}

/// The verified caller's user id, when the request passed authentication.
fn caller_id(extensions: &Extensions) -> Option<&str> {
    extensions
        .get::<Session>()
        .and_then(|session| session.user_id.as_deref())
}

/// Runs one tool. Arguments may sit at the body root or under
/// `"arguments"`.
async fn call_tool(
    State(state): State<AppState>,
    Path(tool_name): Path<String>,
    extensions: Extensions,
    body: Bytes,
) -> Result<Json<ToolResponse>, ApiError> {
    let body: Value = serde_json::from_slice(&body)
        .map_err(|e| bad_request(format!("invalid JSON body: {e}")))?;
    let args = match body.get("arguments") {
        Some(nested) if nested.is_object() => nested,
        _ => &body,
    };

    tracing::info!(
        tool = %tool_name,
        user = caller_id(&extensions).unwrap_or("anonymous"),
        "tool call"
    );

    let output = match tool_name.as_str() {
        SEARCH_TOOL => {
            let query = args
                .get("query")
                .and_then(Value::as_str)
                .ok_or_else(|| bad_request("missing required argument: query"))?;
            state.orchestrator.search(query).await.map_err(|e| match e {
                Error::InvalidInput(message) => bad_request(message),
                other => internal_error(other.to_string()),
            })?
        }
        PAGE_TOOL => {
            let page = args
                .get("page_number")
                .and_then(Value::as_i64)
                .ok_or_else(|| bad_request("page_number must be an integer"))?;
            state
                .orchestrator
                .get_page(page)
                .await
                .map_err(|e| internal_error(format!("Error retrieving page: {e}")))?
        }
        other => {
            return Err(error(
                StatusCode::NOT_FOUND,
                format!("Unknown tool: {other}"),
            ));
        }
    };

    Ok(Json(ToolResponse::from(output)))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::agent::AgentConfig;
    use crate::auth::{ProtectedResource, TokenVerifier};
    use crate::test_support::{MockProvider, MockStore, MockVerifier, wind_zone_records};

    fn state(store: MockStore, provider: Arc<MockProvider>, auth: bool) -> AppState {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let orchestrator = Orchestrator::new(Arc::new(store), provider, &config);
        let endpoints = auth.then(|| {
            OAuthEndpoints::from_publishable_key("pk_test_inst").unwrap_or_else(|_| unreachable!())
        });
        AppState::new(Arc::new(orchestrator), endpoints)
    }

    fn open_app(store: MockStore, provider: Arc<MockProvider>) -> Router {
        router(state(store, provider, false), None)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap_or_else(|_| unreachable!());
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map(|b| b.to_bytes())
            .unwrap_or_default();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| unreachable!())
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn test_search_returns_result_and_images() {
        let provider = Arc::new(MockProvider::answering("Missouri is in Zone II."));
        let app = open_app(MockStore::new(wind_zone_records()), Arc::clone(&provider));

        let (status, body) = send(
            app,
            post_json(
                "/tools/search_engineering_manual",
                r#"{"query": "Is Missouri a high wind zone?"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "Missouri is in Zone II.");
        assert_eq!(body["images"], serde_json::json!(["iVBORw=="]));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_search_accepts_nested_arguments() {
        let provider = Arc::new(MockProvider::answering("ok"));
        let app = open_app(MockStore::new(wind_zone_records()), provider);

        let (status, body) = send(
            app,
            post_json(
                "/tools/search_engineering_manual",
                r#"{"arguments": {"query": "wind"}}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "ok");
    }

    #[tokio::test]
    async fn test_search_model_failure_stays_200() {
        let provider = Arc::new(MockProvider::failing("connection reset"));
        let app = open_app(MockStore::new(wind_zone_records()), provider);

        let (status, body) = send(
            app,
            post_json("/tools/search_engineering_manual", r#"{"query": "wind"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "Error calling vision model: connection reset");
    }

    #[tokio::test]
    async fn test_search_without_matches_omits_images() {
        let provider = Arc::new(MockProvider::answering("unused"));
        let app = open_app(MockStore::empty(), Arc::clone(&provider));

        let (status, body) = send(
            app,
            post_json("/tools/search_engineering_manual", r#"{"query": "warp drive"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            serde_json::json!({
                "result": "No relevant information found in the engineering manual for your query."
            })
        );
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_inputs_are_400() {
        let provider = Arc::new(MockProvider::answering("unused"));
        for (uri, body) in [
            ("/tools/search_engineering_manual", "{not json"),
            ("/tools/search_engineering_manual", r#"{"question": "wind"}"#),
            ("/tools/search_engineering_manual", r#"{"query": "  "}"#),
            ("/tools/get_page_direct", r#"{"page_number": "five"}"#),
        ] {
            let app = open_app(MockStore::empty(), Arc::clone(&provider));
            let (status, json) = send(app, post_json(uri, body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert!(json["error"].is_string());
        }
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_404() {
        let app = open_app(MockStore::empty(), Arc::new(MockProvider::answering("unused")));
        let (status, body) = send(app, post_json("/tools/delete_manual", "{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Unknown tool: delete_manual");
    }

    #[tokio::test]
    async fn test_page_lookup() {
        let provider = Arc::new(MockProvider::answering("unused"));
        let app = open_app(MockStore::new(wind_zone_records()), Arc::clone(&provider));

        let (status, body) = send(
            app,
            post_json("/tools/get_page_direct", r#"{"page_number": 3}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["result"],
            "Content from Page 3:\n\n[Design Criteria]\n\nDesign wind speed is 90 mph."
        );
        assert!(body.get("images").is_none());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_page_lookup_store_failure_is_500() {
        let app = open_app(MockStore::failing(), Arc::new(MockProvider::answering("unused")));
        let (status, body) = send(
            app,
            post_json("/tools/get_page_direct", r#"{"page_number": 3}"#),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            body["error"]
                .as_str()
                .is_some_and(|e| e.starts_with("Error retrieving page:"))
        );
    }

    #[tokio::test]
    async fn test_health() {
        let app = open_app(MockStore::empty(), Arc::new(MockProvider::answering("unused")));
        let (status, body) = send(app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let app = open_app(MockStore::failing(), Arc::new(MockProvider::answering("unused")));
        let (status, body) = send(app, get_req("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_discovery_advertises_oauth_when_enabled() {
        let provider = Arc::new(MockProvider::answering("unused"));
        let app = router(state(MockStore::empty(), Arc::clone(&provider), true), None);
        let (_, body) = send(app, get_req("/.well-known/mcp")).await;
        assert_eq!(body["auth"]["type"], "oauth2");
        assert_eq!(
            body["auth"]["token_url"],
            "https://inst.clerk.accounts.dev/oauth/token"
        );

        let app = open_app(MockStore::empty(), provider);
        let (_, body) = send(app, get_req("/.well-known/mcp")).await;
        assert!(body.get("auth").is_none());
    }

    #[tokio::test]
    async fn test_list_tools() {
        let app = open_app(MockStore::empty(), Arc::new(MockProvider::answering("unused")));
        let (status, body) = send(app, get_req("/tools")).await;
        assert_eq!(status, StatusCode::OK);
        let tools = body.as_array().cloned().unwrap_or_default();
        assert_eq!(tools.len(), 2);
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
    }

    #[tokio::test]
    async fn test_auth_guards_tools_but_not_status() {
        let verifier = Arc::new(MockVerifier::accepting("t0k"));
        let provider = Arc::new(MockProvider::answering("answer"));
        let make_app = || {
            router(
                state(MockStore::new(wind_zone_records()), Arc::clone(&provider), true),
                Some(BearerAuth::new(Arc::clone(&verifier) as Arc<dyn TokenVerifier>)),
            )
        };

        let (status, body) = send(make_app(), get_req("/tools")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "No authorization header");

        let (status, _) = send(
            make_app(),
            post_json("/tools/search_engineering_manual", r#"{"query": "wind"}"#),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(provider.calls(), 0);

        let (status, body) = send(make_app(), get_req("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["auth"], "Clerk OAuth");
        assert_eq!(verifier.calls(), 0);

        let mut request = post_json("/tools/search_engineering_manual", r#"{"query": "wind"}"#);
        request.headers_mut().insert(
            "authorization",
            "Bearer t0k".parse().unwrap_or_else(|_| unreachable!()),
        );
        let (status, body) = send(make_app(), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "answer");
        assert_eq!(verifier.calls(), 1);
        assert_eq!(provider.calls(), 1);
    }

    #[test]
    fn test_caller_id_reads_session() {
        let mut extensions = Extensions::new();
        assert_eq!(caller_id(&extensions), None);

        extensions.insert(Session {
            user_id: Some("user_123".to_string()),
        });
        assert_eq!(caller_id(&extensions), Some("user_123"));
    }

    #[tokio::test]
    async fn test_protected_resource_metadata_served_with_auth() {
        let endpoints =
            OAuthEndpoints::from_publishable_key("pk_test_inst").unwrap_or_else(|_| unreachable!());
        let auth = BearerAuth::new(Arc::new(MockVerifier::accepting("t0k")))
            .with_resource(ProtectedResource::new("http://localhost:8000", &endpoints));
        let app = router(
            state(MockStore::empty(), Arc::new(MockProvider::answering("unused")), true),
            Some(auth),
        );

        let (status, body) = send(app, get_req("/.well-known/oauth-protected-resource")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resource"], "http://localhost:8000");
        assert_eq!(
            body["authorization_servers"],
            serde_json::json!(["https://inst.clerk.accounts.dev"])
        );
    }
}
