//! MCP transport layer for stdio and SSE.
//!
//! Provides functions to start the MCP server with different transports.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use rmcp::ServiceExt;
use rmcp::transport::io::stdio;

use super::server::ManualMcpServer;
use crate::auth::BearerAuth;
use crate::rest::health;

/// Starts the MCP server with stdio transport.
///
/// The server reads JSON-RPC messages from stdin and writes responses to stdout.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters a runtime error.
pub async fn serve_stdio(server: ManualMcpServer) -> anyhow::Result<()> {
    tracing::info!("MCP server ready on stdio");
    let service = server.serve(stdio()).await?;
    service.waiting().await?;
    Ok(())
}

/// Builds the streamable HTTP router: `/mcp` (optionally behind bearer
/// authentication), an open `/health`, and the open OAuth protected
/// resource metadata when authentication advertises one.
pub fn sse_router(
    server: ManualMcpServer,
    auth: Option<BearerAuth>,
    ct: &tokio_util::sync::CancellationToken,
) -> Router {
    use rmcp::transport::streamable_http_server::{
        StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
    };

    let orchestrator = Arc::clone(server.orchestrator());

    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            cancellation_token: ct.child_token(),
            ..Default::default()
        },
    );

    let mut mcp = Router::new().nest_service("/mcp", service);
    if let Some(auth) = &auth {
        mcp = auth.protect(mcp).merge(auth.metadata_router());
    }

    mcp.merge(
        Router::new()
            .route("/health", get(health))
            .with_state(orchestrator),
    )
}

/// Starts the MCP server with streamable HTTP transport.
///
/// Listens on the given host and port for incoming MCP connections at `/mcp`.
/// Named `serve_sse` for CLI familiarity; the underlying transport is MCP's
/// streamable HTTP (the successor to the legacy SSE transport).
///
/// # Errors
///
/// Returns an error if the server fails to bind or encounters a runtime error.
pub async fn serve_sse(
    server: ManualMcpServer,
    host: &str,
    port: u16,
    auth: Option<BearerAuth>,
) -> anyhow::Result<()> {
    let ct = tokio_util::sync::CancellationToken::new();
    let auth_enabled = auth.is_some();
    let router = sse_router(server, auth, &ct);

    let addr = format!("{host}:{port}");
    let tcp_listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(auth = auth_enabled, "MCP server listening on http://{addr}/mcp");

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            ct.cancel();
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt as _;

    use super::*;
    use crate::agent::{AgentConfig, Orchestrator};
    use crate::auth::{OAuthEndpoints, ProtectedResource, TokenVerifier};
    use crate::test_support::{MockProvider, MockStore, MockVerifier};

    fn server() -> ManualMcpServer {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let orchestrator = Orchestrator::new(
            Arc::new(MockStore::empty()),
            Arc::new(MockProvider::answering("unused")),
            &config,
        );
        ManualMcpServer::new(Arc::new(orchestrator))
    }

    #[tokio::test]
    async fn test_health_is_open_when_auth_enabled() {
        let verifier = Arc::new(MockVerifier::accepting("t0k"));
        let ct = tokio_util::sync::CancellationToken::new();
        let auth = BearerAuth::new(Arc::clone(&verifier) as Arc<dyn TokenVerifier>);
        let router = sse_router(server(), Some(auth), &ct);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap_or_else(|_| unreachable!()),
            )
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_mcp_requires_bearer_when_auth_enabled() {
        let verifier = Arc::new(MockVerifier::accepting("t0k"));
        let ct = tokio_util::sync::CancellationToken::new();
        let auth = BearerAuth::new(Arc::clone(&verifier) as Arc<dyn TokenVerifier>);
        let router = sse_router(server(), Some(auth), &ct);

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap_or_else(|_| unreachable!()),
            )
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(verifier.calls(), 0);
    }

    fn oauth(verifier: &Arc<MockVerifier>) -> BearerAuth {
        let endpoints =
            OAuthEndpoints::from_publishable_key("pk_test_inst").unwrap_or_else(|_| unreachable!());
        BearerAuth::new(Arc::clone(verifier) as Arc<dyn TokenVerifier>)
            .with_resource(ProtectedResource::new("https://manual.example.com", &endpoints))
    }

    #[tokio::test]
    async fn test_protected_resource_metadata_is_open() {
        use http_body_util::BodyExt;

        let verifier = Arc::new(MockVerifier::accepting("t0k"));
        let ct = tokio_util::sync::CancellationToken::new();
        let router = sse_router(server(), Some(oauth(&verifier)), &ct);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/.well-known/oauth-protected-resource")
                    .body(Body::empty())
                    .unwrap_or_else(|_| unreachable!()),
            )
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response
            .into_body()
            .collect()
            .await
            .map(|b| b.to_bytes())
            .unwrap_or_default();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or_default();
        assert_eq!(body["resource"], "https://manual.example.com");
        assert_eq!(
            body["authorization_servers"],
            serde_json::json!(["https://inst.clerk.accounts.dev"])
        );
        assert_eq!(body["scopes_supported"], serde_json::json!(["user"]));
        assert_eq!(verifier.calls(), 0);
    }

    #[tokio::test]
    async fn test_mcp_challenge_names_resource_metadata() {
        let verifier = Arc::new(MockVerifier::accepting("t0k"));
        let ct = tokio_util::sync::CancellationToken::new();
        let router = sse_router(server(), Some(oauth(&verifier)), &ct);

        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap_or_else(|_| unreachable!()),
            )
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get("www-authenticate")
                .and_then(|v| v.to_str().ok()),
            Some(r#"Bearer resource_metadata="https://manual.example.com/.well-known/oauth-protected-resource""#)
        );
    }

    #[tokio::test]
    async fn test_no_metadata_route_without_auth() {
        let ct = tokio_util::sync::CancellationToken::new();
        let response = sse_router(server(), None, &ct)
            .oneshot(
                Request::builder()
                    .uri("/.well-known/oauth-protected-resource")
                    .body(Body::empty())
                    .unwrap_or_else(|_| unreachable!()),
            )
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
