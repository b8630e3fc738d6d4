//! Axum middleware enforcing bearer authentication.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use super::{ProtectedResource, TokenVerifier, parse_bearer};
use crate::error::AuthError;

/// Middleware state: the verifier and, when OAuth discovery is enabled,
/// the protected resource metadata that 401 responses point at.
#[derive(Clone)]
pub struct BearerAuth {
    verifier: Arc<dyn TokenVerifier>,
    resource: Option<Arc<ProtectedResource>>,
}

impl BearerAuth {
    /// Guards routes with `verifier`.
    #[must_use]
    pub fn new(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            verifier,
            resource: None,
        }
    }

    /// Advertises `resource` and references it from 401 responses.
    #[must_use]
    pub fn with_resource(mut self, resource: ProtectedResource) -> Self {
        self.resource = Some(Arc::new(resource));
        self
    }

    /// Wraps `router` so every route requires a bearer token.
    #[must_use]
    pub fn protect<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(axum::middleware::from_fn_with_state(self.clone(), require_bearer))
    }

    /// Open route serving the protected resource metadata, if configured.
    #[must_use]
    pub fn metadata_router(&self) -> Router {
        match &self.resource {
            Some(resource) => {
                let resource = Arc::clone(resource);
                Router::new().route(
                    ProtectedResource::PATH,
                    get(move || async move { Json(resource.as_ref().clone()) }),
                )
            }
            None => Router::new(),
        }
    }
}

impl std::fmt::Debug for BearerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerAuth")
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

/// Verifies the request's bearer token before any handler runs.
///
/// On success the [`Session`](super::Session) is inserted into the request
/// extensions. Every failure answers `401 {"error": <message>}`, with a
/// `WWW-Authenticate` challenge naming the resource metadata when one is
/// configured.
pub async fn require_bearer(
    State(auth): State<BearerAuth>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = {
        let header = request.headers().get(AUTHORIZATION).map(|v| v.to_str());
        let header = match header {
            Some(Ok(value)) => Some(value),
            Some(Err(_)) => return unauthorized(&auth, &AuthError::MalformedHeader),
            None => None,
        };
        match parse_bearer(header) {
            Ok(token) => token.to_string(),
            Err(e) => return unauthorized(&auth, &e),
        }
    };

    match auth.verifier.verify(&token).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(e) => unauthorized(&auth, &e),
    }
}

fn unauthorized(auth: &BearerAuth, error: &AuthError) -> Response {
    tracing::warn!(error = %error, "rejected request");
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": error.to_string() })),
    )
        .into_response();

    let challenge = auth.resource.as_ref().map_or_else(
        || "Bearer".to_string(),
        |resource| format!("Bearer resource_metadata=\"{}\"", resource.metadata_url()),
    );
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(WWW_AUTHENTICATE, value);
    }
    response
}
