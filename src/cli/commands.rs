//! CLI command implementations.
//!
//! Every command builds its clients once, up front, so that missing
//! configuration fails before any listener is bound.

use std::sync::Arc;

use crate::agent::{AgentConfig, Orchestrator, create_provider};
use crate::auth::{AuthConfig, BearerAuth, ClerkVerifier, OAuthEndpoints};
use crate::cli::output::{OutputFormat, format_tool_output};
use crate::cli::parser::{Cli, Commands, HttpArgs, McpCommands};
use crate::error::{CommandError, Result};
use crate::store::{PageStore, SearchMode, StoreConfig, WeaviateQueryAgent, WeaviateStore};

/// Executes the CLI command.
///
/// # Returns
///
/// Output to print on stdout. Server commands return an empty string once
/// they shut down.
///
/// # Errors
///
/// Returns an error on missing configuration or command failure.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Mcp(cmd) => cmd_mcp(cmd),
        Commands::Rest { http } => cmd_rest(http),
        Commands::Search { query } => cmd_search(query, format),
        Commands::Page { page_number } => cmd_page(*page_number, format),
        Commands::Health => cmd_health(format),
    }
}

/// Builds the shared store and vision-model handles from the environment.
///
/// # Errors
///
/// Returns a configuration error when a required variable is missing or
/// a client cannot be constructed.
pub fn build_orchestrator() -> Result<Arc<Orchestrator>> {
    let store_config = StoreConfig::from_env()?;
    let agent_config = AgentConfig::from_env()?;

    let store: Arc<dyn PageStore> = Arc::new(WeaviateStore::new(&store_config)?);
    let provider = create_provider(&agent_config)?;

    tracing::debug!(
        collection = %store_config.collection,
        model = %agent_config.model,
        search_mode = ?store_config.search_mode,
        "clients configured"
    );

    let orchestrator = Orchestrator::new(store, Arc::from(provider), &agent_config);
    let orchestrator = match store_config.search_mode {
        SearchMode::NearText => orchestrator,
        SearchMode::QueryAgent => {
            orchestrator.with_query_agent(Arc::new(WeaviateQueryAgent::new(&store_config)?))
        }
    };
    Ok(Arc::new(orchestrator))
}

/// Builds the bearer guard when authentication is requested.
fn build_auth(enabled: bool) -> Result<Option<(BearerAuth, OAuthEndpoints)>> {
    if !enabled {
        return Ok(None);
    }
    let config = AuthConfig::from_env()?;
    let auth = BearerAuth::new(Arc::new(ClerkVerifier::new(&config)?))
        .with_resource(config.protected_resource());
    tracing::info!(
        issuer = %config.endpoints.issuer,
        resource = %config.resource_url,
        "bearer authentication enabled"
    );
    Ok(Some((auth, config.endpoints)))
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn cmd_mcp(cmd: &McpCommands) -> Result<String> {
    use crate::mcp::{ManualMcpServer, serve_sse, serve_stdio};

    let orchestrator = build_orchestrator()?;
    let auth = match cmd {
        McpCommands::Stdio => None,
        McpCommands::Sse { http } => build_auth(http.auth)?.map(|(auth, _)| auth),
    };
    let server = ManualMcpServer::new(orchestrator);

    runtime()?
        .block_on(async {
            match cmd {
                McpCommands::Stdio => serve_stdio(server).await,
                McpCommands::Sse { http } => {
                    serve_sse(server, &http.host, http.port, auth).await
                }
            }
        })
        .map_err(|e| CommandError::ExecutionFailed(format!("MCP server error: {e}")))?;

    Ok(String::new())
}

fn cmd_rest(http: &HttpArgs) -> Result<String> {
    use crate::rest::{AppState, serve};

    let orchestrator = build_orchestrator()?;
    let (auth, endpoints) = build_auth(http.auth)?.unzip();
    let state = AppState::new(orchestrator, endpoints);

    runtime()?
        .block_on(serve(state, auth, &http.host, http.port))
        .map_err(|e| CommandError::ExecutionFailed(format!("REST server error: {e}")))?;

    Ok(String::new())
}

fn cmd_search(query: &str, format: OutputFormat) -> Result<String> {
    let orchestrator = build_orchestrator()?;
    let output = runtime()?.block_on(orchestrator.search(query))?;
    Ok(format_tool_output(&output, format))
}

fn cmd_page(page: i64, format: OutputFormat) -> Result<String> {
    let orchestrator = build_orchestrator()?;
    let output = runtime()?.block_on(orchestrator.get_page(page))?;
    Ok(format_tool_output(&output, format))
}

fn cmd_health(format: OutputFormat) -> Result<String> {
    let orchestrator = build_orchestrator()?;
    runtime()?.block_on(orchestrator.store().is_ready())?;

    Ok(match format {
        OutputFormat::Text => format!(
            "store: connected ({})\nsynthesizer: configured ({})",
            orchestrator.store().name(),
            orchestrator.provider_name()
        ),
        OutputFormat::Json => serde_json::json!({
            "status": "healthy",
            "store": "connected",
            "synthesizer": "configured",
        })
        .to_string(),
    })
}
