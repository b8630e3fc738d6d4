//! MCP server implementation for the manual tools.
//!
//! Both tools delegate to the shared [`Orchestrator`]; this module only maps
//! arguments in and content blocks out.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};

use crate::agent::Orchestrator;
use crate::core::{ContentBlock, ToolOutput};
use crate::error::Error;

use super::params::{PageParams, SearchParams};

/// Name of the question-answering tool.
pub const SEARCH_TOOL: &str = "search_engineering_manual";
/// Name of the page lookup tool.
pub const PAGE_TOOL: &str = "get_page_direct";

/// MCP server exposing the engineering manual.
#[derive(Clone)]
pub struct ManualMcpServer {
    tool_router: ToolRouter<Self>,
    orchestrator: Arc<Orchestrator>,
}

#[tool_router]
impl ManualMcpServer {
    /// Answers a question from the manual, attaching relevant figures.
    #[tool(
        name = "search_engineering_manual",
        description = "Search the Cook Engineering Handbook for technical specifications, formulas, charts, and guidelines. Use this for questions about fans, motors, ductwork, HVAC systems, wind zones, seismic zones, etc. Examples: \"What is the friction loss for round elbows?\", \"Is Missouri a high wind zone?\", \"What are the motor efficiency requirements?\". Visual content like maps, charts, and diagrams is examined automatically and returned as images."
    )]
    async fn search_engineering_manual(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let output = self
            .orchestrator
            .search(&params.query)
            .await
            .map_err(|e| match e {
                Error::InvalidInput(message) => McpError::invalid_params(message, None),
                other => McpError::internal_error(other.to_string(), None),
            })?;

        Ok(CallToolResult::success(to_mcp_content(output)))
    }

    /// Returns one page of the manual verbatim.
    #[tool(
        name = "get_page_direct",
        description = "Retrieve a specific page from the Cook Engineering Handbook by page number. Use this when you know the exact page you need or when search results reference a specific page."
    )]
    async fn get_page_direct(
        &self,
        Parameters(params): Parameters<PageParams>,
    ) -> Result<CallToolResult, McpError> {
        let output = self
            .orchestrator
            .get_page(params.page_number)
            .await
            .map_err(|e| McpError::internal_error(format!("Error retrieving page: {e}"), None))?;

        Ok(CallToolResult::success(to_mcp_content(output)))
    }
}

#[tool_handler]
impl ServerHandler for ManualMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "cook-engineering-manual".to_string(),
                title: Some("Cook Engineering Manual".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Search the Cook Engineering Handbook with `search_engineering_manual`, or \
                 fetch a known page (1-150) with `get_page_direct`."
                    .to_string(),
            ),
        }
    }
}

impl ManualMcpServer {
    /// Creates a server over a shared orchestrator.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            orchestrator,
        }
    }

    /// The shared orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// Descriptors of every tool: name, description, and input schema.
    #[must_use]
    pub fn tools() -> Vec<Tool> {
        Self::tool_router().list_all()
    }
}

/// Text blocks become MCP text content, image blocks MCP image content.
fn to_mcp_content(output: ToolOutput) -> Vec<Content> {
    output
        .into_blocks()
        .into_iter()
        .map(|block| match block {
            ContentBlock::Text { text } => Content::text(text),
            ContentBlock::Image { data, mime_type } => Content::image(data.to_base64(), mime_type),
        })
        .collect()
}
