//! MCP (Model Context Protocol) server for the engineering manual.
//!
//! Exposes the two manual tools over stdio or streamable HTTP.
//!
//! # Architecture
//!
//! ```text
//! MCP Client
//!   ↓ search_engineering_manual(query) | get_page_direct(page_number)
//! ManualMcpServer
//!   ↓
//! Orchestrator::search / Orchestrator::get_page
//!   ↓
//! text + image content → MCP Client
//! ```

pub mod params;
pub mod server;
pub mod transport;

pub use params::{PageParams, SearchParams};
pub use server::{ManualMcpServer, PAGE_TOOL, SEARCH_TOOL};
pub use transport::{serve_sse, serve_stdio, sse_router};
