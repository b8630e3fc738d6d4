//! CLI layer for manual-mcp.
//!
//! Provides the command-line interface using clap, with commands for
//! serving the manual tools and for one-shot queries.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::{build_orchestrator, execute};
pub use output::OutputFormat;
pub use parser::{Cli, Commands, HttpArgs, McpCommands};
