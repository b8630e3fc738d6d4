//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Args, Parser, Subcommand};

/// Default port for the HTTP transports.
pub const DEFAULT_PORT: u16 = 8000;

/// manual-mcp: engineering handbook tools for MCP clients.
///
/// Serves question answering and page lookup over an indexed engineering
/// manual via MCP (stdio or HTTP) or a plain JSON API.
#[derive(Parser, Debug)]
#[command(name = "manual-mcp")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for one-shot commands (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start MCP (Model Context Protocol) server.
    #[command(subcommand)]
    Mcp(McpCommands),

    /// Start the HTTP JSON API.
    #[command(after_help = r#"Examples:
  manual-mcp rest                           # Listen on 127.0.0.1:8000
  PORT=9000 manual-mcp rest --host 0.0.0.0  # Bind all interfaces
  manual-mcp rest --auth                    # Require bearer tokens on /tools
"#)]
    Rest {
        /// Listener settings.
        #[command(flatten)]
        http: HttpArgs,
    },

    /// Answer a question from the manual once and print the result.
    #[command(after_help = r#"Examples:
  manual-mcp search "Is Missouri a high wind zone?"
  manual-mcp --format json search "motor efficiency requirements"
"#)]
    Search {
        /// The technical question or search query.
        query: String,
    },

    /// Print one page of the manual.
    Page {
        /// Page number (1-150).
        #[arg(allow_negative_numbers = true)]
        page_number: i64,
    },

    /// Check that the page store is reachable.
    Health,
}

/// MCP server transports.
#[derive(Subcommand, Debug)]
pub enum McpCommands {
    /// Start MCP server with stdio transport.
    ///
    /// Reads JSON-RPC messages from stdin, writes responses to stdout.
    #[command(after_help = r#"Examples:
  manual-mcp mcp stdio                         # Start stdio MCP server
"#)]
    Stdio,

    /// Start MCP server with SSE/HTTP transport.
    ///
    /// Listens for incoming HTTP connections using streamable HTTP transport.
    #[command(after_help = r#"Examples:
  manual-mcp mcp sse                            # Listen on 127.0.0.1:8000
  manual-mcp mcp sse --host 0.0.0.0 --port 8080 --auth
"#)]
    Sse {
        /// Listener settings.
        #[command(flatten)]
        http: HttpArgs,
    },
}

/// Listener settings shared by the HTTP transports.
#[derive(Args, Debug, Clone)]
pub struct HttpArgs {
    /// Host address to bind to.
    #[arg(long, env = "MANUAL_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Require `Authorization: Bearer <token>` verified by the identity
    /// provider (needs `CLERK_SECRET_KEY` and the publishable key).
    #[arg(long)]
    pub auth: bool,
}
