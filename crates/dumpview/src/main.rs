//! dumpview: debugger pretty-printers for raw memory snapshots.
//!
//! This binary serves as an MCP (Model Context Protocol) server that decodes
//! tinystl, glm and nanoem values into display trees. It communicates via
//! stdio transport.

mod dumpers;
mod inspector;
mod memory;
mod server;

use rmcp::ServiceExt;
use rmcp::transport::stdio;
use server::tools::DumpviewServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for MCP
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("dumpview MCP server starting...");

    let service = DumpviewServer::new()
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("Server error: {}", e))?;

    tracing::info!("dumpview MCP server running on stdio");
    service.waiting().await?;

    tracing::info!("dumpview MCP server shutting down");
    Ok(())
}
