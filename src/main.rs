//! x64dbg MCP Server - standalone entry point.
//!
//! Inside the plugin the host owns the lifecycle and supplies the real
//! command table; run standalone, this binary registers a small diagnostic
//! set so the transport can be exercised end to end.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use x64dbg_mcp_server::command::{
    Command, CommandParam, CommandRegistry, DebugOracle, HostDebugState, ParamType,
};
use x64dbg_mcp_server::config::{Args, Config};
use x64dbg_mcp_server::error::Result;
use x64dbg_mcp_server::http::McpServer;
use x64dbg_mcp_server::VERSION;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config: Config = args.into();

    info!("x64dbg MCP server v{}", VERSION);

    let oracle = Arc::new(HostDebugState::default());
    let registry = CommandRegistry::new(diagnostic_commands(oracle.clone()))?;
    info!("Registered {} commands", registry.len());

    let mut server = McpServer::new(config, registry, oracle);
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    server.stop();

    Ok(())
}

/// Built-in diagnostic commands for standalone runs.
fn diagnostic_commands(oracle: Arc<HostDebugState>) -> Vec<Command> {
    vec![
        Command::new(
            "Echo",
            "Returns the supplied text; useful for verifying the transport",
            |params| Ok(Some(params[0].as_str().unwrap_or_default().to_string())),
        )
        .param(CommandParam::required("text", ParamType::String))
        .mcp_only(),
        Command::new(
            "DebugState",
            "Reports the host debug state used for tool gating",
            move |_| {
                Ok(Some(format!(
                    "attached: {}, actively debugging: {}",
                    oracle.is_debugger_attached(),
                    oracle.is_actively_debugging()
                )))
            },
        ),
    ]
}
