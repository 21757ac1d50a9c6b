//! Configuration management for the MCP server.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};

/// Command-line arguments for the standalone MCP server.
#[derive(Parser, Debug, Clone)]
#[command(name = "x64dbg-mcp-server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MCP server exposing x64dbg host commands over HTTP/SSE")]
pub struct Args {
    /// Address to bind the listener to
    #[arg(short, long, default_value = "0.0.0.0", env = "X64DBG_MCP_BIND")]
    pub bind: IpAddr,

    /// HTTP port
    #[arg(short, long, default_value = "3001", env = "X64DBG_MCP_PORT")]
    pub port: u16,

    /// Enable debug logging
    #[arg(short, long, env = "X64DBG_MCP_DEBUG")]
    pub debug: bool,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bind address
    pub bind: IpAddr,
    /// HTTP port
    pub port: u16,
    /// Debug mode
    pub debug: bool,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            bind: args.bind,
            port: args.port,
            debug: args.debug,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3001,
            debug: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.bind, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.port, 3001);
        assert!(!config.debug);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            port: 8080,
            debug: true,
            ..Config::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"port\":8080"));
        assert!(json.contains("\"debug\":true"));
    }

    #[test]
    fn test_config_deserialization() {
        let json = r#"{
            "bind": "127.0.0.1",
            "port": 4000,
            "debug": true
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.bind, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 4000);
        assert!(config.debug);
    }

    #[test]
    fn test_args_to_config() {
        let args = Args {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 4000,
            debug: true,
        };

        let config: Config = args.into();

        assert_eq!(config.bind, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.port, 4000);
        assert!(config.debug);
    }
}
