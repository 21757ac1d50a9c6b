//! Error types for the x64dbg MCP server.

use thiserror::Error;

use crate::mcp::protocol::error_codes;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the MCP transport and dispatch layer.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Protocol Errors =====
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid JSON RPC: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    // ===== Dispatch Errors =====
    #[error("Tool '{0}' not found.")]
    ToolNotFound(String),

    #[error("Command '{0}' is not available in this context, you must begin debugging an application first!")]
    ToolUnavailable(String),

    #[error("{0}")]
    CommandFailed(String),

    // ===== Configuration Errors =====
    #[error("Configuration error: {0}")]
    Config(String),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The JSON-RPC error code this error surfaces as on the wire.
    pub fn json_rpc_code(&self) -> i32 {
        match self {
            Self::Parse(_) => error_codes::PARSE_ERROR,
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            Self::MethodNotFound(_) | Self::ToolNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
            _ => error_codes::INTERNAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let not_found = Error::ToolNotFound("DisasmAt".to_string());
        assert_eq!(not_found.to_string(), "Tool 'DisasmAt' not found.");

        let unavailable = Error::ToolUnavailable("StepInto".to_string());
        assert!(unavailable.to_string().contains("StepInto"));
        assert!(unavailable
            .to_string()
            .contains("begin debugging an application first"));

        let params = Error::InvalidParams("Missing required argument: 'address'".to_string());
        assert_eq!(
            params.to_string(),
            "Invalid parameters: Missing required argument: 'address'"
        );
    }

    #[test]
    fn test_not_found_and_unavailable_are_distinct() {
        // Callers must be able to tell an unknown command apart from a gated one.
        let not_found = Error::ToolNotFound("Run".to_string());
        let unavailable = Error::ToolUnavailable("Run".to_string());
        assert_ne!(not_found.to_string(), unavailable.to_string());
    }

    #[test]
    fn test_json_rpc_codes() {
        assert_eq!(Error::Parse("bad".into()).json_rpc_code(), -32700);
        assert_eq!(Error::InvalidRequest("bad".into()).json_rpc_code(), -32600);
        assert_eq!(Error::MethodNotFound("x".into()).json_rpc_code(), -32601);
        assert_eq!(Error::ToolNotFound("x".into()).json_rpc_code(), -32601);
        assert_eq!(Error::InvalidParams("x".into()).json_rpc_code(), -32602);
        assert_eq!(Error::Internal("boom".into()).json_rpc_code(), -32603);
        assert_eq!(Error::CommandFailed("boom".into()).json_rpc_code(), -32603);
    }
}
