//! JSON-RPC request processing.
//!
//! Parses request envelopes submitted over `POST /message`, routes them to a
//! fixed table of protocol method handlers, and emits results or errors as
//! SSE frames through the session registry. Stateless across requests: the
//! only stateful entity is the session itself.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::command::{CommandRegistry, DebugOracle};
use crate::error::{Error, Result};
use crate::mcp::prompts::{ListPromptsResult, PromptCatalog};
use crate::mcp::protocol::{
    error_codes, InitializeResult, JsonRpcErrorResponse, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ServerCapabilities, ServerInfo, ToolCallResult, MCP_VERSION,
};
use crate::mcp::resources::{ListResourcesResult, ResourceCatalog};
use crate::session::SessionRegistry;
use crate::{SERVER_NAME, VERSION};

/// Welcome text returned by `initialize`.
const INSTRUCTIONS: &str = "Welcome to the x64dbg MCP server!";

/// The RPC processor: one per server instance, shared across sessions.
pub struct RpcProcessor {
    sessions: Arc<SessionRegistry>,
    commands: Arc<CommandRegistry>,
    oracle: Arc<dyn DebugOracle>,
    prompts: PromptCatalog,
    resources: ResourceCatalog,
}

impl RpcProcessor {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        commands: Arc<CommandRegistry>,
        oracle: Arc<dyn DebugOracle>,
    ) -> Self {
        Self {
            sessions,
            commands,
            oracle,
            prompts: PromptCatalog::new(),
            resources: ResourceCatalog::new(),
        }
    }

    /// Replace the built-in prompt/resource catalogs.
    pub fn with_catalogs(mut self, prompts: PromptCatalog, resources: ResourceCatalog) -> Self {
        self.prompts = prompts;
        self.resources = resources;
        self
    }

    /// Handle one request body for a session. Any outcome flows back as an
    /// SSE frame (or, for unidentifiable requests, not at all); nothing
    /// propagates to the caller.
    pub async fn process(&self, session_id: &str, body: &str) {
        // A body that fails to parse as a JSON object carries no recoverable
        // id, so there is nothing to correlate an error frame to; such
        // requests are dropped with a log line only. Preserved protocol
        // behavior.
        let trimmed = body.trim();
        if trimmed.is_empty() {
            warn!("Empty request body for session {session_id}, dropping");
            return;
        }

        let parsed: Value = match serde_json::from_str(trimmed) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Unparseable JSON-RPC envelope for session {session_id}: {e}");
                return;
            }
        };
        if !parsed.is_object() {
            warn!("Non-object JSON-RPC envelope for session {session_id}, dropping");
            return;
        }

        let request: JsonRpcRequest = match serde_json::from_value(parsed) {
            Ok(request) => request,
            Err(e) => {
                warn!("Invalid JSON-RPC envelope for session {session_id}: {e}");
                return;
            }
        };

        let id = request.id;

        let method = match request
            .method
            .as_ref()
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
        {
            Some(method) => method,
            None => {
                warn!("Missing or invalid 'method' for session {session_id}");
                if !id.is_null() {
                    self.send_error(
                        session_id,
                        id,
                        error_codes::INVALID_REQUEST,
                        "Invalid JSON RPC: Missing or invalid 'method'.",
                    )
                    .await;
                }
                return;
            }
        };

        debug!("RPC call | session: {session_id}, id: {id}, method: {method}");
        let params = request.params.clone();

        // Single error boundary: every handler fault becomes an error frame
        // with the code the error maps to, and never reaches the listener.
        let outcome = match method {
            "initialize" => self.handle_initialize(),
            "notifications/initialized" => {
                debug!("Notification 'initialized' received for session {session_id}");
                return;
            }
            "rpc.discover" | "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tool_call(params),
            "prompts/list" => self.handle_prompts_list(),
            "prompts/get" => self.handle_prompts_get(params),
            "resources/list" => self.handle_resources_list(),
            other if self.commands.contains(other) => {
                warn!("Legacy direct command call '{other}' for session {session_id}");
                self.send_error(
                    session_id,
                    id,
                    error_codes::METHOD_NOT_FOUND,
                    format!("Direct command calls are deprecated. Use 'tools/call' for method '{other}'."),
                )
                .await;
                return;
            }
            other => Err(Error::MethodNotFound(other.to_string())),
        };

        match outcome {
            Ok(result) => self.send_result(session_id, id, result).await,
            Err(e) => {
                warn!("Error processing method '{method}' for session {session_id}: {e}");
                self.send_error(session_id, id, e.json_rpc_code(), e.to_string())
                    .await;
            }
        }
    }

    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities::default(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: VERSION.to_string(),
            },
            instructions: INSTRUCTIONS.to_string(),
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_tools_list(&self) -> Result<Value> {
        let tools = self.commands.list_tools(
            self.oracle.is_debugger_attached(),
            self.oracle.is_actively_debugging(),
        );
        Ok(serde_json::to_value(ListToolsResult { tools })?)
    }

    /// `tools/call` never surfaces a protocol-level error: every failure
    /// (bad params shape, unknown tool, gating, coercion, command fault)
    /// becomes an `isError` result the agent reads as ordinary tool output.
    fn handle_tool_call(&self, params: Option<Value>) -> Result<Value> {
        let result = match self.execute_tool_call(params) {
            Ok(text) => ToolCallResult::text(text, false),
            Err(message) => ToolCallResult::text(message, true),
        };
        Ok(serde_json::to_value(result)?)
    }

    fn execute_tool_call(&self, params: Option<Value>) -> std::result::Result<String, String> {
        let params = params
            .as_ref()
            .and_then(Value::as_object)
            .ok_or("Invalid or missing 'params' object for tools/call")?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .ok_or("Invalid or missing 'name' in tools/call params")?;

        let empty = Map::new();
        let arguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        match self
            .commands
            .invoke(name, arguments, self.oracle.is_actively_debugging())
        {
            Ok(Some(text)) => Ok(text),
            Ok(None) => Ok(format!("{name} executed successfully.")),
            Err(e) => Err(format!("Error executing tool '{name}': {e}")),
        }
    }

    fn handle_prompts_list(&self) -> Result<Value> {
        let result = ListPromptsResult {
            prompts: self.prompts.list(),
        };
        Ok(serde_json::to_value(result)?)
    }

    fn handle_prompts_get(&self, params: Option<Value>) -> Result<Value> {
        let params = params.and_then(|v| v.as_object().cloned()).ok_or_else(|| {
            Error::InvalidParams("Invalid or missing 'params' object for prompts/get".to_string())
        })?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                Error::InvalidParams("Invalid or missing 'name' in prompts/get params".to_string())
            })?;

        let empty = Map::new();
        let arguments = params
            .get("arguments")
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let result = self.prompts.render(name, arguments)?;
        Ok(serde_json::to_value(result)?)
    }

    fn handle_resources_list(&self) -> Result<Value> {
        let result = ListResourcesResult {
            resources: self.resources.list(),
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn send_result(&self, session_id: &str, id: Value, result: Value) {
        match serde_json::to_string(&JsonRpcResponse::new(id, result)) {
            Ok(frame) => self.sessions.send(session_id, frame).await,
            Err(e) => error!("Failed to serialize result frame: {e}"),
        }
    }

    async fn send_error(&self, session_id: &str, id: Value, code: i32, message: impl Into<String>) {
        match serde_json::to_string(&JsonRpcErrorResponse::new(id, code, message)) {
            Ok(frame) => self.sessions.send(session_id, frame).await,
            Err(e) => error!("Failed to serialize error frame: {e}"),
        }
    }
}
