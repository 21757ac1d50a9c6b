//! HTTP/SSE transport listener.
//!
//! Carries the two-channel protocol contract: requests arrive as
//! `POST /message?sessionId=…` and are acknowledged synchronously with
//! `202 Accepted`, while results flow back asynchronously as SSE frames on
//! the `GET /sse` stream that created the session. Callers correlate frames
//! to their own requests purely via the JSON-RPC `id`.

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, Method, StatusCode, Uri},
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::command::{CommandRegistry, DebugOracle};
use crate::config::Config;
use crate::error::Result;
use crate::mcp::processor::RpcProcessor;
use crate::mcp::prompts::PromptCatalog;
use crate::mcp::resources::ResourceCatalog;
use crate::session::SessionRegistry;

/// Shared per-instance state handed to every route handler.
#[derive(Clone)]
struct AppState {
    sessions: Arc<SessionRegistry>,
    commands: Arc<CommandRegistry>,
    oracle: Arc<dyn DebugOracle>,
    processor: Arc<RpcProcessor>,
}

/// The MCP server: listener lifecycle plus the shared registries.
pub struct McpServer {
    config: Config,
    state: AppState,
    running: Option<RunningServer>,
}

struct RunningServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl McpServer {
    pub fn new(config: Config, commands: CommandRegistry, oracle: Arc<dyn DebugOracle>) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let commands = Arc::new(commands);
        let processor = Arc::new(RpcProcessor::new(
            sessions.clone(),
            commands.clone(),
            oracle.clone(),
        ));

        Self {
            config,
            state: AppState {
                sessions,
                commands,
                oracle,
                processor,
            },
            running: None,
        }
    }

    /// Replace the built-in prompt/resource catalogs. Takes effect on the
    /// next `start()`.
    pub fn with_catalogs(mut self, prompts: PromptCatalog, resources: ResourceCatalog) -> Self {
        self.state.processor = Arc::new(
            RpcProcessor::new(
                self.state.sessions.clone(),
                self.state.commands.clone(),
                self.state.oracle.clone(),
            )
            .with_catalogs(prompts, resources),
        );
        self
    }

    /// Bind the listener and start serving. Idempotent: a second call on a
    /// running server is a logged no-op.
    pub async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            info!("MCP server is already running.");
            return Ok(running.addr);
        }

        let listener = TcpListener::bind((self.config.bind, self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = router(self.state.clone());

        // axum serves each accepted connection on its own task; a stalled
        // client never blocks admission of new ones.
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!("MCP HTTP server error: {e}");
            }
        });

        info!("MCP server listening on {addr}");
        self.running = Some(RunningServer { addr, handle });
        Ok(addr)
    }

    /// Stop accepting connections. Idempotent: stopping a stopped server is a
    /// logged no-op. Sessions on already-established streams are reclaimed
    /// lazily, on their next failed write.
    pub fn stop(&mut self) {
        match self.running.take() {
            Some(running) => {
                running.handle.abort();
                info!("MCP server stopped.");
            }
            None => {
                info!("MCP server is already stopped.");
            }
        }
    }

    /// The bound address while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.addr)
    }
}

impl Drop for McpServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.handle.abort();
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse_handshake))
        .route("/sse/", get(sse_handshake))
        .route("/message", post(submit_message))
        .route("/discover", get(legacy_discover))
        .route("/mcp/", get(legacy_discover))
        .fallback(fallback)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Unknown paths are 404; verbs other than GET/POST get 405 with `Allow`.
async fn fallback(method: Method, uri: Uri) -> Response {
    if method == Method::GET || method == Method::POST {
        warn!("{method} request to unknown path: {uri}");
        StatusCode::NOT_FOUND.into_response()
    } else {
        warn!("Unsupported HTTP method: {method}");
        (
            StatusCode::METHOD_NOT_ALLOWED,
            [(header::ALLOW, "GET, POST")],
        )
            .into_response()
    }
}

/// `GET /sse`: open a session and stream the handshake frame.
///
/// Exactly one `event: endpoint` frame announcing the message URL precedes
/// the response frames; the connection then stays open for the session's
/// lifetime. An abandoned stream is reclaimed lazily, on the next failed
/// write to it.
async fn sse_handshake(State(state): State<AppState>) -> Response {
    let session_id = SessionRegistry::generate_id();
    let (tx, rx) = mpsc::unbounded_channel();

    if !state.sessions.register(&session_id, tx).await {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/message?sessionId={session_id}"));

    let frames = stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(
        UnboundedReceiverStream::new(rx).map(|frame| Ok(Event::default().data(frame))),
    );

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(frames),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// `POST /message?sessionId=…`: acknowledge synchronously, process
/// asynchronously.
///
/// The 202 is the control-plane acknowledgment only; the data-plane result
/// arrives on the session's SSE stream regardless of this response.
async fn submit_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let session_id = match query.session_id {
        Some(id) if state.sessions.is_valid(&id).await => id,
        other => {
            warn!("Bad request for /message: invalid or missing sessionId {other:?}");
            return (StatusCode::BAD_REQUEST, "Invalid or missing sessionId.").into_response();
        }
    };

    let processor = state.processor.clone();
    tokio::spawn(async move {
        processor.process(&session_id, &body).await;
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}

/// `GET /discover` / `GET /mcp/`: legacy synchronous tool listing, bypassing
/// the JSON-RPC method table.
async fn legacy_discover(State(state): State<AppState>) -> Json<Value> {
    let tools = state.commands.list_legacy(
        state.oracle.is_debugger_attached(),
        state.oracle.is_actively_debugging(),
    );

    Json(json!({
        "jsonrpc": "2.0",
        "id": null,
        "result": tools,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::HostDebugState;
    use std::net::{IpAddr, Ipv4Addr};

    fn test_server() -> McpServer {
        let config = Config {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            debug: false,
        };
        let commands = CommandRegistry::new(vec![]).unwrap();
        let oracle = Arc::new(HostDebugState::default());
        McpServer::new(config, commands, oracle)
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let mut server = test_server();

        let addr = server.start().await.unwrap();
        assert_eq!(server.local_addr(), Some(addr));

        // Second start is a no-op returning the same address.
        let again = server.start().await.unwrap();
        assert_eq!(again, addr);

        server.stop();
        assert_eq!(server.local_addr(), None);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut server = test_server();
        server.stop();
        server.stop();

        server.start().await.unwrap();
        server.stop();
        server.stop();
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let mut server = test_server();
        let first = server.start().await.unwrap();
        server.stop();

        // Port 0 means the rebind may land elsewhere; it only has to succeed.
        let second = server.start().await.unwrap();
        assert_eq!(first.ip(), second.ip());
        server.stop();
    }
}
