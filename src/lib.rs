//! x64dbg MCP Server
//!
//! A Model Context Protocol (MCP) transport and dispatch layer that lets an
//! AI-agent client discover and invoke named x64dbg host commands, fetch
//! templated prompts, and list static resources over an HTTP + Server-Sent
//! Events transport carrying JSON-RPC 2.0 messages.
//!
//! # Architecture
//!
//! The protocol runs over two decoupled HTTP channels:
//!
//! 1. **`GET /sse`** opens a session: the server streams one handshake frame
//!    announcing a `/message?sessionId=…` URL, then keeps the connection
//!    open for the session's lifetime.
//! 2. **`POST /message`** submits a JSON-RPC request, acknowledged
//!    immediately with `202 Accepted`; the result arrives later as an SSE
//!    frame on the originating stream, correlated by the request `id`.
//!
//! Layers, leaves first:
//!
//! - **`session`** - open SSE streams keyed by opaque random ids
//! - **`command`** - the host-supplied command table: gated tool listing,
//!   JSON-schema derivation, argument coercion, dispatch
//! - **`mcp`** - JSON-RPC envelope handling and the protocol method handlers
//! - **`http`** - the axum listener, SSE handshake, and lifecycle
//!
//! The host hands the registry an explicit command table at startup and a
//! [`command::DebugOracle`] for visibility gating; everything else is owned
//! here. Registries are plain objects rather than globals, so independent
//! server instances can coexist (the tests rely on this).

pub mod command;
pub mod config;
pub mod error;
pub mod http;
pub mod mcp;
pub mod session;

pub use error::{Error, Result};

/// Server version reported by `initialize`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Server name reported by `initialize`.
pub const SERVER_NAME: &str = "x64dbg-mcp-server";
