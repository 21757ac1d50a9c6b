//! Model Context Protocol (MCP) implementation.
//!
//! JSON-RPC message handling and the protocol method handlers.
//!
//! # Architecture
//!
//! - `protocol` - JSON-RPC and MCP wire types
//! - `processor` - request parsing, dispatch, and the single error boundary
//! - `prompts` - static prompt catalog with template substitution
//! - `resources` - static resource catalog

pub mod processor;
pub mod prompts;
pub mod protocol;
pub mod resources;

pub use processor::RpcProcessor;
pub use prompts::PromptCatalog;
pub use protocol::*;
pub use resources::ResourceCatalog;
