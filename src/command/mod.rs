//! Command registry and dispatcher.
//!
//! The host hands the registry an explicit table of command descriptors at
//! construction time: name, ordered typed parameters with
//! optionality/defaults, behavior flags, description, and the invocable
//! handler. The table never mutates afterward. The registry derives
//! JSON-schema tool metadata on demand, gates visibility by debug state, and
//! coerces loosely-typed JSON arguments onto the declared parameter types
//! before invoking.

pub mod coerce;

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mcp::protocol::{LegacyToolInfo, Tool};

pub use coerce::{coerce_value, CoerceError};

/// Behavior flags attached to a command.
///
/// `mcp_only` marks commands the host keeps out of its own debugger console;
/// it does not affect MCP-side visibility.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandFlags {
    pub debug_only: bool,
    pub x64dbg_only: bool,
    pub mcp_only: bool,
}

/// Declared type of a command parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    /// Closed set of variant names; arguments resolve case-insensitively to
    /// the canonical spelling.
    Enum(Vec<String>),
    Array(Box<ParamType>),
    /// Raw JSON passthrough.
    Object,
}

impl ParamType {
    /// JSON-schema primitive this type maps to.
    pub fn json_schema_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "number",
            Self::Boolean => "boolean",
            Self::Array(_) => "array",
            Self::Enum(_) | Self::Object => "object",
        }
    }

    /// Human-readable type name used by the legacy discovery listing and in
    /// coercion errors.
    pub fn type_name(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Integer => "integer".to_string(),
            Self::Float => "number".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Enum(_) => "enum".to_string(),
            Self::Array(elem) => format!("array<{}>", elem.type_name()),
            Self::Object => "object".to_string(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.type_name())
    }
}

/// A coerced runtime value handed to command handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<ParamValue>),
    Json(Value),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

/// A named, typed command parameter: required, or optional with a default.
#[derive(Debug, Clone)]
pub struct CommandParam {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<ParamValue>,
}

impl CommandParam {
    pub fn required(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, ty: ParamType, default: ParamValue) -> Self {
        Self {
            name: name.into(),
            ty,
            default: Some(default),
        }
    }
}

/// The invocable behind a command. Receives coerced values in declaration
/// order; `Ok(None)` means the command produced no output text.
pub type CommandFn = Arc<dyn Fn(&[ParamValue]) -> Result<Option<String>> + Send + Sync>;

/// A host command descriptor.
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub description: String,
    pub params: Vec<CommandParam>,
    pub flags: CommandFlags,
    handler: CommandFn,
}

impl Command {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&[ParamValue]) -> Result<Option<String>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            flags: CommandFlags::default(),
            handler: Arc::new(handler),
        }
    }

    pub fn param(mut self, param: CommandParam) -> Self {
        self.params.push(param);
        self
    }

    pub fn debug_only(mut self) -> Self {
        self.flags.debug_only = true;
        self
    }

    pub fn x64dbg_only(mut self) -> Self {
        self.flags.x64dbg_only = true;
        self
    }

    pub fn mcp_only(mut self) -> Self {
        self.flags.mcp_only = true;
        self
    }

    /// Tool description, with the original's fallback for blank descriptions.
    fn tool_description(&self) -> String {
        if self.description.is_empty() {
            format!("Executes the {} command.", self.name)
        } else {
            self.description.clone()
        }
    }

    fn schema_description(&self) -> String {
        if self.description.is_empty() {
            format!("Input schema for {}.", self.name)
        } else {
            self.description.clone()
        }
    }

    /// Derive the JSON-schema description of this command's input object.
    fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.params {
            let description = format!("Parameter '{}' for {}", param.name, self.name);
            let schema = match &param.ty {
                ParamType::Array(elem) => json!({
                    "type": "array",
                    "description": description,
                    "items": { "type": elem.json_schema_type() },
                }),
                ty => json!({
                    "type": ty.json_schema_type(),
                    "description": description,
                }),
            };
            properties.insert(param.name.clone(), schema);

            if param.default.is_none() {
                required.push(param.name.clone());
            }
        }

        json!({
            "title": self.name,
            "description": self.schema_description(),
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// Host debug state consulted for tool-visibility gating.
pub trait DebugOracle: Send + Sync {
    fn is_debugger_attached(&self) -> bool;
    fn is_actively_debugging(&self) -> bool;
}

/// Shared, settable debug state; the standalone binary and tests use this in
/// place of the plugin bridge.
#[derive(Default)]
pub struct HostDebugState {
    attached: AtomicBool,
    active: AtomicBool,
}

impl HostDebugState {
    pub fn new(attached: bool, active: bool) -> Self {
        Self {
            attached: AtomicBool::new(attached),
            active: AtomicBool::new(active),
        }
    }

    pub fn set_attached(&self, attached: bool) {
        self.attached.store(attached, Ordering::Relaxed);
    }

    pub fn set_actively_debugging(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }
}

impl DebugOracle for HostDebugState {
    fn is_debugger_attached(&self) -> bool {
        self.attached.load(Ordering::Relaxed)
    }

    fn is_actively_debugging(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

/// The command table: built once, immutable, names unique case-insensitively.
pub struct CommandRegistry {
    commands: HashMap<String, Command>,
    order: Vec<String>,
}

impl CommandRegistry {
    /// Build the registry from the host's command table. Duplicate names
    /// (case-insensitive) are a construction error.
    pub fn new(commands: Vec<Command>) -> Result<Self> {
        let mut map = HashMap::new();
        let mut order = Vec::new();

        for command in commands {
            let key = command.name.to_lowercase();
            if map.contains_key(&key) {
                return Err(Error::Config(format!(
                    "Duplicate command name '{}'",
                    command.name
                )));
            }
            order.push(key.clone());
            map.insert(key, command);
        }

        Ok(Self {
            commands: map,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Whether a command with this name exists, visible or not.
    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_lowercase())
    }

    fn visible(command: &Command, attached: bool, active: bool) -> bool {
        !command.flags.x64dbg_only && (!command.flags.debug_only || (attached && active))
    }

    fn iter_ordered(&self) -> impl Iterator<Item = &Command> {
        self.order.iter().map(|key| &self.commands[key])
    }

    /// Schema-described descriptors for every command visible under the given
    /// debug state.
    pub fn list_tools(&self, attached: bool, active: bool) -> Vec<Tool> {
        self.iter_ordered()
            .filter(|command| Self::visible(command, attached, active))
            .map(|command| Tool {
                name: command.name.clone(),
                description: command.tool_description(),
                input_schema: command.input_schema(),
            })
            .collect()
    }

    /// Bare name/parameter listing for the legacy `GET /discover` endpoint.
    pub fn list_legacy(&self, attached: bool, active: bool) -> Vec<LegacyToolInfo> {
        self.iter_ordered()
            .filter(|command| Self::visible(command, attached, active))
            .map(|command| LegacyToolInfo {
                name: command.name.clone(),
                parameters: command.params.iter().map(|p| p.ty.type_name()).collect(),
            })
            .collect()
    }

    /// Execute a command by (case-insensitive) name.
    ///
    /// An unknown name and a gated-out command fail with distinct errors.
    /// A JSON `null` argument counts as not supplied. Handler errors
    /// propagate with their original message.
    pub fn invoke(
        &self,
        name: &str,
        arguments: &Map<String, Value>,
        actively_debugging: bool,
    ) -> Result<Option<String>> {
        let command = self
            .commands
            .get(&name.to_lowercase())
            .ok_or_else(|| Error::ToolNotFound(name.to_string()))?;

        if command.flags.x64dbg_only || (command.flags.debug_only && !actively_debugging) {
            return Err(Error::ToolUnavailable(command.name.clone()));
        }

        let mut invoke_args = Vec::with_capacity(command.params.len());
        for param in &command.params {
            match arguments.get(&param.name).filter(|v| !v.is_null()) {
                Some(value) => {
                    let coerced = coerce_value(value, &param.ty, &param.name).map_err(|e| {
                        Error::InvalidParams(format!(
                            "Cannot convert argument '{}' for tool '{}'. Error: {}",
                            param.name, command.name, e
                        ))
                    })?;
                    invoke_args.push(coerced);
                }
                None => match &param.default {
                    Some(default) => invoke_args.push(default.clone()),
                    None => {
                        return Err(Error::InvalidParams(format!(
                            "Missing required argument: '{}' for tool '{}'",
                            param.name, command.name
                        )))
                    }
                },
            }
        }

        (command.handler)(&invoke_args)
    }
}
