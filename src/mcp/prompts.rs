//! MCP prompt templates.
//!
//! A static catalog of prompts with named arguments and `{argName}`
//! placeholder substitution. Catalogs are read-only at runtime.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Placeholder reserved for the optional length hint.
const MAX_LENGTH_PLACEHOLDER: &str = "{maxLengthPlaceholder}";

/// A prompt argument definition.
#[derive(Debug, Clone, Serialize)]
pub struct PromptArgument {
    pub name: String,
    pub description: String,
    pub required: bool,
}

/// One message template: a role plus text containing `{argName}` placeholders.
#[derive(Debug, Clone)]
pub struct MessageTemplate {
    pub role: String,
    pub text: String,
}

/// A prompt definition. Templates are substitution inputs, not part of the
/// listed catalog entry.
#[derive(Debug, Clone, Serialize)]
pub struct Prompt {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
    #[serde(skip)]
    pub templates: Vec<MessageTemplate>,
}

/// A fully substituted prompt message.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: PromptContent,
}

/// Prompt message content.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    Text { text: String },
}

/// Result of `prompts/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
}

/// Result of `prompts/get`.
#[derive(Debug, Clone, Serialize)]
pub struct GetPromptResult {
    pub description: String,
    pub messages: Vec<PromptMessage>,
}

/// The static prompt catalog.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    prompts: Vec<Prompt>,
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptCatalog {
    /// Catalog with the built-in prompts.
    pub fn new() -> Self {
        Self {
            prompts: vec![
                Prompt {
                    name: "X64DbgPrompt".to_string(),
                    description:
                        "Prompt used as a default to ask the AI to use the x64dbg functionality"
                            .to_string(),
                    arguments: vec![],
                    templates: vec![MessageTemplate {
                        role: "user".to_string(),
                        text: "You are an AI assistant with access to an MCP (Model Context \
                               Protocol) server. Your goal is to complete tasks by calling the \
                               available commands on this server."
                            .to_string(),
                    }],
                },
                Prompt {
                    name: "SummarizeFunction".to_string(),
                    description: "Ask the AI to summarize the function at an address using the \
                                  available debugger commands"
                        .to_string(),
                    arguments: vec![
                        PromptArgument {
                            name: "address".to_string(),
                            description: "Address of the function to summarize".to_string(),
                            required: true,
                        },
                        PromptArgument {
                            name: "focus".to_string(),
                            description: "Optional aspect to focus on (e.g. calls, strings)"
                                .to_string(),
                            required: false,
                        },
                        PromptArgument {
                            name: "maxLength".to_string(),
                            description: "Optional maximum response length".to_string(),
                            required: false,
                        },
                    ],
                    templates: vec![MessageTemplate {
                        role: "user".to_string(),
                        text: "Disassemble and summarize the function at {address}. {focus}\
                               {maxLengthPlaceholder}"
                            .to_string(),
                    }],
                },
            ],
        }
    }

    /// Catalog from an explicit prompt list.
    pub fn with_prompts(prompts: Vec<Prompt>) -> Self {
        Self { prompts }
    }

    /// The catalog entries, for `prompts/list`.
    pub fn list(&self) -> Vec<Prompt> {
        self.prompts.clone()
    }

    fn find(&self, name: &str) -> Option<&Prompt> {
        self.prompts
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Substitute arguments into a prompt's templates.
    ///
    /// Required arguments are verified first, failing fast on the first
    /// missing one. Defined-but-absent optional arguments substitute as empty
    /// strings; placeholders with no matching definition stay verbatim. The
    /// reserved length placeholder becomes ` (max length: N)` only when a
    /// `maxLength` argument was supplied.
    pub fn render(&self, name: &str, arguments: &Map<String, Value>) -> Result<GetPromptResult> {
        let prompt = self
            .find(name)
            .ok_or_else(|| Error::MethodNotFound(format!("Prompt not found: {name}")))?;

        for arg in prompt.arguments.iter().filter(|a| a.required) {
            match arguments.get(&arg.name) {
                Some(value) if !value.is_null() => {}
                _ => {
                    return Err(Error::InvalidParams(format!(
                        "Missing required argument '{}' for prompt '{}'.",
                        arg.name, prompt.name
                    )))
                }
            }
        }

        let messages = prompt
            .templates
            .iter()
            .map(|template| {
                let mut text = template.text.clone();

                for arg in &prompt.arguments {
                    let placeholder = format!("{{{}}}", arg.name);
                    if text.contains(&placeholder) {
                        let substitution = arguments
                            .get(&arg.name)
                            .filter(|v| !v.is_null())
                            .map(stringify)
                            .unwrap_or_default();
                        text = text.replace(&placeholder, &substitution);
                    }
                }

                if text.contains(MAX_LENGTH_PLACEHOLDER) {
                    let hint = arguments
                        .get("maxLength")
                        .filter(|v| !v.is_null())
                        .map(|v| format!(" (max length: {})", stringify(v)))
                        .unwrap_or_default();
                    text = text.replace(MAX_LENGTH_PLACEHOLDER, &hint);
                }

                PromptMessage {
                    role: template.role.clone(),
                    content: PromptContent::Text { text },
                }
            })
            .collect();

        Ok(GetPromptResult {
            description: prompt.description.clone(),
            messages,
        })
    }
}

/// Plain stringification of a JSON argument value (no surrounding quotes).
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
