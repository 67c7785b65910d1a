//! Tool System - Named, schema-described actions exposed to a reasoning loop
//!
//! Information Hiding:
//! - Execution details hidden behind the `Tool` trait
//! - Argument schemas are closed sum types, rendered to JSON Schema on demand
//! - HTTP transport and request shaping hidden in `http` and `executor`

pub mod binding;
pub mod executor;
pub mod http;
pub mod macros;
pub mod registry;

use crate::error::ToolError;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Call-time arguments as produced by the reasoning loop
pub type ArgumentMap = serde_json::Map<String, Value>;

/// Reserved argument key carrying the JSON request body
pub const REQUEST_BODY_ARGUMENT: &str = "requestBody";

/// Type of a single tool argument
///
/// Serializes directly to the JSON Schema fragment the reasoning loop
/// consumes, e.g. `{"type": "string", "description": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArgumentType {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Integer {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Boolean {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Item types are never inspected
    Array {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    Object {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default)]
        properties: IndexMap<String, ArgumentType>,
        #[serde(default)]
        required: Vec<String>,
    },
}

impl ArgumentType {
    pub fn description(&self) -> Option<&str> {
        match self {
            ArgumentType::String { description }
            | ArgumentType::Integer { description }
            | ArgumentType::Number { description }
            | ArgumentType::Boolean { description }
            | ArgumentType::Array { description }
            | ArgumentType::Object { description, .. } => description.as_deref(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ArgumentType::String { .. } => "string",
            ArgumentType::Integer { .. } => "integer",
            ArgumentType::Number { .. } => "number",
            ArgumentType::Boolean { .. } => "boolean",
            ArgumentType::Array { .. } => "array",
            ArgumentType::Object { .. } => "object",
        }
    }

    pub(crate) fn with_description(mut self, text: Option<String>) -> Self {
        match &mut self {
            ArgumentType::String { description }
            | ArgumentType::Integer { description }
            | ArgumentType::Number { description }
            | ArgumentType::Boolean { description }
            | ArgumentType::Array { description }
            | ArgumentType::Object { description, .. } => *description = text,
        }
        self
    }
}

/// Argument schema of one tool: ordered properties plus the required names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSchema {
    pub properties: IndexMap<String, ArgumentType>,
    pub required: Vec<String>,
}

impl ArgumentSchema {
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Adds a required name once, keeping first-seen order
    pub(crate) fn require(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.is_required(&name) {
            self.required.push(name);
        }
    }

    /// JSON Schema object describing the whole argument map
    pub fn to_json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
        })
    }
}

/// Identity and calling contract for one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: ArgumentSchema,
}

impl ToolDescriptor {
    /// Function-calling declaration (`name`, `description`, `parameters`)
    pub fn to_function_declaration(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "parameters": self.parameters.to_json_schema(),
        })
    }
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.description)
    }
}

/// Tool trait - every callable action implements this
///
/// Information Hiding: imported operations and hand-written tools look the
/// same to the agent; how a call is carried out stays inside the implementation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and argument schema
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute the tool and return its raw text result
    async fn execute(&self, args: ArgumentMap) -> Result<String, ToolError>;
}

/// Render descriptors as a plain-text catalogue for prompts
pub fn describe_tools<'a>(descriptors: impl IntoIterator<Item = &'a ToolDescriptor>) -> String {
    let mut descriptions = Vec::new();
    for descriptor in descriptors {
        let params = descriptor
            .parameters
            .properties
            .iter()
            .map(|(name, arg)| {
                let required = if descriptor.parameters.is_required(name) {
                    "required"
                } else {
                    "optional"
                };
                format!(
                    "  - {} ({}): {} [{}]",
                    name,
                    arg.type_name(),
                    arg.description().unwrap_or(""),
                    required
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        descriptions.push(format!(
            "Tool: {}\nDescription: {}\nParameters:\n{}",
            descriptor.name, descriptor.description, params
        ));
    }
    descriptions.join("\n\n")
}
