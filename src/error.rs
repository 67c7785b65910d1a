//! Error taxonomy
//!
//! Import-time failures abort the whole registry build. Call-time failures
//! are returned to the caller and never retried here.

use thiserror::Error;

/// Failures raised while loading a document and compiling its operations.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to parse API description '{source_name}': {message}")]
    SpecParse {
        source_name: String,
        message: String,
    },

    #[error("{method} {path}: method not supported by the tool executor")]
    UnsupportedOperation { method: String, path: String },

    #[error("OperationId for {method} {path} is not defined")]
    MissingOperationId { method: String, path: String },

    #[error("Duplicate tool name '{name}'")]
    DuplicateToolName { name: String },

    #[error("No server URL supplied and the description declares no servers")]
    MissingServerUrl,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ImportError {
    pub(crate) fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SpecParse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Failures raised while executing a tool call.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Missing value for argument '{name}'")]
    MissingArgument { name: String },

    #[error("Failed to serialize request body: {0}")]
    BodySerialization(#[from] serde_json::Error),

    #[error("Path '{path}' still contains placeholder '{placeholder}' after substitution")]
    UnresolvedPlaceholder { path: String, placeholder: String },

    #[error("{}", http_call_message(.status, .message))]
    HttpCall {
        status: Option<u16>,
        message: String,
    },

    #[error("No tool executor found for tool name: {name}")]
    UnknownTool { name: String },
}

fn http_call_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!(
            "Http request failed. Server returned code [{}] with error: {}",
            code, message
        ),
        None => format!("Http request failed with generic error: {}", message),
    }
}

impl ToolError {
    /// Status code for HTTP-level failures, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ToolError::HttpCall { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the reasoning loop can fix this by calling again with other arguments
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ToolError::MissingArgument { .. }
                | ToolError::BodySerialization(_)
                | ToolError::HttpCall { .. }
        )
    }
}

/// Failures reported by an [`HttpTransport`](crate::tools::http::HttpTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Request(String),
}

impl From<TransportError> for ToolError {
    fn from(error: TransportError) -> Self {
        ToolError::HttpCall {
            status: None,
            message: error.to_string(),
        }
    }
}
