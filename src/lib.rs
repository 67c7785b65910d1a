//! apibridge - OpenAPI operations as callable tools
//!
//! Imports an OpenAPI 3.x description, compiles each operation into a tool
//! descriptor plus an HTTP binding, and executes tool calls by shaping and
//! sending the matching request.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod openapi;
pub mod tools;
pub mod utils;

pub use agent::{AgentMetadata, ToolAgent, ToolAgentBuilder, ToolCapability};
pub use config::Settings;
pub use error::{ImportError, ToolError, TransportError};
pub use openapi::{build_registry, import_spec, ApiDocument, ApiSource, ImportOptions, SpecLocation};
pub use tools::http::{HttpTransport, ReqwestTransport};
pub use tools::registry::{DuplicatePolicy, ToolRegistry};
pub use tools::{ArgumentMap, ArgumentSchema, ArgumentType, Tool, ToolDescriptor};
