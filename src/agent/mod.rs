//! Tool-Capable Agent
//!
//! Information Hiding:
//! - Merging of imported registries and hand-written tools hidden
//! - Name-based dispatch hidden behind `ToolCapability`
//! - Agent identity exposed as plain metadata for routers

mod builder;

pub use builder::ToolAgentBuilder;

use crate::error::{ImportError, ToolError};
use crate::openapi::{ApiSource, ImportOptions};
use crate::tools::registry::ToolRegistry;
use crate::tools::{describe_tools, ArgumentMap, Tool, ToolDescriptor};
use async_trait::async_trait;
use futures::future::try_join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity an agent advertises to whoever routes requests to it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub intents: Vec<String>,
}

/// Anything a reasoning loop can list tools from and call tools on
#[async_trait]
pub trait ToolCapability: Send + Sync {
    /// Descriptors of every tool, in registration order
    fn list_tools(&self) -> Vec<ToolDescriptor>;

    /// Run the named tool; unknown names fail without any HTTP call
    async fn execute_tool(&self, name: &str, args: ArgumentMap) -> Result<String, ToolError>;
}

#[async_trait]
impl ToolCapability for ToolRegistry {
    fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.descriptors()
    }

    async fn execute_tool(&self, name: &str, args: ArgumentMap) -> Result<String, ToolError> {
        self.execute(name, args).await
    }
}

/// Agent exposing the union of several registries plus local tools
pub struct ToolAgent {
    metadata: AgentMetadata,
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolAgent")
            .field("metadata", &self.metadata)
            .field("tools", &self.tools.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ToolAgent {
    pub fn builder(name: impl Into<String>) -> ToolAgentBuilder {
        ToolAgentBuilder::new(name)
    }

    /// Import every source concurrently and merge the resulting registries
    ///
    /// Fails if any import fails or two tools share a name.
    pub async fn from_sources(
        metadata: AgentMetadata,
        sources: &[ApiSource],
        options: &ImportOptions,
    ) -> Result<Self, ImportError> {
        let registries = try_join_all(sources.iter().map(|source| source.import(options))).await?;

        registries
            .into_iter()
            .fold(ToolAgentBuilder::from_metadata(metadata), |builder, registry| {
                builder.registry(registry)
            })
            .build()
    }

    pub(crate) fn new(metadata: AgentMetadata, tools: IndexMap<String, Arc<dyn Tool>>) -> Self {
        Self { metadata, tools }
    }

    pub fn metadata(&self) -> &AgentMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Get tool descriptors as formatted text for LLM prompts
    pub fn tools_description(&self) -> String {
        let descriptors = self.list_tools();
        describe_tools(&descriptors)
    }
}

#[async_trait]
impl ToolCapability for ToolAgent {
    fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools.values().map(|tool| tool.descriptor()).collect()
    }

    async fn execute_tool(&self, name: &str, args: ArgumentMap) -> Result<String, ToolError> {
        let tool = self.tools.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;

        tracing::info!("[{}] Executing tool: {}", self.metadata.name, name);
        let result = tool.execute(args).await;
        if let Err(e) = &result {
            tracing::warn!("[{}] Tool {} failed: {}", self.metadata.name, name, e);
        }
        result
    }
}
