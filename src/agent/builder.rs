//! Agent Builder - fluent assembly of a `ToolAgent`
//!
//! Information Hiding:
//! - Hides Arc wrapping of local tools
//! - Duplicate name detection deferred to `build`

use super::{AgentMetadata, ToolAgent};
use crate::error::ImportError;
use crate::tools::registry::ToolRegistry;
use crate::tools::Tool;
use indexmap::IndexMap;
use std::sync::Arc;

/// Builder for a `ToolAgent`
///
/// # Example
/// ```no_run
/// use apibridge::{ApiSource, ImportOptions, ToolAgent};
///
/// # async fn run() -> Result<(), apibridge::ImportError> {
/// let options = ImportOptions::default();
/// let payments = ApiSource::new("payments", "specs/payments.yaml").import(&options).await?;
///
/// let agent = ToolAgent::builder("payment_agent")
///     .description("Submits and tracks payments")
///     .intent("pay an invoice")
///     .registry(payments)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ToolAgentBuilder {
    metadata: AgentMetadata,
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolAgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_metadata(AgentMetadata {
            name: name.into(),
            ..AgentMetadata::default()
        })
    }

    pub fn from_metadata(metadata: AgentMetadata) -> Self {
        Self {
            metadata,
            tools: Vec::new(),
        }
    }

    /// Set the agent's description
    ///
    /// This is used by routers to understand what the agent can do.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.metadata.description = description.into();
        self
    }

    /// Add a request this agent can serve
    pub fn intent(mut self, intent: impl Into<String>) -> Self {
        self.metadata.intents.push(intent.into());
        self
    }

    /// Add every tool of an imported registry
    pub fn registry(mut self, registry: ToolRegistry) -> Self {
        self.tools.extend(registry.tools());
        self
    }

    /// Add a hand-written tool
    pub fn tool<T: Tool + 'static>(self, tool: T) -> Self {
        self.tool_arc(Arc::new(tool))
    }

    /// Add a pre-wrapped Arc<dyn Tool>
    pub fn tool_arc(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Get the number of tools added so far
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Build the agent, failing on the first duplicate tool name
    pub fn build(self) -> Result<ToolAgent, ImportError> {
        let mut tools: IndexMap<String, Arc<dyn Tool>> = IndexMap::new();
        for tool in self.tools {
            let name = tool.descriptor().name;
            if tools.contains_key(&name) {
                return Err(ImportError::DuplicateToolName { name });
            }
            tracing::info!("Registering tool: {}", name);
            tools.insert(name, tool);
        }

        if self.metadata.description.is_empty() {
            tracing::debug!("Agent '{}' has no description", self.metadata.name);
        }

        Ok(ToolAgent::new(self.metadata, tools))
    }
}
