//! Tool Registry
//!
//! Information Hiding:
//! - Name-indexed storage of descriptor/binding pairs hidden
//! - Registration happens once, inside the importer; the public surface is read-only
//! - Duplicate handling policy applied at insertion

use super::binding::OperationBinding;
use super::executor::RequestExecutor;
use super::{describe_tools, ArgumentMap, Tool, ToolDescriptor};
use crate::error::{ImportError, ToolError};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do when two operations compile to the same tool name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Abort the import
    #[default]
    Fail,
    /// Keep the last operation seen
    Overwrite,
}

/// One imported operation: descriptor and binding, executed through a shared executor
#[derive(Debug)]
pub struct OperationTool {
    descriptor: ToolDescriptor,
    binding: OperationBinding,
    executor: RequestExecutor,
}

impl OperationTool {
    pub fn new(
        descriptor: ToolDescriptor,
        binding: OperationBinding,
        executor: RequestExecutor,
    ) -> Self {
        Self {
            descriptor,
            binding,
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn binding(&self) -> &OperationBinding {
        &self.binding
    }
}

#[async_trait]
impl Tool for OperationTool {
    fn descriptor(&self) -> ToolDescriptor {
        self.descriptor.clone()
    }

    async fn execute(&self, args: ArgumentMap) -> Result<String, ToolError> {
        self.executor.execute(&self.binding, args).await
    }
}

/// Immutable registry produced by one import of one API description
///
/// Every descriptor is stored next to its binding, so a name can never
/// resolve to one without the other.
#[derive(Debug)]
pub struct ToolRegistry {
    namespace: String,
    server_url: String,
    operations: IndexMap<String, Arc<OperationTool>>,
}

impl ToolRegistry {
    pub(crate) fn new(namespace: impl Into<String>, server_url: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            server_url: server_url.into(),
            operations: IndexMap::new(),
        }
    }

    /// Register a compiled operation
    pub(crate) fn insert(
        &mut self,
        tool: OperationTool,
        policy: DuplicatePolicy,
    ) -> Result<(), ImportError> {
        let name = tool.name().to_string();
        if self.operations.contains_key(&name) {
            match policy {
                DuplicatePolicy::Fail => return Err(ImportError::DuplicateToolName { name }),
                DuplicatePolicy::Overwrite => {
                    tracing::warn!("Tool '{}' defined twice, keeping the last definition", name);
                }
            }
        }

        tracing::info!("Registering tool: {}", name);
        self.operations.insert(name, Arc::new(tool));
        Ok(())
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Get an operation by tool name
    pub fn get(&self, name: &str) -> Option<Arc<OperationTool>> {
        self.operations.get(name).cloned()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    pub fn binding(&self, name: &str) -> Option<&OperationBinding> {
        self.operations.get(name).map(|op| op.binding())
    }

    /// Get all tool names, in document order
    pub fn tool_names(&self) -> Vec<String> {
        self.operations.keys().cloned().collect()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.operations.values().map(|op| op.descriptor()).collect()
    }

    /// All operations as trait objects, ready to be merged into an agent
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.operations
            .values()
            .map(|op| Arc::clone(op) as Arc<dyn Tool>)
            .collect()
    }

    /// Get tool descriptors as formatted text for LLM prompts
    pub fn tools_description(&self) -> String {
        describe_tools(self.operations.values().map(|op| &op.descriptor))
    }

    /// Execute a tool of this registry by name
    pub async fn execute(&self, name: &str, args: ArgumentMap) -> Result<String, ToolError> {
        let operation = self.operations.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;
        operation.execute(args).await
    }
}
