use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::ExecutorError;

/// Named parameters handed to a tool.
pub type ToolParams = BTreeMap<String, Value>;

/// Failure reported by a tool implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ToolError(pub String);

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A domain function callable by name.
pub trait Tool: Send + Sync {
    fn call(&self, params: &ToolParams) -> Result<Value, ToolError>;
}

impl<F> Tool for F
where
    F: Fn(&ToolParams) -> Result<Value, ToolError> + Send + Sync,
{
    fn call(&self, params: &ToolParams) -> Result<Value, ToolError> {
        self(params)
    }
}

/// Name-to-tool table, built once and then shared read-only.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, name: impl Into<String>, tool: T) -> &mut Self {
        self.tools.insert(name.into(), Arc::new(tool));
        self
    }

    /// Register a closure; its signature is pinned so literals infer.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&ToolParams) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        self.register(name, f)
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn Tool>, ExecutorError> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| ExecutorError::NotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}
