//! Command registry collaborator
//!
//! The bridge never runs commands itself; it hands the command name, its
//! bound arguments and the activated node to a [`CommandRegistry`].

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use treebridge_types::ExternalNode;

/// Executes named commands
#[async_trait]
pub trait CommandRegistry: Send + Sync {
    async fn execute_command(
        &self,
        command: &str,
        arguments: &[Value],
        node: ExternalNode,
    ) -> anyhow::Result<Value>;
}

type CommandHandler = Arc<dyn Fn(&[Value], &ExternalNode) -> anyhow::Result<Value> + Send + Sync>;

/// Registry of synchronous handlers, suitable for tests and local tools
#[derive(Default)]
pub struct InMemoryCommandRegistry {
    handlers: DashMap<String, CommandHandler>,
}

impl InMemoryCommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same name
    pub fn register<F>(&self, command: impl Into<String>, handler: F)
    where
        F: Fn(&[Value], &ExternalNode) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.handlers.insert(command.into(), Arc::new(handler));
    }

    pub fn contains(&self, command: &str) -> bool {
        self.handlers.contains_key(command)
    }
}

#[async_trait]
impl CommandRegistry for InMemoryCommandRegistry {
    async fn execute_command(
        &self,
        command: &str,
        arguments: &[Value],
        node: ExternalNode,
    ) -> anyhow::Result<Value> {
        let handler = self
            .handlers
            .get(command)
            .map(|h| Arc::clone(h.value()))
            .ok_or_else(|| anyhow::anyhow!("command '{command}' not found"))?;
        handler(arguments, &node)
    }
}
