//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use treebridge_runtime::{
    external, BridgeConfig, CommandRegistry, ExternalNode, InMemoryCommandRegistry,
    NoopConsumerProxy, TreeBridge, TreeNodeProvider,
};

/// The `{label:"root"}` tree with children `a` and `b`
pub fn files_tree() -> Value {
    json!({
        "label": "root",
        "children": [
            { "label": "a", "hasChildren": false },
            { "label": "b", "hasChildren": false }
        ]
    })
}

pub fn bridge() -> TreeBridge {
    TreeBridge::new(
        &BridgeConfig::default(),
        Arc::new(InMemoryCommandRegistry::new()),
        Arc::new(NoopConsumerProxy),
    )
}

pub fn bridge_with_commands(commands: Arc<dyn CommandRegistry>) -> TreeBridge {
    TreeBridge::new(&BridgeConfig::default(), commands, Arc::new(NoopConsumerProxy))
}

/// Provider over a JSON tree whose behavior tests can script.
///
/// Nodes are plain `serde_json::Value`s; children live under `children`.
pub struct ScriptedProvider {
    tree: Value,
    gate: Option<Arc<Notify>>,
    fail_root: AtomicBool,
    fail_children: AtomicBool,
    panic_root: AtomicBool,
    root_calls: AtomicUsize,
    children_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(tree: Value) -> Arc<Self> {
        Arc::new(Self::build(tree, None))
    }

    /// Provider whose calls wait for a permit on `gate` before answering
    pub fn gated(tree: Value, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self::build(tree, Some(gate)))
    }

    fn build(tree: Value, gate: Option<Arc<Notify>>) -> Self {
        Self {
            tree,
            gate,
            fail_root: AtomicBool::new(false),
            fail_children: AtomicBool::new(false),
            panic_root: AtomicBool::new(false),
            root_calls: AtomicUsize::new(0),
            children_calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_root(&self, fail: bool) {
        self.fail_root.store(fail, Ordering::SeqCst);
    }

    pub fn fail_children(&self, fail: bool) {
        self.fail_children.store(fail, Ordering::SeqCst);
    }

    pub fn panic_on_root(&self) {
        self.panic_root.store(true, Ordering::SeqCst);
    }

    pub fn root_calls(&self) -> usize {
        self.root_calls.load(Ordering::SeqCst)
    }

    pub fn children_calls(&self) -> usize {
        self.children_calls.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl TreeNodeProvider for ScriptedProvider {
    async fn provide_root_node(&self) -> anyhow::Result<ExternalNode> {
        self.root_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;

        if self.panic_root.load(Ordering::SeqCst) {
            panic!("root exploded");
        }
        if self.fail_root.load(Ordering::SeqCst) {
            anyhow::bail!("backing store offline");
        }
        Ok(external(self.tree.clone()))
    }

    async fn resolve_children(&self, node: &ExternalNode) -> anyhow::Result<Vec<ExternalNode>> {
        self.children_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;

        if self.fail_children.load(Ordering::SeqCst) {
            anyhow::bail!("listing denied");
        }
        let node = node
            .downcast_ref::<Value>()
            .ok_or_else(|| anyhow::anyhow!("foreign node"))?;
        Ok(node
            .get("children")
            .and_then(Value::as_array)
            .map(|children| children.iter().cloned().map(external).collect())
            .unwrap_or_default())
    }
}

/// One command registry call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: String,
    pub arguments: Vec<Value>,
    pub node: Value,
}

/// Command registry that records every call and fails the commands it is told to
#[derive(Default)]
pub struct RecordingCommands {
    invocations: Mutex<Vec<Invocation>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingCommands {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self, command: &str) {
        self.failing.lock().unwrap().insert(command.to_string());
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandRegistry for RecordingCommands {
    async fn execute_command(
        &self,
        command: &str,
        arguments: &[Value],
        node: ExternalNode,
    ) -> anyhow::Result<Value> {
        self.invocations.lock().unwrap().push(Invocation {
            command: command.to_string(),
            arguments: arguments.to_vec(),
            node: node.as_argument(),
        });

        if self.failing.lock().unwrap().contains(command) {
            anyhow::bail!("command {command} refused");
        }
        Ok(Value::Null)
    }
}

/// Let spawned tasks run until `ready` holds
pub async fn wait_until(ready: impl Fn() -> bool) {
    while !ready() {
        tokio::task::yield_now().await;
    }
}
