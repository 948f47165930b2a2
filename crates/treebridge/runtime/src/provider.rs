//! Tree node providers
//!
//! A provider owns tree-shaped data and hands out opaque nodes. The bridge
//! only calls the two async operations; the presentation hooks let a provider
//! describe nodes whose own [`TreeNode`] impl says nothing.

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::{Map, Value};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use treebridge_types::{json_label, ClickCommand, ExternalNode, TreeNode};

/// Capability implemented by every registered provider
#[async_trait]
pub trait TreeNodeProvider: Send + Sync {
    /// Produce the root of the tree
    async fn provide_root_node(&self) -> anyhow::Result<ExternalNode>;

    /// Produce the children of a node this provider handed out earlier
    async fn resolve_children(&self, node: &ExternalNode) -> anyhow::Result<Vec<ExternalNode>>;

    fn label(&self, _node: &ExternalNode) -> Option<String> {
        None
    }

    fn has_children(&self, _node: &ExternalNode) -> Option<bool> {
        None
    }

    fn click_command(&self, _node: &ExternalNode) -> Option<ClickCommand> {
        None
    }
}

/// Await a provider or collaborator future, turning a panic into an error.
pub(crate) async fn settle<T, F>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(anyhow::anyhow!("panicked: {}", panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// Node of a [`JsonTreeProvider`]
#[derive(Debug, Clone)]
pub struct JsonNode {
    fields: Map<String, Value>,
    children: Vec<Value>,
}

impl JsonNode {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(object) => {
                let mut fields = object.clone();
                let children = match fields.remove("children") {
                    Some(Value::Array(children)) => children,
                    _ => Vec::new(),
                };
                Self { fields, children }
            }
            other => {
                let mut fields = Map::new();
                fields.insert("label".to_string(), other.clone());
                Self {
                    fields,
                    children: Vec::new(),
                }
            }
        }
    }

    pub fn children(&self) -> &[Value] {
        &self.children
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl TreeNode for JsonNode {
    fn label(&self) -> Option<String> {
        self.fields.get("label").and_then(json_label)
    }

    fn has_children(&self) -> Option<bool> {
        self.fields
            .get("hasChildren")
            .and_then(Value::as_bool)
            .or(Some(!self.children.is_empty()))
    }

    fn click_command(&self) -> Option<ClickCommand> {
        Value::Object(self.fields.clone()).click_command()
    }

    fn as_argument(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Provider serving a static JSON document.
///
/// Every object is a node; its children live under `children`. Strings and
/// other scalars are leaves labelled with their own value.
#[derive(Debug, Clone)]
pub struct JsonTreeProvider {
    root: Value,
}

impl JsonTreeProvider {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn parse(document: &str) -> anyhow::Result<Self> {
        Ok(Self::new(serde_json::from_str(document)?))
    }
}

#[async_trait]
impl TreeNodeProvider for JsonTreeProvider {
    async fn provide_root_node(&self) -> anyhow::Result<ExternalNode> {
        Ok(treebridge_types::external(JsonNode::from_value(&self.root)))
    }

    async fn resolve_children(&self, node: &ExternalNode) -> anyhow::Result<Vec<ExternalNode>> {
        let node = node
            .downcast_ref::<JsonNode>()
            .ok_or_else(|| anyhow::anyhow!("node was not produced by this provider"))?;
        Ok(node
            .children
            .iter()
            .map(|child| treebridge_types::external(JsonNode::from_value(child)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn json_provider_walks_children_in_order() {
        let provider = JsonTreeProvider::new(json!({
            "label": "root",
            "children": [{ "label": "a" }, "b"]
        }));

        let root = provider.provide_root_node().await.unwrap();
        assert_eq!(root.label().as_deref(), Some("root"));
        assert_eq!(root.has_children(), Some(true));
        assert!(root.as_argument().get("children").is_none());

        let children = provider.resolve_children(&root).await.unwrap();
        let labels: Vec<_> = children.iter().filter_map(|c| c.label()).collect();
        assert_eq!(labels, vec!["a", "b"]);
        assert_eq!(children[0].has_children(), Some(false));
    }

    #[test]
    fn json_node_and_plain_value_agree_on_labels() {
        let cases = [
            json!({ "label": "src" }),
            json!({ "label": 5 }),
            json!({ "label": false }),
            json!({ "label": null }),
            json!({ "label": ["x"] }),
            json!({}),
            json!("leaf"),
            json!(42),
            json!(null),
        ];
        for value in cases {
            assert_eq!(
                JsonNode::from_value(&value).label(),
                value.label(),
                "labels differ for {value}"
            );
        }
    }

    #[tokio::test]
    async fn json_provider_rejects_foreign_nodes() {
        let provider = JsonTreeProvider::new(json!({ "label": "root" }));
        let foreign = treebridge_types::external(json!({ "label": "elsewhere" }));
        assert!(provider.resolve_children(&foreign).await.is_err());
    }

    #[tokio::test]
    async fn settle_turns_panics_into_errors() {
        let result: anyhow::Result<()> = settle(async {
            if true {
                panic!("provider exploded");
            }
            Ok(())
        })
        .await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("provider exploded"));
    }

    #[tokio::test]
    async fn settle_passes_through_results() {
        let value = settle(async { Ok::<_, anyhow::Error>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }
}
