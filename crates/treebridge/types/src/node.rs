//! Node types
//!
//! Providers own their nodes outright. The bridge keeps them as
//! [`ExternalNode`] handles and only ever asks the handful of questions on
//! [`TreeNode`]; everything the consumer sees is an [`InternalNode`].

use crate::ids::{NodeId, ProviderId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Command bound to a node, run when the node is activated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickCommand {
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<Value>,
}

impl ClickCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: Value) -> Self {
        self.arguments.push(argument);
        self
    }
}

/// What the bridge may ask of a provider's node.
///
/// Every method is optional; a node that answers nothing is rendered with an
/// empty label, is assumed to have children and carries no command.
pub trait TreeNode: AsAny + Send + Sync + fmt::Debug {
    fn label(&self) -> Option<String> {
        None
    }

    fn has_children(&self) -> Option<bool> {
        None
    }

    fn click_command(&self) -> Option<ClickCommand> {
        None
    }

    /// JSON form passed to the command registry when the node is activated.
    fn as_argument(&self) -> Value {
        Value::Null
    }
}

/// Upcast helper so providers can recover their own node type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn TreeNode {
    /// Recover the concrete node a provider handed out.
    pub fn downcast_ref<T: TreeNode>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Shared handle to a provider-owned node
pub type ExternalNode = Arc<dyn TreeNode>;

/// Wrap a provider value as an [`ExternalNode`].
pub fn external(node: impl TreeNode + 'static) -> ExternalNode {
    Arc::new(node)
}

/// JSON nodes answer through the `label`, `hasChildren` and `clickCommand`
/// fields. `clickCommand` may be a bare command name or a full
/// `{ "command": .., "arguments": [..] }` object.
impl TreeNode for Value {
    fn label(&self) -> Option<String> {
        match self {
            Value::Object(fields) => fields.get("label").and_then(json_label),
            scalar => json_label(scalar),
        }
    }

    fn has_children(&self) -> Option<bool> {
        self.get("hasChildren").and_then(Value::as_bool)
    }

    fn click_command(&self) -> Option<ClickCommand> {
        match self.get("clickCommand")? {
            Value::String(command) => Some(ClickCommand::new(command.as_str())),
            command @ Value::Object(_) => serde_json::from_value(command.clone()).ok(),
            _ => None,
        }
    }

    fn as_argument(&self) -> Value {
        self.clone()
    }
}

/// Label text of a JSON value: strings as they are, numbers and booleans in
/// their JSON form. Null, arrays and objects have no label.
pub fn json_label(value: &Value) -> Option<String> {
    match value {
        Value::String(label) => Some(label.clone()),
        Value::Number(_) | Value::Bool(_) => Some(value.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Bridge-issued wrapper for an external node.
///
/// Only `id` means anything to the bridge; the presentation fields are copied
/// once at wrap time for the consumer's benefit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalNode {
    pub id: NodeId,
    /// Owning provider, used for lookup only
    pub provider_id: ProviderId,
    pub label: String,
    pub has_children: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_command: Option<ClickCommand>,
}

impl InternalNode {
    pub fn has_click_command(&self) -> bool {
        self.click_command.is_some()
    }
}
