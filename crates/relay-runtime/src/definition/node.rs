//! Node definition types.

use std::collections::HashMap;

use derive_more::{Debug, Display, From, Into};
use relay_core::config::{OverdueConfig, ValidationConfig};
use relay_core::recipient::Recipient;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::switch::ConditionGroup;

/// Identifier of a node within one workflow definition.
///
/// Definition IDs are editor-assigned strings ("node_1"), unique only
/// within their workflow.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Debug, Display, From, Into)]
#[debug("{_0}")]
#[display("{_0}")]
#[serde(transparent)]
pub struct NodeRef(String);

impl NodeRef {
    /// Creates a node reference from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the reference as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeRef {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A workflow node definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Definition-scoped node ID.
    pub id: NodeRef,
    /// Display name of the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// The node kind with its type-specific data.
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Creates a new node.
    pub fn new(id: impl Into<NodeRef>, kind: impl Into<NodeKind>) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: kind.into(),
        }
    }

    /// Returns the wire name of this node's kind.
    pub fn kind_name(&self) -> &str {
        self.kind.kind_name()
    }
}

/// Start node data: the optional overdue policy for the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartData {
    /// Overdue escalation policy for runs of this workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overdue: Option<OverdueConfig>,
}

/// Send-message node data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageData {
    /// Who receives the message.
    pub recipient: Recipient,
    /// Message body.
    #[serde(default)]
    pub content: String,
}

/// Send-template node data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateData {
    /// Who receives the template.
    pub recipient: Recipient,
    /// Identifier of the pre-approved template.
    #[serde(default)]
    pub template_id: String,
    /// Substitution variables for template placeholders.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

/// Send-form node data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    /// Who receives the form.
    pub recipient: Recipient,
    /// Identifier of the form to send.
    #[serde(default)]
    pub form_id: String,
}

/// Database-query node data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    /// Query text, interpreted by the host dispatcher.
    #[serde(default)]
    pub query: String,
    /// Run variable that receives the query result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_variable: Option<String>,
}

/// External API-call node data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallData {
    /// Target URL.
    #[serde(default)]
    pub url: String,
    /// HTTP method.
    #[serde(default = "default_method")]
    pub method: String,
    /// Optional request payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

fn default_method() -> String {
    "GET".to_owned()
}

/// Wait-reply node data: the run's only suspension point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitReplyData {
    /// Run variable that receives the reply on resume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    /// Identifier of the party whose reply is awaited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiting_for: Option<String>,
    /// Retry/escalation policy while waiting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationConfig>,
}

/// Switch node data: branch selection via condition groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchData {
    /// Condition groups evaluated in declaration order.
    #[serde(default)]
    pub groups: Vec<ConditionGroup>,
    /// Path taken when no group matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
}

/// Node kind enum for workflow definitions.
///
/// Serialized adjacently tagged (`type` + `data`) to match the wire
/// format produced by the workflow editor. Deserialization is
/// permissive: an unrecognized or malformed node becomes
/// [`NodeKind::Unknown`] instead of failing the whole definition, and
/// the executor records such visits as unknown-step-type.
#[derive(Debug, Clone, PartialEq, From)]
pub enum NodeKind {
    /// Entry point of the graph.
    Start(StartData),
    /// Sends a free-form message.
    SendMessage(MessageData),
    /// Sends a pre-approved template.
    SendTemplate(TemplateData),
    /// Sends a form.
    SendForm(FormData),
    /// Runs a host-interpreted query.
    DbQuery(QueryData),
    /// Calls an external API.
    CallApi(ApiCallData),
    /// Suspends the run until an external reply arrives.
    WaitReply(WaitReplyData),
    /// Selects one outgoing path from condition groups.
    Switch(SwitchData),
    /// Terminal node; part of the run's join barrier.
    End,
    /// Unrecognized node type, retained verbatim.
    Unknown {
        /// The raw type string from the definition.
        type_name: String,
    },
}

impl Serialize for NodeKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind_name())?;
        match self {
            NodeKind::Start(data) => map.serialize_entry("data", data)?,
            NodeKind::SendMessage(data) => map.serialize_entry("data", data)?,
            NodeKind::SendTemplate(data) => map.serialize_entry("data", data)?,
            NodeKind::SendForm(data) => map.serialize_entry("data", data)?,
            NodeKind::DbQuery(data) => map.serialize_entry("data", data)?,
            NodeKind::CallApi(data) => map.serialize_entry("data", data)?,
            NodeKind::WaitReply(data) => map.serialize_entry("data", data)?,
            NodeKind::Switch(data) => map.serialize_entry("data", data)?,
            NodeKind::End | NodeKind::Unknown { .. } => {}
        }
        map.end()
    }
}

impl NodeKind {
    /// Returns the wire name of this kind.
    pub fn kind_name(&self) -> &str {
        match self {
            NodeKind::Start(_) => "start",
            NodeKind::SendMessage(_) => "sendMessage",
            NodeKind::SendTemplate(_) => "sendTemplate",
            NodeKind::SendForm(_) => "sendForm",
            NodeKind::DbQuery(_) => "dbQuery",
            NodeKind::CallApi(_) => "callApi",
            NodeKind::WaitReply(_) => "waitReply",
            NodeKind::Switch(_) => "switch",
            NodeKind::End => "end",
            NodeKind::Unknown { type_name } => type_name,
        }
    }

    /// Returns whether this is the start kind.
    pub const fn is_start(&self) -> bool {
        matches!(self, NodeKind::Start(_))
    }

    /// Returns whether this is the end kind.
    pub const fn is_end(&self) -> bool {
        matches!(self, NodeKind::End)
    }

    /// Returns whether this kind is recognized by the executor.
    pub const fn is_known(&self) -> bool {
        !matches!(self, NodeKind::Unknown { .. })
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        let type_name = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        // Absent or null data is treated as an empty object so that
        // kinds with all-optional fields still parse.
        let data = match value.get("data") {
            Some(Value::Null) | None => Value::Object(Default::default()),
            Some(data) => data.clone(),
        };

        let parsed = match type_name.as_str() {
            "start" => serde_json::from_value(data).map(NodeKind::Start),
            "sendMessage" => serde_json::from_value(data).map(NodeKind::SendMessage),
            "sendTemplate" => serde_json::from_value(data).map(NodeKind::SendTemplate),
            "sendForm" => serde_json::from_value(data).map(NodeKind::SendForm),
            "dbQuery" => serde_json::from_value(data).map(NodeKind::DbQuery),
            "callApi" => serde_json::from_value(data).map(NodeKind::CallApi),
            "waitReply" => serde_json::from_value(data).map(NodeKind::WaitReply),
            "switch" => serde_json::from_value(data).map(NodeKind::Switch),
            "end" => Ok(NodeKind::End),
            _ => Ok(NodeKind::Unknown { type_name: type_name.clone() }),
        };

        // A known type whose data fails to parse is an unknown step,
        // not a definition-wide failure.
        Ok(parsed.unwrap_or(NodeKind::Unknown { type_name }))
    }
}
