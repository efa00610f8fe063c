//! Request/response shapes of the server endpoints the canvas talks to. The
//! transport itself belongs to the host; these types only pin the JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::model::{ContainerId, Edge, Node, NodeId, NodeState, SourceKind};
use crate::scope::Message;

/// A remote call that did not produce a usable response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for RemoteError {
    fn from(err: serde_json::Error) -> Self {
        RemoteError::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerCreate {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCreate {
    pub container_id: ContainerId,
    #[serde(rename = "type")]
    pub kind: SourceKind,
    pub label: String,
    #[serde(default)]
    pub path_or_url: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCreate {
    pub container_id: ContainerId,
    pub title: String,
    pub node_type: String,
    #[serde(default)]
    pub state: NodeState,
}

/// Partial document update; `None` fields are left untouched server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mechanism: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary_conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assumptions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<NodeState>,
}

/// Node fetch/patch response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDetail {
    pub node: Node,
    #[serde(default)]
    pub can_activate: bool,
    #[serde(default)]
    pub missing_fields: Vec<String>,
    #[serde(default)]
    pub edge_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteNodeResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub deleted_ids: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeCreate {
    pub container_id: ContainerId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    pub relation_type: String,
    #[serde(default = "unit_weight")]
    pub weight: f32,
    #[serde(default)]
    pub condition: String,
}

fn unit_weight() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgePatch {
    pub relation_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExploreMode {
    #[default]
    Clarify,
    Expand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExploreRequest {
    pub node_id: NodeId,
    pub container_id: ContainerId,
    pub mode: ExploreMode,
    pub message: String,
    pub history: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedNode {
    pub title: String,
    pub node_type: String,
    pub relation_type: String,
    #[serde(default)]
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseBlock {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Vec<String>,
    #[serde(default, deserialize_with = "relation_targets")]
    pub relations: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Relations arrive either as `{rel: "Target"}` or `{rel: ["A", "B"]}`.
fn relation_targets<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, OneOrMany> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(relation, targets)| {
            let targets = match targets {
                OneOrMany::One(target) => vec![target],
                OneOrMany::Many(targets) => targets,
            };
            (relation, targets)
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExploreResponse {
    #[serde(default)]
    pub reply: String,
    #[serde(default)]
    pub suggested_nodes: Vec<SuggestedNode>,
    #[serde(default)]
    pub blocks: Vec<ResponseBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoDocumentResponse {
    #[serde(flatten)]
    pub detail: NodeDetail,
    #[serde(default)]
    pub suggested_nodes: Vec<SuggestedNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmSuggestedResponse {
    pub node: Node,
    pub edge: Edge,
}
