use serde::{Deserialize, Serialize};

pub type NodeId = String;
pub type EdgeId = String;
pub type ContainerId = String;

pub const MAX_MATURITY: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    #[default]
    Explore,
    Build,
    Active,
    Stale,
    Conflicted,
    Archived,
}

impl NodeState {
    pub const ALL: [NodeState; 6] = [
        NodeState::Explore,
        NodeState::Build,
        NodeState::Active,
        NodeState::Stale,
        NodeState::Conflicted,
        NodeState::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeState::Explore => "EXPLORE",
            NodeState::Build => "BUILD",
            NodeState::Active => "ACTIVE",
            NodeState::Stale => "STALE",
            NodeState::Conflicted => "CONFLICTED",
            NodeState::Archived => "ARCHIVED",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(token.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "node_id")]
    pub id: NodeId,
    #[serde(default)]
    pub container_id: ContainerId,
    pub title: String,
    #[serde(default = "default_node_type")]
    pub node_type: String,
    #[serde(default)]
    pub state: NodeState,
    #[serde(default)]
    pub maturity_score: u8,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub mechanism: String,
    #[serde(default)]
    pub boundary_conditions: String,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_source_type")]
    pub source_type: String,
    #[serde(default = "default_version")]
    pub version: u32,
    /// Layout hint; only honoured on the very first placement of the node.
    #[serde(default, skip_serializing)]
    pub x: Option<f32>,
    #[serde(default, skip_serializing)]
    pub y: Option<f32>,
}

fn default_node_type() -> String {
    "ONTOLOGY".to_string()
}

fn default_source_type() -> String {
    "ASSERTED".to_string()
}

fn default_version() -> u32 {
    1
}

impl Node {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            container_id: String::new(),
            title: title.to_string(),
            node_type: default_node_type(),
            state: NodeState::Explore,
            maturity_score: 0,
            definition: String::new(),
            mechanism: String::new(),
            boundary_conditions: String::new(),
            assumptions: Vec::new(),
            tags: Vec::new(),
            source_type: default_source_type(),
            version: default_version(),
            x: None,
            y: None,
        }
    }

    pub fn maturity(&self) -> u8 {
        self.maturity_score.min(MAX_MATURITY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "edge_id")]
    pub id: EdgeId,
    #[serde(default)]
    pub container_id: ContainerId,
    #[serde(rename = "source_node_id")]
    pub source: NodeId,
    #[serde(rename = "target_node_id")]
    pub target: NodeId,
    #[serde(default = "default_relation_type")]
    pub relation_type: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
    #[serde(default)]
    pub condition: String,
}

fn default_relation_type() -> String {
    "PART_OF".to_string()
}

fn default_weight() -> f32 {
    1.0
}

impl Edge {
    pub fn new(id: &str, source: &str, target: &str, relation_type: &str) -> Self {
        Self {
            id: id.to_string(),
            container_id: String::new(),
            source: source.to_string(),
            target: target.to_string(),
            relation_type: relation_type.to_string(),
            weight: default_weight(),
            condition: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub container_id: ContainerId,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceKind {
    Pdf,
    Url,
    #[default]
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub source_id: String,
    pub container_id: ContainerId,
    #[serde(rename = "type", default)]
    pub kind: SourceKind,
    pub label: String,
    #[serde(default)]
    pub path_or_url: String,
    #[serde(default)]
    pub notes: String,
}

/// Raw `{nodes, edges}` payload as returned by the graph endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl Snapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}
