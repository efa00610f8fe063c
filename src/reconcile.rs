//! Snapshot reconciliation: referential integrity and root/sub classification.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{Edge, EdgeId, Node, NodeId, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeClass {
    /// No valid edge targets the node.
    Root,
    /// Targeted by at least one valid edge.
    Sub,
}

impl NodeClass {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeClass::Root => "root",
            NodeClass::Sub => "sub",
        }
    }
}

/// Validated snapshot. Node order follows the server payload.
#[derive(Debug, Clone, Default)]
pub struct ReconciledGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub classes: HashMap<NodeId, NodeClass>,
    pub dropped_edges: usize,
    node_index: HashMap<NodeId, usize>,
    edge_index: HashMap<EdgeId, usize>,
}

impl ReconciledGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|idx| &self.nodes[*idx])
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edge_index.get(id).map(|idx| &self.edges[*idx])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn contains_edge(&self, id: &str) -> bool {
        self.edge_index.contains_key(id)
    }

    pub fn class_of(&self, id: &str) -> Option<NodeClass> {
        self.classes.get(id).copied()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Swaps in a fresher copy of an existing node. Topology is untouched, so
    /// classification stays valid. Payloads older than the held node lose.
    pub fn replace_node(&mut self, mut node: Node) -> bool {
        let Some(&idx) = self.node_index.get(&node.id) else {
            return false;
        };
        if node.version < self.nodes[idx].version {
            tracing::debug!(node = %node.id, incoming = node.version, held = self.nodes[idx].version, "ignoring outdated node payload");
            return false;
        }
        node.maturity_score = node.maturity();
        self.nodes[idx] = node;
        true
    }

    pub fn set_relation(&mut self, edge_id: &str, relation: &str) -> bool {
        let Some(&idx) = self.edge_index.get(edge_id) else {
            return false;
        };
        self.edges[idx].relation_type = relation.to_string();
        true
    }
}

pub fn reconcile(snapshot: &Snapshot) -> ReconciledGraph {
    reconcile_parts(&snapshot.nodes, &snapshot.edges)
}

pub fn reconcile_parts(raw_nodes: &[Node], raw_edges: &[Edge]) -> ReconciledGraph {
    // Last occurrence of a duplicated id wins, first occurrence keeps its slot.
    let mut nodes: Vec<Node> = Vec::with_capacity(raw_nodes.len());
    let mut node_index: HashMap<NodeId, usize> = HashMap::with_capacity(raw_nodes.len());
    for node in raw_nodes {
        let mut node = node.clone();
        node.maturity_score = node.maturity();
        match node_index.get(&node.id) {
            Some(idx) => nodes[*idx] = node,
            None => {
                node_index.insert(node.id.clone(), nodes.len());
                nodes.push(node);
            }
        }
    }

    let mut edges: Vec<Edge> = Vec::with_capacity(raw_edges.len());
    let mut edge_index: HashMap<EdgeId, usize> = HashMap::with_capacity(raw_edges.len());
    let mut dropped_edges = 0usize;
    for edge in raw_edges {
        if !node_index.contains_key(&edge.source) || !node_index.contains_key(&edge.target) {
            dropped_edges += 1;
            continue;
        }
        match edge_index.get(&edge.id) {
            Some(idx) => edges[*idx] = edge.clone(),
            None => {
                edge_index.insert(edge.id.clone(), edges.len());
                edges.push(edge.clone());
            }
        }
    }

    if dropped_edges > 0 {
        tracing::debug!(dropped_edges, "discarded edges with missing endpoints");
    }

    let classes = classify(&nodes, &edges);

    ReconciledGraph {
        nodes,
        edges,
        classes,
        dropped_edges,
        node_index,
        edge_index,
    }
}

/// Pure root/sub classification. Edges pointing at unknown nodes are ignored.
pub fn classify(nodes: &[Node], edges: &[Edge]) -> HashMap<NodeId, NodeClass> {
    let known: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    let targeted: HashSet<&str> = edges
        .iter()
        .filter(|edge| known.contains(edge.source.as_str()) && known.contains(edge.target.as_str()))
        .map(|edge| edge.target.as_str())
        .collect();
    nodes
        .iter()
        .map(|node| {
            let class = if targeted.contains(node.id.as_str()) {
                NodeClass::Sub
            } else {
                NodeClass::Root
            };
            (node.id.clone(), class)
        })
        .collect()
}

/// Classification counts, handy for logs and dumps.
pub fn class_histogram(graph: &ReconciledGraph) -> BTreeMap<&'static str, usize> {
    let mut counts = BTreeMap::new();
    for class in graph.classes.values() {
        *counts.entry(class.as_str()).or_insert(0) += 1;
    }
    counts
}
