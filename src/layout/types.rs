use crate::model::{EdgeId, NodeId, NodeState};
use crate::reconcile::NodeClass;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCurve {
    pub start: (f32, f32),
    pub control: (f32, f32),
    pub end: (f32, f32),
}

impl EdgeCurve {
    pub fn point_at(&self, t: f32) -> (f32, f32) {
        let u = 1.0 - t;
        let a = u * u;
        let b = 2.0 * u * t;
        let c = t * t;
        (
            a * self.start.0 + b * self.control.0 + c * self.end.0,
            a * self.start.1 + b * self.control.1 + c * self.end.1,
        )
    }

    pub fn midpoint(&self) -> (f32, f32) {
        self.point_at(0.5)
    }
}

#[derive(Debug, Clone)]
pub struct NodeFrame {
    pub id: NodeId,
    pub title: String,
    pub state: NodeState,
    pub maturity: u8,
    pub class: NodeClass,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub pinned: bool,
}

#[derive(Debug, Clone)]
pub struct EdgeFrame {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
    pub relation: String,
    pub curve: EdgeCurve,
    pub label_anchor: (f32, f32),
    pub selected: bool,
}

/// Everything the render adapter needs for one animation frame.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub width: f32,
    pub height: f32,
    pub alpha: f32,
    pub nodes: Vec<NodeFrame>,
    pub edges: Vec<EdgeFrame>,
}

impl Frame {
    pub fn node(&self, id: &str) -> Option<&NodeFrame> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&EdgeFrame> {
        self.edges.iter().find(|edge| edge.id == id)
    }
}
