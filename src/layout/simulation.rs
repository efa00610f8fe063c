//! Stepwise force simulation over node coordinates.
//!
//! The integration scheme follows d3-force: forces accumulate into
//! velocities scaled by `alpha`, velocities decay by `velocity_decay`, and
//! `alpha` eases toward `alpha_target` by `alpha_decay` every tick. Pinned
//! (dragged) nodes ignore forces and sit at their fixed coordinates.

use std::collections::HashMap;

use crate::config::{LayoutConfig, ViewportConfig};
use crate::model::NodeId;
use crate::reconcile::{NodeClass, ReconciledGraph};

use super::placement::Placement;

const JIGGLE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct SimNode {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub fx: Option<f32>,
    pub fy: Option<f32>,
    pub target: (f32, f32),
    pub pull: f32,
    pub radius: f32,
    pub class: NodeClass,
}

impl SimNode {
    pub fn is_pinned(&self) -> bool {
        self.fx.is_some() || self.fy.is_some()
    }
}

#[derive(Debug, Clone)]
struct SimLink {
    source: usize,
    target: usize,
    bias: f32,
}

#[derive(Debug, Clone)]
pub struct Simulation {
    id: u64,
    nodes: Vec<SimNode>,
    index: HashMap<NodeId, usize>,
    links: Vec<SimLink>,
    alpha: f32,
    alpha_target: f32,
    alpha_decay: f32,
    alpha_min: f32,
    config: LayoutConfig,
    viewport: ViewportConfig,
    running: bool,
    ticks: u64,
}

pub fn collision_radius(class: NodeClass, config: &LayoutConfig) -> f32 {
    match class {
        NodeClass::Root => config.root_radius,
        NodeClass::Sub => config.sub_radius,
    }
}

impl Simulation {
    pub fn new(
        id: u64,
        graph: &ReconciledGraph,
        placement: &Placement,
        config: &LayoutConfig,
        viewport: &ViewportConfig,
    ) -> Self {
        let mut nodes = Vec::with_capacity(placement.nodes.len());
        let mut index = HashMap::with_capacity(placement.nodes.len());
        for placed in &placement.nodes {
            let class = graph.class_of(&placed.id).unwrap_or(NodeClass::Root);
            let (x, y) = viewport.clamp(placed.x, placed.y);
            index.insert(placed.id.clone(), nodes.len());
            nodes.push(SimNode {
                id: placed.id.clone(),
                x,
                y,
                vx: 0.0,
                vy: 0.0,
                fx: None,
                fy: None,
                target: placed.target,
                pull: if placed.cached {
                    config.cached_pull
                } else {
                    config.fresh_pull
                },
                radius: collision_radius(class, config),
                class,
            });
        }

        let mut degree = vec![0usize; nodes.len()];
        let mut pairs = Vec::with_capacity(graph.edges.len());
        for edge in &graph.edges {
            let (Some(&source), Some(&target)) = (index.get(&edge.source), index.get(&edge.target))
            else {
                continue;
            };
            if source == target {
                continue;
            }
            degree[source] += 1;
            degree[target] += 1;
            pairs.push((source, target));
        }
        let links = pairs
            .into_iter()
            .map(|(source, target)| SimLink {
                source,
                target,
                bias: degree[source] as f32 / (degree[source] + degree[target]) as f32,
            })
            .collect();

        tracing::debug!(
            simulation = id,
            nodes = nodes.len(),
            alpha = placement.start.alpha,
            alpha_decay = placement.start.alpha_decay,
            "simulation started"
        );

        Self {
            id,
            nodes,
            index,
            links,
            alpha: placement.start.alpha,
            alpha_target: 0.0,
            alpha_decay: placement.start.alpha_decay,
            alpha_min: config.alpha_min,
            config: config.clone(),
            viewport: *viewport,
            running: true,
            ticks: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f32 {
        self.alpha_target
    }

    pub fn alpha_decay(&self) -> f32 {
        self.alpha_decay
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Cooled down and not held by a drag.
    pub fn is_settled(&self) -> bool {
        self.alpha < self.alpha_min && self.alpha_target < self.alpha_min
    }

    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&SimNode> {
        self.index.get(id).map(|idx| &self.nodes[*idx])
    }

    pub fn positions(&self) -> impl Iterator<Item = (&str, (f32, f32))> {
        self.nodes.iter().map(|node| (node.id.as_str(), (node.x, node.y)))
    }

    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!(simulation = self.id, ticks = self.ticks, "simulation stopped");
        }
        self.running = false;
    }

    /// Advances one frame. Returns false once stopped or settled.
    pub fn step(&mut self) -> bool {
        if !self.running || self.is_settled() {
            return false;
        }
        self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
        self.apply_charge();
        self.apply_links();
        self.apply_position_pull();
        self.apply_collisions();
        self.integrate();
        self.ticks += 1;
        true
    }

    fn apply_charge(&mut self) {
        let strength = self.config.charge_strength;
        let min2 = self.config.charge_distance_min.max(JIGGLE_EPSILON).powi(2);
        let alpha = self.alpha;
        let count = self.nodes.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let (mut dx, mut dy) = (
                    self.nodes[j].x - self.nodes[i].x,
                    self.nodes[j].y - self.nodes[i].y,
                );
                if dx.abs() < JIGGLE_EPSILON && dy.abs() < JIGGLE_EPSILON {
                    (dx, dy) = jiggle(i, j);
                }
                let mut l2 = dx * dx + dy * dy;
                if l2 < min2 {
                    l2 = (min2 * l2).sqrt();
                }
                let w = strength * alpha / l2;
                self.nodes[i].vx += dx * w;
                self.nodes[i].vy += dy * w;
                self.nodes[j].vx -= dx * w;
                self.nodes[j].vy -= dy * w;
            }
        }
    }

    fn apply_links(&mut self) {
        let distance = self.config.link_distance;
        let strength = self.config.link_strength;
        let alpha = self.alpha;
        for link in &self.links {
            let (s, t) = (&self.nodes[link.source], &self.nodes[link.target]);
            let mut dx = t.x + t.vx - s.x - s.vx;
            let mut dy = t.y + t.vy - s.y - s.vy;
            if dx.abs() < JIGGLE_EPSILON && dy.abs() < JIGGLE_EPSILON {
                (dx, dy) = jiggle(link.source, link.target);
            }
            let len = (dx * dx + dy * dy).sqrt();
            let k = (len - distance) / len * alpha * strength;
            let (dx, dy) = (dx * k, dy * k);
            let target = &mut self.nodes[link.target];
            target.vx -= dx * link.bias;
            target.vy -= dy * link.bias;
            let source = &mut self.nodes[link.source];
            source.vx += dx * (1.0 - link.bias);
            source.vy += dy * (1.0 - link.bias);
        }
    }

    fn apply_position_pull(&mut self) {
        let alpha = self.alpha;
        for node in &mut self.nodes {
            node.vx += (node.target.0 - node.x) * node.pull * alpha;
            node.vy += (node.target.1 - node.y) * node.pull * alpha;
        }
    }

    fn apply_collisions(&mut self) {
        let strength = self.config.collide_strength;
        let padding = self.config.collide_padding;
        let count = self.nodes.len();
        for i in 0..count {
            for j in (i + 1)..count {
                let ri = self.nodes[i].radius + padding;
                let rj = self.nodes[j].radius + padding;
                let reach = ri + rj;
                let (mut dx, mut dy) = (
                    self.nodes[i].x + self.nodes[i].vx - self.nodes[j].x - self.nodes[j].vx,
                    self.nodes[i].y + self.nodes[i].vy - self.nodes[j].y - self.nodes[j].vy,
                );
                let mut l2 = dx * dx + dy * dy;
                if l2 >= reach * reach {
                    continue;
                }
                if l2 < JIGGLE_EPSILON {
                    (dx, dy) = jiggle(i, j);
                    l2 = dx * dx + dy * dy;
                }
                let len = l2.sqrt();
                let push = (reach - len) / len * strength;
                let share = (rj * rj) / (ri * ri + rj * rj);
                self.nodes[i].vx += dx * push * share;
                self.nodes[i].vy += dy * push * share;
                self.nodes[j].vx -= dx * push * (1.0 - share);
                self.nodes[j].vy -= dy * push * (1.0 - share);
            }
        }
    }

    fn integrate(&mut self) {
        let keep = 1.0 - self.config.velocity_decay.clamp(0.0, 1.0);
        let viewport = self.viewport;
        for node in &mut self.nodes {
            match node.fx {
                Some(fx) => {
                    node.x = fx;
                    node.vx = 0.0;
                }
                None => {
                    node.vx *= keep;
                    node.x += node.vx;
                }
            }
            match node.fy {
                Some(fy) => {
                    node.y = fy;
                    node.vy = 0.0;
                }
                None => {
                    node.vy *= keep;
                    node.y += node.vy;
                }
            }
            let (cx, cy) = viewport.clamp(node.x, node.y);
            if cx != node.x {
                node.vx = 0.0;
            }
            if cy != node.y {
                node.vy = 0.0;
            }
            node.x = cx;
            node.y = cy;
        }
    }

    /// Pins `id` under the pointer and re-heats so neighbours react.
    pub fn drag_start(&mut self, id: &str, x: f32, y: f32) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        let (x, y) = self.viewport.clamp(x, y);
        let node = &mut self.nodes[idx];
        node.fx = Some(x);
        node.fy = Some(y);
        self.alpha_target = self.config.drag_alpha_target;
        self.running = true;
        true
    }

    pub fn drag_to(&mut self, id: &str, x: f32, y: f32) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        if !self.nodes[idx].is_pinned() {
            return false;
        }
        let (x, y) = self.viewport.clamp(x, y);
        let node = &mut self.nodes[idx];
        node.fx = Some(x);
        node.fy = Some(y);
        true
    }

    /// Releases the pin; the released spot becomes the node's new home.
    pub fn drag_end(&mut self, id: &str) -> bool {
        let Some(&idx) = self.index.get(id) else {
            return false;
        };
        let node = &mut self.nodes[idx];
        if !node.is_pinned() {
            return false;
        }
        node.fx = None;
        node.fy = None;
        node.target = (node.x, node.y);
        node.pull = self.config.cached_pull;
        if !self.nodes.iter().any(SimNode::is_pinned) {
            self.alpha_target = 0.0;
        }
        true
    }
}

/// Deterministic nudge for coincident points.
fn jiggle(i: usize, j: usize) -> (f32, f32) {
    let angle = ((i as f32) * 0.618_034 + (j as f32) * 0.414_214) * std::f32::consts::TAU;
    (angle.cos() * 1e-3, angle.sin() * 1e-3)
}
