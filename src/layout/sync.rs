//! Render sync: owns the position cache and the single live simulation.

use rand::Rng;

use crate::config::{LayoutConfig, ViewportConfig};
use crate::reconcile::{NodeClass, ReconciledGraph};

use super::cache::PositionCache;
use super::geometry::edge_curve;
use super::placement::{Placement, place_nodes};
use super::simulation::{Simulation, collision_radius};
use super::types::{EdgeFrame, Frame, NodeFrame};

#[derive(Debug, Clone)]
pub struct LayoutDriver {
    cache: PositionCache,
    current: Option<Simulation>,
    next_id: u64,
    config: LayoutConfig,
    viewport: ViewportConfig,
}

impl LayoutDriver {
    pub fn new(config: LayoutConfig, viewport: ViewportConfig) -> Self {
        Self {
            cache: PositionCache::new(),
            current: None,
            next_id: 1,
            config,
            viewport,
        }
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    pub fn viewport(&self) -> &ViewportConfig {
        &self.viewport
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.current.as_ref()
    }

    /// Points the cache at `container`, stopping the running simulation when
    /// the container actually changes.
    pub fn bind_container(&mut self, container: &str) -> bool {
        let switched = self.cache.bind(container);
        if switched {
            self.stop();
        }
        switched
    }

    pub fn stop(&mut self) {
        if let Some(mut sim) = self.current.take() {
            sim.stop();
        }
    }

    /// Tears down the current simulation and starts a new one for `graph`.
    /// Live coordinates are captured first so nothing the user saw is lost.
    pub fn rerender<R: Rng>(&mut self, graph: &ReconciledGraph, rng: &mut R) -> Placement {
        if let Some(mut previous) = self.current.take() {
            self.cache.capture(
                previous
                    .positions()
                    .filter(|(id, _)| graph.contains_node(id)),
            );
            previous.stop();
        }
        let pruned = self.cache.retain(|id| graph.contains_node(id));
        if pruned > 0 {
            tracing::debug!(pruned, "dropped cached positions of removed nodes");
        }

        let placement = place_nodes(graph, &self.cache, &self.viewport, &self.config, rng);
        let id = self.next_id;
        self.next_id += 1;
        let sim = Simulation::new(id, graph, &placement, &self.config, &self.viewport);
        self.cache.capture(sim.positions());
        self.current = Some(sim);
        placement
    }

    /// One animation frame. Returns false when there is nothing left to do.
    pub fn tick(&mut self) -> bool {
        let Some(sim) = self.current.as_mut() else {
            return false;
        };
        if !sim.step() {
            return false;
        }
        self.cache.capture(sim.positions());
        true
    }

    pub fn drag_start(&mut self, id: &str, x: f32, y: f32) -> bool {
        self.with_sim(|sim| sim.drag_start(id, x, y))
    }

    pub fn drag_to(&mut self, id: &str, x: f32, y: f32) -> bool {
        self.with_sim(|sim| sim.drag_to(id, x, y))
    }

    pub fn drag_end(&mut self, id: &str) -> bool {
        self.with_sim(|sim| sim.drag_end(id))
    }

    fn with_sim(&mut self, action: impl FnOnce(&mut Simulation) -> bool) -> bool {
        let Some(sim) = self.current.as_mut() else {
            return false;
        };
        let changed = action(sim);
        if changed {
            self.cache.capture(sim.positions());
        }
        changed
    }

    pub fn forget<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> usize {
        self.cache.remove_all(ids)
    }

    /// Builds the drawable frame. Nodes without a live simulation fall back
    /// to their cached coordinates, then to the viewport center.
    pub fn frame(&self, graph: &ReconciledGraph, selected_edge: Option<&str>) -> Frame {
        let fallback = self.viewport.center();
        let position_of = |id: &str| -> (f32, f32) {
            self.current
                .as_ref()
                .and_then(|sim| sim.node(id).map(|node| (node.x, node.y)))
                .or_else(|| self.cache.get(id))
                .map(|(x, y)| self.viewport.clamp(x, y))
                .unwrap_or(fallback)
        };

        let nodes = graph
            .nodes
            .iter()
            .map(|node| {
                let class = graph.class_of(&node.id).unwrap_or(NodeClass::Root);
                let (x, y) = position_of(&node.id);
                let pinned = self
                    .current
                    .as_ref()
                    .and_then(|sim| sim.node(&node.id))
                    .map(|n| n.is_pinned())
                    .unwrap_or(false);
                NodeFrame {
                    id: node.id.clone(),
                    title: node.title.clone(),
                    state: node.state,
                    maturity: node.maturity(),
                    class,
                    x,
                    y,
                    radius: collision_radius(class, &self.config),
                    pinned,
                }
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .map(|edge| {
                let curve = edge_curve(
                    position_of(&edge.source),
                    position_of(&edge.target),
                    self.config.edge_trim_offset,
                    self.config.edge_curvature,
                );
                EdgeFrame {
                    id: edge.id.clone(),
                    from: edge.source.clone(),
                    to: edge.target.clone(),
                    relation: edge.relation_type.clone(),
                    label_anchor: curve.midpoint(),
                    curve,
                    selected: selected_edge == Some(edge.id.as_str()),
                }
            })
            .collect();

        Frame {
            width: self.viewport.width,
            height: self.viewport.height,
            alpha: self.current.as_ref().map(Simulation::alpha).unwrap_or(0.0),
            nodes,
            edges,
        }
    }
}
