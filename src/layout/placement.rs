//! Initial placement for a reconciled snapshot, anchored by the position cache.

use std::f32::consts::TAU;

use rand::Rng;

use crate::config::{LayoutConfig, ViewportConfig};
use crate::model::NodeId;
use crate::reconcile::ReconciledGraph;

use super::cache::PositionCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRegime {
    /// Most of the layout is known: low energy, fast decay.
    Warm,
    /// Most nodes are new: full relaxation.
    Cold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarmStart {
    pub regime: StartRegime,
    pub alpha: f32,
    pub alpha_decay: f32,
}

impl WarmStart {
    pub fn for_ratio(known_ratio: f32, config: &LayoutConfig) -> Self {
        if known_ratio >= config.warm_ratio_threshold {
            Self {
                regime: StartRegime::Warm,
                alpha: config.warm_alpha,
                alpha_decay: config.warm_alpha_decay,
            }
        } else {
            Self {
                regime: StartRegime::Cold,
                alpha: config.cold_alpha,
                alpha_decay: config.cold_alpha_decay,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    /// Where the positional force pulls the node.
    pub target: (f32, f32),
    /// True when the position came from the cache.
    pub cached: bool,
}

#[derive(Debug, Clone)]
pub struct Placement {
    pub nodes: Vec<PlacedNode>,
    pub anchor: (f32, f32),
    pub known_ratio: f32,
    pub start: WarmStart,
}

impl Placement {
    pub fn node(&self, id: &str) -> Option<&PlacedNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

pub fn known_ratio(graph: &ReconciledGraph, cache: &PositionCache) -> f32 {
    if graph.nodes.is_empty() {
        return 1.0;
    }
    let known = graph.node_ids().filter(|id| cache.contains(id)).count();
    known as f32 / graph.nodes.len() as f32
}

pub fn place_nodes<R: Rng>(
    graph: &ReconciledGraph,
    cache: &PositionCache,
    viewport: &ViewportConfig,
    config: &LayoutConfig,
    rng: &mut R,
) -> Placement {
    let anchor = cache
        .centroid(graph.node_ids())
        .unwrap_or_else(|| viewport.center());

    let fresh_total = graph
        .nodes
        .iter()
        .filter(|node| !cache.contains(&node.id) && node.x.zip(node.y).is_none())
        .count();
    let phase = if fresh_total > 0 {
        rng.gen_range(0.0..TAU)
    } else {
        0.0
    };
    let (radius_min, radius_max) = ring_bounds(config);

    let mut nodes = Vec::with_capacity(graph.nodes.len());
    let mut fresh_index = 0usize;
    for node in &graph.nodes {
        if let Some(pos) = cache.get(&node.id) {
            nodes.push(PlacedNode {
                id: node.id.clone(),
                x: pos.0,
                y: pos.1,
                target: pos,
                cached: true,
            });
            continue;
        }
        let pos = match node.x.zip(node.y) {
            Some(hint) if hint.0.is_finite() && hint.1.is_finite() => hint,
            _ => {
                let angle = phase + TAU * fresh_index as f32 / fresh_total.max(1) as f32;
                let radius = rng.gen_range(radius_min..=radius_max);
                fresh_index += 1;
                (anchor.0 + radius * angle.cos(), anchor.1 + radius * angle.sin())
            }
        };
        nodes.push(PlacedNode {
            id: node.id.clone(),
            x: pos.0,
            y: pos.1,
            target: anchor,
            cached: false,
        });
    }

    let known_ratio = known_ratio(graph, cache);
    let start = WarmStart::for_ratio(known_ratio, config);
    tracing::debug!(
        nodes = nodes.len(),
        fresh = fresh_total,
        known_ratio,
        regime = ?start.regime,
        "placed snapshot"
    );

    Placement {
        nodes,
        anchor,
        known_ratio,
        start,
    }
}

fn ring_bounds(config: &LayoutConfig) -> (f32, f32) {
    let lo = config.ring_radius_min.max(0.0);
    let hi = config.ring_radius_max.max(lo);
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Node};
    use crate::reconcile::reconcile_parts;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn graph(ids: &[&str]) -> ReconciledGraph {
        let nodes: Vec<Node> = ids.iter().map(|id| Node::new(id, id)).collect();
        let edges: Vec<Edge> = Vec::new();
        reconcile_parts(&nodes, &edges)
    }

    fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
        ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
    }

    #[test]
    fn empty_cache_rings_around_viewport_center() {
        let graph = graph(&["A", "B", "C", "D"]);
        let cache = PositionCache::new();
        let viewport = ViewportConfig::default();
        let config = LayoutConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let placement = place_nodes(&graph, &cache, &viewport, &config, &mut rng);
        assert_eq!(placement.anchor, viewport.center());
        assert_eq!(placement.known_ratio, 0.0);
        assert_eq!(placement.start.regime, StartRegime::Cold);
        for node in &placement.nodes {
            let d = distance((node.x, node.y), placement.anchor);
            assert!(d >= config.ring_radius_min - 1e-3, "radius {d} below range");
            assert!(d <= config.ring_radius_max + 1e-3, "radius {d} above range");
            assert!(!node.cached);
            assert_eq!(node.target, placement.anchor);
        }
    }

    #[test]
    fn new_nodes_fan_out_evenly() {
        let graph = graph(&["A", "B", "C", "D"]);
        let cache = PositionCache::new();
        let mut config = LayoutConfig::default();
        config.ring_radius_min = 150.0;
        config.ring_radius_max = 150.0;
        let mut rng = StdRng::seed_from_u64(11);
        let placement =
            place_nodes(&graph, &cache, &ViewportConfig::default(), &config, &mut rng);
        let angles: Vec<f32> = placement
            .nodes
            .iter()
            .map(|node| (node.y - placement.anchor.1).atan2(node.x - placement.anchor.0))
            .collect();
        for pair in angles.windows(2) {
            let gap = (pair[1] - pair[0]).rem_euclid(TAU);
            assert!((gap - TAU / 4.0).abs() < 1e-3, "gap {gap}");
        }
    }

    #[test]
    fn cached_positions_are_used_verbatim_and_anchor_is_their_centroid() {
        let graph = graph(&["A", "B", "C"]);
        let mut cache = PositionCache::new();
        cache.insert("A", (100.0, 100.0));
        cache.insert("B", (300.0, 100.0));
        let mut rng = StdRng::seed_from_u64(3);
        let config = LayoutConfig::default();
        let placement =
            place_nodes(&graph, &cache, &ViewportConfig::default(), &config, &mut rng);
        assert_eq!(placement.anchor, (200.0, 100.0));
        let a = placement.node("A").expect("A placed");
        assert_eq!((a.x, a.y), (100.0, 100.0));
        assert!(a.cached);
        let c = placement.node("C").expect("C placed");
        assert!(!c.cached);
        let d = distance((c.x, c.y), placement.anchor);
        assert!(d >= config.ring_radius_min - 1e-3 && d <= config.ring_radius_max + 1e-3);
        assert!((placement.known_ratio - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(placement.start.regime, StartRegime::Warm);
    }

    #[test]
    fn warm_and_cold_parameters_follow_known_ratio() {
        let config = LayoutConfig::default();
        let warm = WarmStart::for_ratio(1.0, &config);
        let cold = WarmStart::for_ratio(0.0, &config);
        assert_eq!(warm.regime, StartRegime::Warm);
        assert_eq!(cold.regime, StartRegime::Cold);
        assert!(warm.alpha < cold.alpha);
        assert!(warm.alpha_decay > cold.alpha_decay);
    }

    #[test]
    fn server_hint_used_for_first_placement_only() {
        let mut hinted = Node::new("A", "A");
        hinted.x = Some(42.0);
        hinted.y = Some(24.0);
        let graph = reconcile_parts(&[hinted], &[]);
        let mut cache = PositionCache::new();
        let mut rng = StdRng::seed_from_u64(1);
        let config = LayoutConfig::default();
        let viewport = ViewportConfig::default();
        let first = place_nodes(&graph, &cache, &viewport, &config, &mut rng);
        assert_eq!(first.nodes[0].x, 42.0);
        cache.insert("A", (500.0, 500.0));
        let second = place_nodes(&graph, &cache, &viewport, &config, &mut rng);
        assert_eq!((second.nodes[0].x, second.nodes[0].y), (500.0, 500.0));
    }

    #[test]
    fn empty_snapshot_counts_as_known() {
        let graph = graph(&[]);
        assert_eq!(known_ratio(&graph, &PositionCache::new()), 1.0);
    }
}
