use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use kgraph_canvas::config::{LayoutConfig, RenderConfig, ViewportConfig};
use kgraph_canvas::layout::{LayoutDriver, PositionCache, Simulation, place_nodes};
use kgraph_canvas::model::{Edge, Node};
use kgraph_canvas::reconcile::{ReconciledGraph, reconcile_parts};
use kgraph_canvas::render::render_svg;
use kgraph_canvas::theme::Theme;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

fn dense_graph(nodes: usize, extra_edges: usize) -> ReconciledGraph {
    let node_list: Vec<Node> = (0..nodes)
        .map(|i| Node::new(&format!("N{i}"), &format!("Node {i}")))
        .collect();
    let mut edges = Vec::new();
    for i in 0..nodes.saturating_sub(1) {
        edges.push(Edge::new(&format!("c{i}"), &format!("N{i}"), &format!("N{}", i + 1), "PART_OF"));
    }
    let mut count = 0usize;
    'outer: for i in 0..nodes {
        for j in (i + 2)..nodes {
            if count >= extra_edges {
                break 'outer;
            }
            edges.push(Edge::new(&format!("x{count}"), &format!("N{i}"), &format!("N{j}"), "CAUSES"));
            count += 1;
        }
    }
    reconcile_parts(&node_list, &edges)
}

fn bench_cold_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("simulation_cold_ticks");
    let config = LayoutConfig::default();
    let viewport = ViewportConfig::default();
    for (nodes, extra_edges) in [(20usize, 20usize), (80, 160), (200, 400)] {
        let graph = dense_graph(nodes, extra_edges);
        let mut rng = StdRng::seed_from_u64(1);
        let placement = place_nodes(&graph, &PositionCache::new(), &viewport, &config, &mut rng);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("dense_{nodes}_{extra_edges}")),
            &graph,
            |b, graph| {
                b.iter(|| {
                    let mut sim = Simulation::new(1, black_box(graph), &placement, &config, &viewport);
                    for _ in 0..50 {
                        sim.step();
                    }
                    black_box(sim.alpha());
                });
            },
        );
    }
    group.finish();
}

fn bench_warm_rerender(c: &mut Criterion) {
    let mut group = c.benchmark_group("driver_warm_rerender");
    for nodes in [40usize, 160] {
        let graph = dense_graph(nodes, nodes);
        let mut driver = LayoutDriver::new(LayoutConfig::default(), ViewportConfig::default());
        driver.bind_container("bench");
        let mut rng = StdRng::seed_from_u64(2);
        driver.rerender(&graph, &mut rng);
        while driver.tick() {}
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &graph, |b, graph| {
            b.iter(|| {
                let placement = driver.rerender(black_box(graph), &mut rng);
                black_box(placement.known_ratio);
            });
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let graph = dense_graph(120, 240);
    let mut driver = LayoutDriver::new(LayoutConfig::default(), ViewportConfig::default());
    let mut rng = StdRng::seed_from_u64(3);
    driver.rerender(&graph, &mut rng);
    for _ in 0..100 {
        driver.tick();
    }
    let frame = driver.frame(&graph, None);
    let theme = Theme::default();
    let config = RenderConfig::default();
    c.bench_function("render_svg_120", |b| {
        b.iter(|| black_box(render_svg(black_box(&frame), &theme, &config)).len());
    });
}

criterion_group!(benches, bench_cold_ticks, bench_warm_rerender, bench_render);
criterion_main!(benches);
