use std::path::Path;

use kgraph_canvas::api::{DeleteNodeResponse, ExploreMode, ExploreResponse};
use kgraph_canvas::config::{LayoutConfig, ViewportConfig};
use kgraph_canvas::layout::{PositionCache, StartRegime, place_nodes};
use kgraph_canvas::model::{Edge, Node, Snapshot};
use kgraph_canvas::reconcile::{NodeClass, reconcile, reconcile_parts};
use kgraph_canvas::scope::{FileStore, MemoryStore, Role, ScopeKey, TranscriptStore};
use kgraph_canvas::session::Channel;
use kgraph_canvas::{Config, Session, render_svg};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn fixture() -> Snapshot {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("snapshot_basic.json");
    let input = std::fs::read_to_string(path).expect("fixture read failed");
    Snapshot::from_json(&input).expect("fixture parse failed")
}

fn loaded_session(store: Box<dyn TranscriptStore>, snapshot: &Snapshot) -> Session {
    let mut session = Session::with_seed(Config::default(), store, 11);
    session.select_container("KC_1");
    let ticket = session.request_snapshot().expect("container selected");
    assert!(session.apply_snapshot(&ticket, snapshot));
    session
}

fn settle(session: &mut Session) {
    for _ in 0..1000 {
        if session.tick().is_none() {
            break;
        }
    }
}

fn chat(session: &mut Session, question: &str, answer: &str) {
    let (ticket, _) = session
        .begin_chat(question, ExploreMode::Clarify)
        .expect("node scope active");
    let reply = ExploreResponse {
        reply: answer.to_string(),
        suggested_nodes: Vec::new(),
        blocks: Vec::new(),
    };
    assert!(session.apply_chat_reply(&ticket, &reply));
}

#[test]
fn dangling_edges_never_reach_the_frame() {
    let graph = reconcile(&fixture());
    assert!(!graph.contains_edge("E_3"));
    assert_eq!(graph.dropped_edges, 1);
    for edge in &graph.edges {
        assert!(graph.contains_node(&edge.source));
        assert!(graph.contains_node(&edge.target));
    }

    let session = loaded_session(Box::new(MemoryStore::new()), &fixture());
    let frame = session.frame();
    assert!(frame.edge("E_3").is_none());
    assert_eq!(frame.edges.len(), 2);
    assert_eq!(frame.nodes.len(), 4);
}

#[test]
fn root_nodes_are_drawn_larger_than_sub_nodes() {
    let snapshot = Snapshot::new(
        vec![Node::new("A", "A"), Node::new("B", "B")],
        vec![Edge::new("e1", "A", "B", "PART_OF")],
    );
    let session = loaded_session(Box::new(MemoryStore::new()), &snapshot);
    let frame = session.frame();
    let a = frame.node("A").expect("A drawn");
    let b = frame.node("B").expect("B drawn");
    assert_eq!(a.class, NodeClass::Root);
    assert_eq!(b.class, NodeClass::Sub);
    assert!(b.radius < a.radius);

    let svg = render_svg(&frame, &session.config().theme, &session.config().render);
    assert!(svg.contains("node-root"));
    assert!(svg.contains("node-sub"));
}

#[test]
fn unchanged_snapshot_keeps_positions() {
    let mut session = loaded_session(Box::new(MemoryStore::new()), &fixture());
    settle(&mut session);
    let before = session.frame();

    let ticket = session.request_snapshot().expect("ticket");
    assert!(session.apply_snapshot(&ticket, &fixture()));
    let after = session.frame();
    for node in &before.nodes {
        let again = after.node(&node.id).expect("node kept");
        assert!((node.x - again.x).abs() < 1e-3, "{} moved in x", node.id);
        assert!((node.y - again.y).abs() < 1e-3, "{} moved in y", node.id);
    }
}

#[test]
fn start_regime_follows_known_ratio() {
    let graph = reconcile_parts(&[Node::new("A", "A"), Node::new("B", "B")], &[]);
    let config = LayoutConfig::default();
    let viewport = ViewportConfig::default();
    let mut rng = StdRng::seed_from_u64(5);

    let cold = place_nodes(&graph, &PositionCache::new(), &viewport, &config, &mut rng);
    assert_eq!(cold.known_ratio, 0.0);
    assert_eq!(cold.start.regime, StartRegime::Cold);
    assert_eq!(cold.start.alpha, config.cold_alpha);

    let mut cache = PositionCache::new();
    cache.insert("A", (300.0, 300.0));
    cache.insert("B", (500.0, 400.0));
    let warm = place_nodes(&graph, &cache, &viewport, &config, &mut rng);
    assert_eq!(warm.known_ratio, 1.0);
    assert_eq!(warm.start.regime, StartRegime::Warm);
    assert_eq!(warm.start.alpha, config.warm_alpha);
}

#[test]
fn scope_round_trip_restores_transcript() {
    let mut session = loaded_session(Box::new(MemoryStore::new()), &fixture());
    session.select_node("N_entropy");
    chat(&mut session, "hello", "hi");
    let original = session.transcript().clone();

    session.select_node("N_heat");
    assert!(session.transcript().is_empty());
    session.select_node("N_entropy");
    assert_eq!(session.transcript(), &original);
}

#[test]
fn revisiting_a_scope_does_not_duplicate_messages() {
    let mut session = loaded_session(Box::new(MemoryStore::new()), &fixture());
    session.select_node("N_entropy");
    chat(&mut session, "hello", "hi");
    session.select_node("N_heat");
    session.select_node("N_entropy");

    let messages = session.transcript().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "hello");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "hi");
}

#[test]
fn reload_rebuilds_one_entry_per_message() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let mut session = loaded_session(Box::new(FileStore::new(dir.path())), &fixture());
        session.select_node("N_entropy");
        chat(&mut session, "what is entropy?", "a measure of disorder");
        chat(&mut session, "and heat?", "energy in transit");
    }

    let mut session = loaded_session(Box::new(FileStore::new(dir.path())), &fixture());
    assert!(session.scope_cache().is_cached(&ScopeKey::Node("N_entropy".to_string())));
    session.select_node("N_entropy");
    let transcript = session.transcript();
    assert_eq!(transcript.len(), 4);
    assert_eq!(transcript.entries().len(), transcript.messages().len());
    for (entry, message) in transcript.entries().iter().zip(transcript.messages()) {
        assert_eq!(entry.role, message.role);
        assert!(entry.markup.contains(message.role.as_str()));
    }
}

#[test]
fn deleting_the_active_node_clears_its_transcript() {
    let mut session = loaded_session(Box::new(MemoryStore::new()), &fixture());
    session.select_node("N_heat");
    chat(&mut session, "hello", "hi");

    let ticket = session.ticket(Channel::Graph, Some("N_heat"));
    let response = DeleteNodeResponse {
        ok: true,
        deleted_ids: vec!["N_heat".to_string()],
    };
    assert!(session.apply_node_deleted(&ticket, &response));

    let key = ScopeKey::Node("N_heat".to_string());
    assert!(!session.scope_cache().is_cached(&key));
    assert!(!session.graph().contains_node("N_heat"));
    assert!(!session.graph().contains_edge("E_2"));
    assert!(session.selected_node().is_none());
    assert!(session.transcript().is_empty());
    assert!(!session.layout().cache().contains("N_heat"));
}

#[test]
fn container_switch_starts_a_clean_conversation() {
    let mut session = loaded_session(Box::new(MemoryStore::new()), &fixture());
    session.select_node("N_entropy");
    chat(&mut session, "hello", "hi");

    session.select_container("KC_2");
    assert!(session.transcript().is_empty());
    assert!(session.graph().is_empty());
    assert!(session.layout().cache().is_empty());
    assert_eq!(
        session.active_scope(),
        Some(&ScopeKey::Container("KC_2".to_string()))
    );
}

#[test]
fn stale_snapshot_after_container_switch_is_ignored() {
    let mut session = Session::with_seed(Config::default(), Box::new(MemoryStore::new()), 1);
    session.select_container("KC_1");
    let ticket = session.request_snapshot().expect("ticket");
    session.select_container("KC_2");
    assert!(!session.apply_snapshot(&ticket, &fixture()));
    assert!(session.graph().is_empty());
}
