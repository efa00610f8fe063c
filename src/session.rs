//! The session controller: one object owning every piece of canvas state.
//!
//! Remote calls are modelled as [`RequestTicket`]s. A ticket records the
//! generation of the state it was issued against; completion handlers compare
//! it with the current generation and check that their target still exists
//! in the latest reconciled snapshot. Anything stale is dropped silently.

use std::collections::{HashMap, VecDeque};

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::api::{
    AutoDocumentResponse, ConfirmSuggestedResponse, DeleteNodeResponse, EdgePatch, ExploreMode,
    ExploreRequest, ExploreResponse, NodeDetail, RemoteError, SuggestedNode,
};
use crate::config::Config;
use crate::edge_context::{ClearReason, EdgeContext, EdgeEditor, EditorSize};
use crate::layout::{Frame, LayoutDriver, Placement};
use crate::model::{ContainerId, Edge, EdgeId, Node, NodeId, Snapshot};
use crate::reconcile::{ReconciledGraph, reconcile, reconcile_parts};
use crate::scope::markup::{flatten_blocks, render_blocks};
use crate::scope::{Message, ScopeCache, ScopeKey, Transcript, TranscriptStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Snapshot fetches and graph mutations.
    Graph,
    /// Chat and document generation tied to a scope.
    Scope,
    /// Detail fetches for the selected node.
    Selection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Generations {
    pub graph: u64,
    pub scope: u64,
    pub selection: u64,
}

impl Generations {
    pub fn get(&self, channel: Channel) -> u64 {
        match channel {
            Channel::Graph => self.graph,
            Channel::Scope => self.scope,
            Channel::Selection => self.selection,
        }
    }

    fn bump(&mut self, channel: Channel) -> u64 {
        let slot = match channel {
            Channel::Graph => &mut self.graph,
            Channel::Scope => &mut self.scope,
            Channel::Selection => &mut self.selection,
        };
        *slot += 1;
        *slot
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    pub id: u64,
    pub channel: Channel,
    pub generation: u64,
    pub container: Option<ContainerId>,
    pub scope: Option<ScopeKey>,
    /// Clear count of `scope` when the ticket was issued.
    pub clear_epoch: u64,
    /// Entity the response will touch, when there is one.
    pub subject: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient, non-blocking notification for the host to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Activation status of the selected node, as last reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub node_id: NodeId,
    pub can_activate: bool,
    pub missing_fields: Vec<String>,
    pub edge_count: usize,
}

#[derive(Debug)]
pub struct Session {
    config: Config,
    graph: ReconciledGraph,
    layout: LayoutDriver,
    scope: ScopeCache,
    edges: EdgeContext,
    container: Option<ContainerId>,
    node: Option<NodeId>,
    node_status: Option<NodeStatus>,
    suggestions: Vec<SuggestedNode>,
    generations: Generations,
    clear_epochs: HashMap<ScopeKey, u64>,
    next_ticket: u64,
    notices: VecDeque<Notice>,
    rng: StdRng,
}

impl Session {
    pub fn new(config: Config, store: Box<dyn TranscriptStore>) -> Self {
        Self::with_rng(config, store, StdRng::from_entropy())
    }

    pub fn with_seed(config: Config, store: Box<dyn TranscriptStore>, seed: u64) -> Self {
        Self::with_rng(config, store, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: Config, store: Box<dyn TranscriptStore>, rng: StdRng) -> Self {
        let scope = ScopeCache::restore(store, &config.scope.storage_key);
        let layout = LayoutDriver::new(config.layout.clone(), config.viewport);
        Self {
            graph: ReconciledGraph::default(),
            layout,
            scope,
            edges: EdgeContext::new(EditorSize::default()),
            container: None,
            node: None,
            node_status: None,
            suggestions: Vec::new(),
            generations: Generations::default(),
            clear_epochs: HashMap::new(),
            next_ticket: 1,
            notices: VecDeque::new(),
            rng,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn graph(&self) -> &ReconciledGraph {
        &self.graph
    }

    pub fn layout(&self) -> &LayoutDriver {
        &self.layout
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    pub fn selected_node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    pub fn node_status(&self) -> Option<&NodeStatus> {
        self.node_status.as_ref()
    }

    pub fn active_scope(&self) -> Option<&ScopeKey> {
        self.scope.active()
    }

    pub fn transcript(&self) -> &Transcript {
        self.scope.transcript()
    }

    pub fn scope_cache(&self) -> &ScopeCache {
        &self.scope
    }

    pub fn suggestions(&self) -> &[SuggestedNode] {
        &self.suggestions
    }

    pub fn selected_edge(&self) -> Option<&EdgeEditor> {
        self.edges.selected()
    }

    pub fn generations(&self) -> Generations {
        self.generations
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn ticket(&mut self, channel: Channel, subject: Option<&str>) -> RequestTicket {
        let id = self.next_ticket;
        self.next_ticket += 1;
        let scope = self.scope.active().cloned();
        let clear_epoch = scope.as_ref().map_or(0, |key| self.clear_epoch(key));
        RequestTicket {
            id,
            channel,
            generation: self.generations.get(channel),
            container: self.container.clone(),
            scope,
            clear_epoch,
            subject: subject.map(str::to_string),
        }
    }

    fn clear_epoch(&self, key: &ScopeKey) -> u64 {
        self.clear_epochs.get(key).copied().unwrap_or(0)
    }

    /// Issues a snapshot fetch. Any snapshot still in flight is superseded.
    pub fn request_snapshot(&mut self) -> Option<RequestTicket> {
        let container = self.container.clone()?;
        self.generations.bump(Channel::Graph);
        Some(self.ticket(Channel::Graph, Some(&container)))
    }

    fn is_current(&self, ticket: &RequestTicket) -> bool {
        let current = ticket.generation == self.generations.get(ticket.channel)
            && ticket.container == self.container;
        if !current {
            tracing::debug!(ticket = ticket.id, channel = ?ticket.channel, "discarding stale response");
        }
        current
    }

    fn same_container(&self, ticket: &RequestTicket) -> bool {
        let same = ticket.container.is_some() && ticket.container == self.container;
        if !same {
            tracing::debug!(ticket = ticket.id, "discarding response for another container");
        }
        same
    }

    /// A remote call failed: tell the user, change nothing else.
    pub fn fail(&mut self, ticket: &RequestTicket, err: &RemoteError) {
        tracing::warn!(ticket = ticket.id, channel = ?ticket.channel, %err, "remote call failed");
        self.notices.push_back(Notice {
            level: NoticeLevel::Error,
            message: err.to_string(),
        });
    }

    pub fn select_container(&mut self, container: &str) -> bool {
        if self.container.as_deref() == Some(container) {
            return false;
        }
        self.generations.bump(Channel::Graph);
        self.generations.bump(Channel::Selection);
        self.generations.bump(Channel::Scope);
        self.container = Some(container.to_string());
        self.node = None;
        self.node_status = None;
        self.suggestions.clear();
        self.edges.clear(ClearReason::CanvasClick);
        self.graph = ReconciledGraph::default();
        self.layout.bind_container(container);
        self.scope
            .switch_container(Some(ScopeKey::Container(container.to_string())));
        tracing::info!(container, "container selected");
        true
    }

    pub fn select_node(&mut self, node: &str) -> bool {
        if !self.graph.contains_node(node) {
            return false;
        }
        if self.node.as_deref() == Some(node) {
            return false;
        }
        self.node = Some(node.to_string());
        self.on_selection_changed();
        true
    }

    pub fn deselect_node(&mut self) -> bool {
        if self.node.take().is_none() {
            return false;
        }
        self.on_selection_changed();
        true
    }

    fn on_selection_changed(&mut self) {
        self.generations.bump(Channel::Selection);
        self.generations.bump(Channel::Scope);
        self.node_status = None;
        self.suggestions.clear();
        self.scope.switch_to(ScopeKey::resolve(
            self.node.as_deref(),
            self.container.as_deref(),
        ));
    }

    pub fn apply_snapshot(&mut self, ticket: &RequestTicket, snapshot: &Snapshot) -> bool {
        if ticket.channel != Channel::Graph || !self.is_current(ticket) {
            return false;
        }
        self.install(reconcile(snapshot));
        true
    }

    fn install(&mut self, graph: ReconciledGraph) -> Placement {
        self.graph = graph;
        let placement = self.layout.rerender(&self.graph, &mut self.rng);
        self.edges.revalidate(&self.graph);
        if let Some(node) = self.node.clone() {
            if !self.graph.contains_node(&node) {
                tracing::debug!(node = %node, "selected node left the snapshot");
                self.deselect_node();
            }
        }
        placement
    }

    /// Installs a locally mutated graph. Snapshots requested before the
    /// mutation no longer describe the graph, so they are superseded.
    fn rebuild(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.generations.bump(Channel::Graph);
        let graph = reconcile_parts(&nodes, &edges);
        self.install(graph);
    }

    /// Cascade delete finished server-side.
    pub fn apply_node_deleted(&mut self, ticket: &RequestTicket, response: &DeleteNodeResponse) -> bool {
        if !self.same_container(ticket) || !response.ok {
            return false;
        }
        let gone: Vec<&str> = response
            .deleted_ids
            .iter()
            .map(String::as_str)
            .filter(|id| self.graph.contains_node(id))
            .collect();
        if gone.is_empty() {
            return false;
        }
        let forgotten = self.layout.forget(gone.iter().copied());
        for id in &gone {
            self.scope.forget(&ScopeKey::Node(id.to_string()));
        }
        tracing::info!(deleted = gone.len(), forgotten, "nodes deleted");

        let nodes: Vec<Node> = self
            .graph
            .nodes
            .iter()
            .filter(|node| !gone.contains(&node.id.as_str()))
            .cloned()
            .collect();
        let edges = self.graph.edges.clone();
        self.rebuild(nodes, edges);
        true
    }

    /// Issues a detail fetch for the selected node. Earlier detail fetches
    /// still in flight can no longer update the status panel.
    pub fn request_node_detail(&mut self) -> Option<RequestTicket> {
        let node = self.node.clone()?;
        self.generations.bump(Channel::Selection);
        Some(self.ticket(Channel::Selection, Some(&node)))
    }

    /// Stores a fetched or patched node. A payload older than the node already
    /// held (by server `version`) is dropped.
    pub fn apply_node_detail(&mut self, ticket: &RequestTicket, detail: &NodeDetail) -> bool {
        if ticket.container != self.container || !self.graph.replace_node(detail.node.clone()) {
            return false;
        }
        if ticket.channel == Channel::Selection
            && self.is_current(ticket)
            && self.node.as_deref() == Some(detail.node.id.as_str())
        {
            self.node_status = Some(NodeStatus {
                node_id: detail.node.id.clone(),
                can_activate: detail.can_activate,
                missing_fields: detail.missing_fields.clone(),
                edge_count: detail.edge_count,
            });
        }
        true
    }

    pub fn apply_node_created(&mut self, ticket: &RequestTicket, node: &Node) -> bool {
        if !self.same_container(ticket) || self.graph.contains_node(&node.id) {
            return false;
        }
        let mut nodes = self.graph.nodes.clone();
        nodes.push(node.clone());
        let edges = self.graph.edges.clone();
        self.rebuild(nodes, edges);
        true
    }

    pub fn apply_edge_created(&mut self, ticket: &RequestTicket, edge: &Edge) -> bool {
        if !self.same_container(ticket)
            || !self.graph.contains_node(&edge.source)
            || !self.graph.contains_node(&edge.target)
        {
            return false;
        }
        let nodes = self.graph.nodes.clone();
        let mut edges = self.graph.edges.clone();
        edges.push(edge.clone());
        self.rebuild(nodes, edges);
        true
    }

    pub fn apply_edge_patched(&mut self, ticket: &RequestTicket, edge: &Edge) -> bool {
        if !self.same_container(ticket) {
            return false;
        }
        self.graph.set_relation(&edge.id, &edge.relation_type)
    }

    pub fn apply_edge_deleted(&mut self, ticket: &RequestTicket, edge_id: &str) -> bool {
        if !self.same_container(ticket) || !self.graph.contains_edge(edge_id) {
            return false;
        }
        let nodes = self.graph.nodes.clone();
        let edges = self
            .graph
            .edges
            .iter()
            .filter(|edge| edge.id != edge_id)
            .cloned()
            .collect();
        self.rebuild(nodes, edges);
        true
    }

    /// Advances the simulation one frame. `None` once it has settled.
    pub fn tick(&mut self) -> Option<Frame> {
        self.layout.tick().then(|| self.frame())
    }

    pub fn frame(&self) -> Frame {
        self.layout.frame(&self.graph, self.edges.selected_id())
    }

    pub fn drag_start(&mut self, node: &str, x: f32, y: f32) -> bool {
        self.graph.contains_node(node) && self.layout.drag_start(node, x, y)
    }

    pub fn drag_to(&mut self, node: &str, x: f32, y: f32) -> bool {
        self.graph.contains_node(node) && self.layout.drag_to(node, x, y)
    }

    pub fn drag_end(&mut self, node: &str) -> bool {
        self.graph.contains_node(node) && self.layout.drag_end(node)
    }

    pub fn select_edge(&mut self, edge: &str, pointer: (f32, f32)) -> bool {
        self.edges
            .select(&self.graph, edge, pointer, &self.config.viewport)
    }

    pub fn set_edge_draft(&mut self, relation: &str) -> bool {
        if !self.config.vocabulary.is_relation_type(relation) {
            return false;
        }
        self.edges.set_draft(relation)
    }

    pub fn click_canvas(&mut self) {
        self.edges.clear(ClearReason::CanvasClick);
    }

    pub fn cancel_edge(&mut self) {
        self.edges.clear(ClearReason::Cancelled);
    }

    pub fn save_edge(&mut self) -> Option<(RequestTicket, EdgeId, EdgePatch)> {
        let (edge_id, patch) = self.edges.save(&self.graph)?;
        let ticket = self.ticket(Channel::Graph, Some(&edge_id));
        Some((ticket, edge_id, patch))
    }

    /// Appends a message to whatever scope is active.
    pub fn append_message(&mut self, message: Message) -> bool {
        if self.scope.active().is_none() {
            return false;
        }
        self.scope.append(message);
        true
    }

    /// Records the user's turn and builds the explore request. Needs a
    /// selected node; the history is the trailing window before this turn.
    pub fn begin_chat(
        &mut self,
        text: &str,
        mode: ExploreMode,
    ) -> Option<(RequestTicket, ExploreRequest)> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let node = self.node.clone()?;
        let container = self.container.clone()?;
        let history = self
            .scope
            .transcript()
            .trailing(self.config.scope.history_window)
            .to_vec();
        self.scope.append(Message::user(text));
        let ticket = self.ticket(Channel::Scope, Some(&node));
        let request = ExploreRequest {
            node_id: node,
            container_id: container,
            mode,
            message: text.to_string(),
            history,
        };
        Some((ticket, request))
    }

    /// Lands an assistant reply in the scope that asked for it, even if the
    /// user has moved on, as long as its node still exists.
    pub fn apply_chat_reply(&mut self, ticket: &RequestTicket, response: &ExploreResponse) -> bool {
        let Some(key) = ticket.scope.clone() else {
            return false;
        };
        if ticket.container != self.container || !self.scope_target_exists(&key) {
            return false;
        }
        if ticket.clear_epoch != self.clear_epoch(&key) {
            tracing::debug!(ticket = ticket.id, scope = %key, "discarding reply for a cleared chat");
            return false;
        }
        let (message, rendered) = if response.blocks.is_empty() {
            (Message::assistant(&response.reply), None)
        } else {
            let mut text = flatten_blocks(&response.blocks);
            if text.is_empty() {
                text = response.reply.clone();
            }
            (Message::assistant(&text), Some(render_blocks(&response.blocks)))
        };
        self.scope.append_to(&key, message, rendered);
        if self.is_current(ticket) && self.scope.active() == Some(&key) {
            self.suggestions = response.suggested_nodes.clone();
        }
        true
    }

    pub fn request_auto_document(&mut self) -> Option<RequestTicket> {
        let node = self.node.clone()?;
        Some(self.ticket(Channel::Scope, Some(&node)))
    }

    pub fn apply_auto_document(
        &mut self,
        ticket: &RequestTicket,
        response: &AutoDocumentResponse,
    ) -> bool {
        if ticket.container != self.container || !self.graph.replace_node(response.detail.node.clone()) {
            return false;
        }
        if self.is_current(ticket) && self.node.as_deref() == Some(response.detail.node.id.as_str()) {
            self.suggestions = response.suggested_nodes.clone();
            self.node_status = Some(NodeStatus {
                node_id: response.detail.node.id.clone(),
                can_activate: response.detail.can_activate,
                missing_fields: response.detail.missing_fields.clone(),
                edge_count: response.detail.edge_count,
            });
        }
        true
    }

    /// Takes suggestion `index` out of the pending list for confirmation.
    pub fn confirm_suggestion(&mut self, index: usize) -> Option<(RequestTicket, SuggestedNode)> {
        if index >= self.suggestions.len() {
            return None;
        }
        let parent = self.node.clone()?;
        let suggestion = self.suggestions.remove(index);
        let ticket = self.ticket(Channel::Graph, Some(&parent));
        Some((ticket, suggestion))
    }

    pub fn apply_suggestion_confirmed(
        &mut self,
        ticket: &RequestTicket,
        response: &ConfirmSuggestedResponse,
    ) -> bool {
        let parent_alive = ticket
            .subject
            .as_deref()
            .is_some_and(|parent| self.graph.contains_node(parent));
        if !self.same_container(ticket) || !parent_alive {
            return false;
        }
        let mut nodes = self.graph.nodes.clone();
        if !self.graph.contains_node(&response.node.id) {
            nodes.push(response.node.clone());
        }
        let mut edges = self.graph.edges.clone();
        edges.push(response.edge.clone());
        self.rebuild(nodes, edges);
        true
    }

    /// Removes the active scope's transcript and cache entry.
    /// Replies still in flight for the cleared scope are dropped on arrival.
    pub fn clear_chat(&mut self) {
        if let Some(key) = self.scope.active().cloned() {
            *self.clear_epochs.entry(key).or_insert(0) += 1;
        }
        self.scope.clear_active();
        self.suggestions.clear();
    }

    fn scope_target_exists(&self, key: &ScopeKey) -> bool {
        match key {
            ScopeKey::Node(id) => self.graph.contains_node(id),
            ScopeKey::Container(id) => self.container.as_deref() == Some(id.as_str()),
        }
    }
}
