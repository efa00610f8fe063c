//! One-edge-at-a-time selection with an anchored inline editor.

use crate::api::EdgePatch;
use crate::config::ViewportConfig;
use crate::model::EdgeId;
use crate::reconcile::ReconciledGraph;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorSize {
    pub width: f32,
    pub height: f32,
}

impl Default for EditorSize {
    fn default() -> Self {
        Self {
            width: 220.0,
            height: 120.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEditor {
    pub edge_id: EdgeId,
    /// Top-left corner of the editor box.
    pub x: f32,
    pub y: f32,
    pub draft_relation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearReason {
    CanvasClick,
    Vanished,
    Cancelled,
    Saved,
}

#[derive(Debug, Clone, Default)]
pub struct EdgeContext {
    selected: Option<EdgeEditor>,
    size: EditorSize,
}

const POINTER_OFFSET: f32 = 12.0;

impl EdgeContext {
    pub fn new(size: EditorSize) -> Self {
        Self {
            selected: None,
            size,
        }
    }

    pub fn selected(&self) -> Option<&EdgeEditor> {
        self.selected.as_ref()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_ref().map(|editor| editor.edge_id.as_str())
    }

    /// Selects `edge_id` and opens the editor next to the pointer. Unknown
    /// edges are ignored and leave any current selection alone.
    pub fn select(
        &mut self,
        graph: &ReconciledGraph,
        edge_id: &str,
        pointer: (f32, f32),
        viewport: &ViewportConfig,
    ) -> bool {
        let Some(edge) = graph.edge(edge_id) else {
            return false;
        };
        let (x, y) = self.anchor(pointer, viewport);
        self.selected = Some(EdgeEditor {
            edge_id: edge.id.clone(),
            x,
            y,
            draft_relation: edge.relation_type.clone(),
        });
        true
    }

    fn anchor(&self, pointer: (f32, f32), viewport: &ViewportConfig) -> (f32, f32) {
        let max_x = (viewport.width - self.size.width).max(0.0);
        let max_y = (viewport.height - self.size.height).max(0.0);
        (
            (pointer.0 + POINTER_OFFSET).clamp(0.0, max_x),
            (pointer.1 + POINTER_OFFSET).clamp(0.0, max_y),
        )
    }

    pub fn set_draft(&mut self, relation: &str) -> bool {
        match self.selected.as_mut() {
            Some(editor) => {
                editor.draft_relation = relation.to_string();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, reason: ClearReason) -> Option<EdgeEditor> {
        let cleared = self.selected.take();
        if let Some(editor) = &cleared {
            tracing::debug!(edge = %editor.edge_id, ?reason, "edge selection cleared");
        }
        cleared
    }

    /// Drops the selection when its edge did not survive reconciliation.
    pub fn revalidate(&mut self, graph: &ReconciledGraph) -> bool {
        let vanished = self
            .selected
            .as_ref()
            .is_some_and(|editor| !graph.contains_edge(&editor.edge_id));
        if vanished {
            self.clear(ClearReason::Vanished);
        }
        vanished
    }

    /// Closes the editor and returns the patch body to send, if the edge is
    /// still there and the draft is a non-empty relation.
    pub fn save(&mut self, graph: &ReconciledGraph) -> Option<(EdgeId, EdgePatch)> {
        let editor = self.clear(ClearReason::Saved)?;
        if !graph.contains_edge(&editor.edge_id) || editor.draft_relation.trim().is_empty() {
            return None;
        }
        Some((
            editor.edge_id,
            EdgePatch {
                relation_type: editor.draft_relation.trim().to_string(),
            },
        ))
    }
}
