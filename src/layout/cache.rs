use std::collections::HashMap;

use crate::model::{ContainerId, NodeId};

/// Last known coordinates per node, scoped to one container.
#[derive(Debug, Clone, Default)]
pub struct PositionCache {
    container: Option<ContainerId>,
    positions: HashMap<NodeId, (f32, f32)>,
}

impl PositionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    /// Rebinds the cache to `container`. Coordinates from another topic are
    /// meaningless, so a different container wipes every entry. Returns true
    /// when the cache was cleared.
    pub fn bind(&mut self, container: &str) -> bool {
        if self.container.as_deref() == Some(container) {
            return false;
        }
        let dropped = self.positions.len();
        self.positions.clear();
        self.container = Some(container.to_string());
        if dropped > 0 {
            tracing::debug!(container, dropped, "position cache cleared on container switch");
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<(f32, f32)> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn insert(&mut self, id: &str, pos: (f32, f32)) {
        if !pos.0.is_finite() || !pos.1.is_finite() {
            return;
        }
        match self.positions.get_mut(id) {
            Some(slot) => *slot = pos,
            None => {
                self.positions.insert(id.to_string(), pos);
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.positions.remove(id).is_some()
    }

    pub fn remove_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) -> usize {
        ids.into_iter().filter(|id| self.remove(id)).count()
    }

    /// Drops entries whose node is gone. Returns how many were dropped.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) -> usize {
        let before = self.positions.len();
        self.positions.retain(|id, _| keep(id));
        before - self.positions.len()
    }

    /// Copies live coordinates in. Used both before a re-render tears down the
    /// running simulation and after every simulation step.
    pub fn capture<'a>(&mut self, live: impl IntoIterator<Item = (&'a str, (f32, f32))>) {
        for (id, pos) in live {
            self.insert(id, pos);
        }
    }

    /// Centroid of the cached positions among `ids`, if any are cached.
    pub fn centroid<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Option<(f32, f32)> {
        let mut sum = (0.0f32, 0.0f32);
        let mut count = 0usize;
        for id in ids {
            if let Some((x, y)) = self.get(id) {
                sum.0 += x;
                sum.1 += y;
                count += 1;
            }
        }
        if count == 0 {
            return None;
        }
        Some((sum.0 / count as f32, sum.1 / count as f32))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}
