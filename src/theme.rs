use crate::model::NodeState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatePalette {
    pub explore: String,
    pub build: String,
    pub active: String,
    pub stale: String,
    pub conflicted: String,
    pub archived: String,
}

impl StatePalette {
    pub fn fill(&self, state: NodeState) -> &str {
        match state {
            NodeState::Explore => &self.explore,
            NodeState::Build => &self.build,
            NodeState::Active => &self.active,
            NodeState::Stale => &self.stale,
            NodeState::Conflicted => &self.conflicted,
            NodeState::Archived => &self.archived,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub background: String,
    pub states: StatePalette,
    pub text_color: String,
    pub root_stroke: String,
    pub sub_stroke: String,
    pub root_stroke_width: f32,
    pub sub_stroke_width: f32,
    pub edge_color: String,
    pub edge_selected_color: String,
    pub edge_label_color: String,
    pub edge_label_background: String,
}

impl Theme {
    pub fn default_palette() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            states: StatePalette {
                explore: "#E8F0FE".to_string(),
                build: "#FFF4DC".to_string(),
                active: "#E3F7E8".to_string(),
                stale: "#EEEEEE".to_string(),
                conflicted: "#FDE2E1".to_string(),
                archived: "#F5F5F5".to_string(),
            },
            text_color: "#1C2430".to_string(),
            root_stroke: "#3D5AFE".to_string(),
            sub_stroke: "#9AA7C0".to_string(),
            root_stroke_width: 2.2,
            sub_stroke_width: 1.2,
            edge_color: "#7A8AA6".to_string(),
            edge_selected_color: "#FF6D00".to_string(),
            edge_label_color: "#4A5568".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: "#13171D".to_string(),
            states: StatePalette {
                explore: "#1E2A44".to_string(),
                build: "#3A2F18".to_string(),
                active: "#18352A".to_string(),
                stale: "#2A2D33".to_string(),
                conflicted: "#45201F".to_string(),
                archived: "#202226".to_string(),
            },
            text_color: "#E6EAF2".to_string(),
            root_stroke: "#8C9EFF".to_string(),
            sub_stroke: "#4B5568".to_string(),
            root_stroke_width: 2.2,
            sub_stroke_width: 1.2,
            edge_color: "#5C6B85".to_string(),
            edge_selected_color: "#FFAB40".to_string(),
            edge_label_color: "#B8C2D6".to_string(),
            edge_label_background: "#13171D".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_palette()
    }
}
