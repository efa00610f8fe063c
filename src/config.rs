use crate::model::NodeState;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

const FALLBACK_NODE_TYPES: [&str; 7] = [
    "ONTOLOGY",
    "MECHANISM",
    "DOMAIN",
    "ACTION",
    "ASSUMPTION",
    "CONTRADICTION",
    "PREDICTION",
];

const FALLBACK_RELATION_TYPES: [&str; 10] = [
    "FOUNDATION_OF",
    "INSTANCE_OF",
    "REQUIRES",
    "CAUSES",
    "AMPLIFIES",
    "INHIBITS",
    "CONTRADICTS",
    "EXAMPLE_OF",
    "PART_OF",
    "APPLIES_TO",
];

/// Force simulation and placement tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub ring_radius_min: f32,
    pub ring_radius_max: f32,
    pub warm_ratio_threshold: f32,
    pub warm_alpha: f32,
    pub warm_alpha_decay: f32,
    pub cold_alpha: f32,
    pub cold_alpha_decay: f32,
    pub alpha_min: f32,
    pub velocity_decay: f32,
    pub charge_strength: f32,
    pub charge_distance_min: f32,
    pub link_distance: f32,
    pub link_strength: f32,
    pub cached_pull: f32,
    pub fresh_pull: f32,
    pub root_radius: f32,
    pub sub_radius: f32,
    pub collide_padding: f32,
    pub collide_strength: f32,
    pub drag_alpha_target: f32,
    pub edge_trim_offset: f32,
    pub edge_curvature: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            ring_radius_min: 120.0,
            ring_radius_max: 200.0,
            warm_ratio_threshold: 0.5,
            warm_alpha: 0.3,
            warm_alpha_decay: 0.05,
            cold_alpha: 1.0,
            cold_alpha_decay: 0.0228,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            charge_strength: -320.0,
            charge_distance_min: 1.0,
            link_distance: 140.0,
            link_strength: 0.3,
            cached_pull: 0.15,
            fresh_pull: 0.05,
            root_radius: 44.0,
            sub_radius: 30.0,
            collide_padding: 8.0,
            collide_strength: 0.7,
            drag_alpha_target: 0.3,
            edge_trim_offset: 34.0,
            edge_curvature: 0.12,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ViewportConfig {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            margin: 40.0,
        }
    }
}

impl ViewportConfig {
    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Clamps a point into the viewport minus the margin. Degenerate viewports
    /// collapse onto their center.
    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (
            clamp_axis(x, self.margin, self.width - self.margin),
            clamp_axis(y, self.margin, self.height - self.margin),
        )
    }
}

fn clamp_axis(value: f32, lo: f32, hi: f32) -> f32 {
    if lo > hi {
        return (lo + hi) / 2.0;
    }
    value.clamp(lo, hi)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Number of trailing messages sent along with an explore turn.
    pub history_window: usize,
    pub storage_key: String,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            history_window: 6,
            storage_key: "rks_chat_cache".to_string(),
        }
    }
}

/// Enumerations injected by the host page at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub node_types: Vec<String>,
    pub node_states: Vec<String>,
    pub relation_types: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            node_types: FALLBACK_NODE_TYPES.iter().map(|v| v.to_string()).collect(),
            node_states: NodeState::ALL
                .iter()
                .map(|state| state.as_str().to_string())
                .collect(),
            relation_types: FALLBACK_RELATION_TYPES
                .iter()
                .map(|v| v.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostVocabulary {
    #[serde(alias = "node_types")]
    node_types: Option<Vec<String>>,
    #[serde(alias = "node_states")]
    node_states: Option<Vec<String>>,
    #[serde(alias = "relation_types")]
    relation_types: Option<Vec<String>>,
}

impl Vocabulary {
    /// Parses host-injected enumerations. Anything missing, empty or unreadable
    /// falls back to the built-in lists.
    pub fn from_host_json(input: Option<&str>) -> Self {
        let host = input
            .and_then(|raw| match json5::from_str::<HostVocabulary>(raw) {
                Ok(host) => Some(host),
                Err(err) => {
                    tracing::warn!(%err, "ignoring unreadable host vocabulary");
                    None
                }
            })
            .unwrap_or_default();
        let mut vocabulary = Self::default();
        vocabulary.merge(host);
        vocabulary
    }

    fn merge(&mut self, host: HostVocabulary) {
        if let Some(v) = non_empty(host.node_types) {
            self.node_types = v;
        }
        if let Some(v) = non_empty(host.node_states) {
            self.node_states = v;
        }
        if let Some(v) = non_empty(host.relation_types) {
            self.relation_types = v;
        }
    }

    pub fn is_relation_type(&self, value: &str) -> bool {
        self.relation_types.iter().any(|r| r == value)
    }
}

fn non_empty(values: Option<Vec<String>>) -> Option<Vec<String>> {
    let values: Vec<String> = values?
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() { None } else { Some(values) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub font_family: String,
    pub font_size: f32,
    pub label_font_size: f32,
    pub max_title_chars: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, sans-serif".to_string(),
            font_size: 12.0,
            label_font_size: 10.0,
            max_title_chars: 22,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub viewport: ViewportConfig,
    pub scope: ScopeConfig,
    pub vocabulary: Vocabulary,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    layout: Option<LayoutConfigFile>,
    viewport: Option<ViewportConfigFile>,
    history_window: Option<usize>,
    storage_key: Option<String>,
    node_types: Option<Vec<String>>,
    node_states: Option<Vec<String>>,
    relation_types: Option<Vec<String>>,
    font_family: Option<String>,
    font_size: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    ring_radius_min: Option<f32>,
    ring_radius_max: Option<f32>,
    warm_ratio_threshold: Option<f32>,
    warm_alpha: Option<f32>,
    warm_alpha_decay: Option<f32>,
    cold_alpha: Option<f32>,
    cold_alpha_decay: Option<f32>,
    velocity_decay: Option<f32>,
    charge_strength: Option<f32>,
    link_distance: Option<f32>,
    link_strength: Option<f32>,
    cached_pull: Option<f32>,
    fresh_pull: Option<f32>,
    root_radius: Option<f32>,
    sub_radius: Option<f32>,
    edge_trim_offset: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewportConfigFile {
    width: Option<f32>,
    height: Option<f32>,
    margin: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a camelCase JSON5 override document onto the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "dark" {
            config.theme = Theme::dark();
        } else if theme_name == "default" || theme_name == "light" {
            config.theme = Theme::default_palette();
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.ring_radius_min {
            target.ring_radius_min = v;
        }
        if let Some(v) = layout.ring_radius_max {
            target.ring_radius_max = v;
        }
        if let Some(v) = layout.warm_ratio_threshold {
            target.warm_ratio_threshold = v;
        }
        if let Some(v) = layout.warm_alpha {
            target.warm_alpha = v;
        }
        if let Some(v) = layout.warm_alpha_decay {
            target.warm_alpha_decay = v;
        }
        if let Some(v) = layout.cold_alpha {
            target.cold_alpha = v;
        }
        if let Some(v) = layout.cold_alpha_decay {
            target.cold_alpha_decay = v;
        }
        if let Some(v) = layout.velocity_decay {
            target.velocity_decay = v;
        }
        if let Some(v) = layout.charge_strength {
            target.charge_strength = v;
        }
        if let Some(v) = layout.link_distance {
            target.link_distance = v;
        }
        if let Some(v) = layout.link_strength {
            target.link_strength = v;
        }
        if let Some(v) = layout.cached_pull {
            target.cached_pull = v;
        }
        if let Some(v) = layout.fresh_pull {
            target.fresh_pull = v;
        }
        if let Some(v) = layout.root_radius {
            target.root_radius = v;
        }
        if let Some(v) = layout.sub_radius {
            target.sub_radius = v;
        }
        if let Some(v) = layout.edge_trim_offset {
            target.edge_trim_offset = v;
        }
        if target.ring_radius_max < target.ring_radius_min {
            std::mem::swap(&mut target.ring_radius_min, &mut target.ring_radius_max);
        }
    }

    if let Some(viewport) = parsed.viewport {
        if let Some(v) = viewport.width {
            config.viewport.width = v;
        }
        if let Some(v) = viewport.height {
            config.viewport.height = v;
        }
        if let Some(v) = viewport.margin {
            config.viewport.margin = v;
        }
    }

    if let Some(v) = parsed.history_window {
        config.scope.history_window = v;
    }
    if let Some(v) = parsed.storage_key {
        config.scope.storage_key = v;
    }

    config.vocabulary.merge(HostVocabulary {
        node_types: parsed.node_types,
        node_states: parsed.node_states,
        relation_types: parsed.relation_types,
    });

    if let Some(v) = parsed.font_family {
        config.render.font_family = v;
    }
    if let Some(v) = parsed.font_size {
        config.render.font_size = v;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_falls_back_when_absent() {
        let vocabulary = Vocabulary::from_host_json(None);
        assert_eq!(vocabulary.node_types.len(), 7);
        assert_eq!(vocabulary.node_states.len(), 6);
        assert!(vocabulary.is_relation_type("CAUSES"));
    }

    #[test]
    fn vocabulary_uses_host_lists_and_fills_gaps() {
        let vocabulary =
            Vocabulary::from_host_json(Some(r#"{nodeTypes: ["IDEA"], relation_types: []}"#));
        assert_eq!(vocabulary.node_types, vec!["IDEA".to_string()]);
        assert!(vocabulary.is_relation_type("PART_OF"));
    }

    #[test]
    fn vocabulary_ignores_garbage() {
        let vocabulary = Vocabulary::from_host_json(Some("{{not json"));
        assert_eq!(vocabulary, Vocabulary::default());
    }

    #[test]
    fn parse_config_merges_overrides() {
        let config = parse_config(
            r#"{
                // comments are fine
                theme: "dark",
                layout: { ringRadiusMin: 300, ringRadiusMax: 250, cachedPull: 0.2 },
                viewport: { width: 640 },
                historyWindow: 4,
            }"#,
        )
        .expect("config parses");
        assert_eq!(config.layout.ring_radius_min, 250.0);
        assert_eq!(config.layout.ring_radius_max, 300.0);
        assert_eq!(config.layout.cached_pull, 0.2);
        assert_eq!(config.layout.fresh_pull, 0.05);
        assert_eq!(config.viewport.width, 640.0);
        assert_eq!(config.viewport.height, 800.0);
        assert_eq!(config.scope.history_window, 4);
        assert_eq!(config.theme.background, Theme::dark().background);
    }

    #[test]
    fn viewport_clamp_respects_margin() {
        let viewport = ViewportConfig {
            width: 200.0,
            height: 100.0,
            margin: 10.0,
        };
        assert_eq!(viewport.clamp(-50.0, 500.0), (10.0, 90.0));
        assert_eq!(viewport.clamp(100.0, 50.0), (100.0, 50.0));
        let tiny = ViewportConfig {
            width: 10.0,
            height: 10.0,
            margin: 20.0,
        };
        assert_eq!(tiny.clamp(0.0, 100.0), (5.0, 5.0));
    }
}
