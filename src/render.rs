use crate::config::RenderConfig;
use crate::layout::{EdgeFrame, Frame, NodeFrame, curve_to_path};
use crate::model::MAX_MATURITY;
use crate::reconcile::NodeClass;
use crate::theme::Theme;
use anyhow::Result;
use std::f32::consts::TAU;
use std::path::Path;

/// Approximate glyph advance as a fraction of the font size. Only used to
/// size label backgrounds.
const CHAR_WIDTH_RATIO: f32 = 0.6;

pub fn render_svg(frame: &Frame, theme: &Theme, config: &RenderConfig) -> String {
    let mut svg = String::new();
    let width = frame.width.max(200.0);
    let height = frame.height.max(200.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    for (id, color) in [("arrow", &theme.edge_color), ("arrow-selected", &theme.edge_selected_color)] {
        svg.push_str(&format!(
            "<marker id=\"{id}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{color}\"/></marker>",
        ));
    }
    svg.push_str("</defs>");

    // Selected edge last so it sits above its neighbours.
    let (selected, plain): (Vec<&EdgeFrame>, Vec<&EdgeFrame>) =
        frame.edges.iter().partition(|edge| edge.selected);
    for edge in plain.into_iter().chain(selected) {
        svg.push_str(&edge_svg(edge, theme, config));
    }

    for node in &frame.nodes {
        svg.push_str(&node_svg(node, theme, config));
    }

    svg.push_str("</svg>");
    svg
}

fn edge_svg(edge: &EdgeFrame, theme: &Theme, config: &RenderConfig) -> String {
    let (color, marker, stroke_width) = if edge.selected {
        (theme.edge_selected_color.as_str(), "arrow-selected", 2.4)
    } else {
        (theme.edge_color.as_str(), "arrow", 1.4)
    };
    let mut out = format!(
        "<path class=\"edge\" data-edge-id=\"{}\" d=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"{stroke_width}\" marker-end=\"url(#{marker})\"/>",
        escape_xml(&edge.id),
        curve_to_path(&edge.curve),
    );

    if !edge.relation.is_empty() {
        let (x, y) = edge.label_anchor;
        let label_w = edge.relation.chars().count() as f32 * config.label_font_size * CHAR_WIDTH_RATIO;
        let label_h = config.label_font_size;
        let rect_x = x - label_w / 2.0 - 4.0;
        let rect_y = y - label_h / 2.0 - 3.0;
        out.push_str(&format!(
            "<rect x=\"{rect_x:.2}\" y=\"{rect_y:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" opacity=\"0.85\"/>",
            label_w + 8.0,
            label_h + 6.0,
            theme.edge_label_background
        ));
        out.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            y + label_h * 0.35,
            escape_xml(&config.font_family),
            config.label_font_size,
            theme.edge_label_color,
            escape_xml(&edge.relation)
        ));
    }
    out
}

fn node_svg(node: &NodeFrame, theme: &Theme, config: &RenderConfig) -> String {
    let (stroke, stroke_width) = match node.class {
        NodeClass::Root => (theme.root_stroke.as_str(), theme.root_stroke_width),
        NodeClass::Sub => (theme.sub_stroke.as_str(), theme.sub_stroke_width),
    };
    let mut out = format!(
        "<g class=\"node node-{}\" data-node-id=\"{}\">",
        node.class.as_str(),
        escape_xml(&node.id)
    );
    out.push_str(&format!(
        "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"/>",
        node.x,
        node.y,
        node.radius,
        theme.states.fill(node.state)
    ));

    // Maturity as a partial ring just inside the outline.
    if node.maturity > 0 {
        let r = (node.radius - 4.0).max(1.0);
        let circumference = TAU * r;
        let filled = circumference * f32::from(node.maturity) / f32::from(MAX_MATURITY);
        out.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{r:.2}\" fill=\"none\" stroke=\"{stroke}\" stroke-width=\"2\" stroke-dasharray=\"{filled:.2} {circumference:.2}\" transform=\"rotate(-90 {:.2} {:.2})\" opacity=\"0.6\"/>",
            node.x, node.y, node.x, node.y
        ));
    }

    out.push_str(&format!(
        "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
        node.x,
        node.y + node.radius + config.font_size + 2.0,
        escape_xml(&config.font_family),
        config.font_size,
        theme.text_color,
        escape_xml(&truncate(&node.title, config.max_title_chars))
    ));
    out.push_str("</g>");
    out
}

fn truncate(title: &str, max_chars: usize) -> String {
    if max_chars == 0 || title.chars().count() <= max_chars {
        return title.to_string();
    }
    let mut out: String = title.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, config: &RenderConfig, width: f32, height: f32) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = config.font_family.clone();
    opt.default_size = usvg::Size::from_wh(width, height)
        .ok_or_else(|| anyhow::anyhow!("invalid canvas size {width}x{height}"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::EdgeCurve;
    use crate::model::NodeState;

    fn node(id: &str, title: &str, class: NodeClass, x: f32) -> NodeFrame {
        NodeFrame {
            id: id.to_string(),
            title: title.to_string(),
            state: NodeState::Explore,
            maturity: 3,
            class,
            x,
            y: 100.0,
            radius: 30.0,
            pinned: false,
        }
    }

    fn frame(selected: bool) -> Frame {
        let curve = EdgeCurve {
            start: (130.0, 100.0),
            control: (200.0, 80.0),
            end: (270.0, 100.0),
        };
        Frame {
            width: 400.0,
            height: 300.0,
            alpha: 0.2,
            nodes: vec![
                node("A", "Alpha & Omega", NodeClass::Root, 100.0),
                node("B", "Beta", NodeClass::Sub, 300.0),
            ],
            edges: vec![EdgeFrame {
                id: "e1".to_string(),
                from: "A".to_string(),
                to: "B".to_string(),
                relation: "CAUSES".to_string(),
                label_anchor: curve.midpoint(),
                curve,
                selected,
            }],
        }
    }

    #[test]
    fn render_svg_basic() {
        let svg = render_svg(&frame(false), &Theme::default(), &RenderConfig::default());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Alpha &amp; Omega"));
        assert!(svg.contains("CAUSES"));
        assert!(svg.contains("M 130.00 100.00 Q"));
        assert!(svg.contains("node-root"));
        assert!(svg.contains("node-sub"));
    }

    #[test]
    fn selected_edge_uses_highlight() {
        let theme = Theme::default();
        let svg = render_svg(&frame(true), &theme, &RenderConfig::default());
        assert!(svg.contains(&format!("stroke=\"{}\"", theme.edge_selected_color)));
        assert!(svg.contains("url(#arrow-selected)"));
    }

    #[test]
    fn long_titles_are_truncated() {
        assert_eq!(truncate("short", 22), "short");
        let long = truncate("a very long title that keeps going", 10);
        assert_eq!(long.chars().count(), 10);
        assert!(long.ends_with('…'));
    }
}
