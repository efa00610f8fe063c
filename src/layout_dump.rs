use crate::layout::Frame;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub container: Option<String>,
    pub width: f32,
    pub height: f32,
    pub alpha: f32,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub title: String,
    pub class: &'static str,
    pub state: &'static str,
    pub maturity: u8,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub pinned: bool,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub relation: String,
    pub selected: bool,
    /// Start, control and end point of the quadratic curve.
    pub points: Vec<[f32; 2]>,
    pub label: [f32; 2],
}

impl LayoutDump {
    pub fn from_frame(frame: &Frame, container: Option<&str>) -> Self {
        let nodes = frame
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                title: node.title.clone(),
                class: node.class.as_str(),
                state: node.state.as_str(),
                maturity: node.maturity,
                x: node.x,
                y: node.y,
                radius: node.radius,
                pinned: node.pinned,
            })
            .collect();

        let edges = frame
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                from: edge.from.clone(),
                to: edge.to.clone(),
                relation: edge.relation.clone(),
                selected: edge.selected,
                points: [edge.curve.start, edge.curve.control, edge.curve.end]
                    .iter()
                    .map(|(x, y)| [*x, *y])
                    .collect(),
                label: [edge.label_anchor.0, edge.label_anchor.1],
            })
            .collect();

        LayoutDump {
            container: container.map(str::to_string),
            width: frame.width,
            height: frame.height,
            alpha: frame.alpha,
            nodes,
            edges,
        }
    }
}

/// Writes the dump to `path`, or to stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, frame: &Frame, container: Option<&str>) -> anyhow::Result<()> {
    let dump = LayoutDump::from_frame(frame, container);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &dump)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
