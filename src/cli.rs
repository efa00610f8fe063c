use crate::config::{Config, load_config};
use crate::layout::Frame;
use crate::layout_dump::write_layout_dump;
use crate::model::Snapshot;
use crate::render::{render_svg, write_output_svg};
use crate::scope::MemoryStore;
use crate::session::Session;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "kgc", version, about = "Lay out and render a knowledge-graph snapshot")]
pub struct Args {
    /// Snapshot JSON file ({nodes, edges}). Repeat to apply several in order.
    #[arg(short = 's', long = "snapshot", required = true)]
    pub snapshots: Vec<PathBuf>,

    /// Container id the snapshots belong to
    #[arg(long = "container", default_value = "default")]
    pub container: String,

    /// Simulation ticks to run after each snapshot
    #[arg(short = 't', long = "ticks", default_value_t = 300)]
    pub ticks: usize,

    /// Config file (JSON5, camelCase overrides)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Viewport width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Viewport height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Seed for ring placement
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.viewport.width = width;
    }
    if let Some(height) = args.height {
        config.viewport.height = height;
    }

    let snapshots = args
        .snapshots
        .iter()
        .map(|path| read_snapshot(path))
        .collect::<Result<Vec<_>>>()?;

    let session = simulate(config, &args.container, &snapshots, args.ticks, args.seed);
    let frame = session.frame();

    match args.output_format {
        OutputFormat::Svg => {
            let svg = render_svg(&frame, &session.config().theme, &session.config().render);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&session, &frame, &output)?;
        }
        OutputFormat::Json => {
            write_layout_dump(args.output.as_deref(), &frame, session.container())?;
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    Snapshot::from_json(&content).with_context(|| format!("parsing snapshot {}", path.display()))
}

/// Applies each snapshot in order, letting the simulation run for up to
/// `ticks` frames after each one.
pub fn simulate(
    config: Config,
    container: &str,
    snapshots: &[Snapshot],
    ticks: usize,
    seed: Option<u64>,
) -> Session {
    let store = Box::new(MemoryStore::new());
    let mut session = match seed {
        Some(seed) => Session::with_seed(config, store, seed),
        None => Session::new(config, store),
    };
    session.select_container(container);
    for (idx, snapshot) in snapshots.iter().enumerate() {
        let Some(ticket) = session.request_snapshot() else {
            break;
        };
        session.apply_snapshot(&ticket, snapshot);
        let ran = settle(&mut session, ticks);
        tracing::info!(
            snapshot = idx + 1,
            nodes = session.graph().nodes.len(),
            edges = session.graph().edges.len(),
            ticks = ran,
            "snapshot applied"
        );
    }
    session
}

/// Ticks until the simulation cools down or `max_ticks` is reached.
pub fn settle(session: &mut Session, max_ticks: usize) -> usize {
    let mut ran = 0;
    while ran < max_ticks && session.tick().is_some() {
        ran += 1;
    }
    ran
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(feature = "png")]
fn write_png(session: &Session, frame: &Frame, output: &Path) -> Result<()> {
    let svg = render_svg(frame, &session.config().theme, &session.config().render);
    crate::render::write_output_png(&svg, output, &session.config().render, frame.width, frame.height)
}

#[cfg(not(feature = "png"))]
fn write_png(_session: &Session, _frame: &Frame, _output: &Path) -> Result<()> {
    Err(anyhow::anyhow!("PNG output needs the `png` feature"))
}
