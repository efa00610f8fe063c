pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod edge_context;
pub mod layout;
pub mod layout_dump;
pub mod model;
pub mod reconcile;
pub mod render;
pub mod scope;
pub mod session;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, load_config};
pub use layout::Frame;
pub use model::{Edge, Node, NodeState, Snapshot};
pub use reconcile::{NodeClass, ReconciledGraph, reconcile};
pub use render::render_svg;
pub use scope::{Message, ScopeCache, ScopeKey};
pub use session::{Channel, Notice, RequestTicket, Session};
