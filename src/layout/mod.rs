pub mod cache;
pub mod geometry;
pub mod placement;
pub mod simulation;
pub mod sync;
pub(crate) mod types;

pub use cache::PositionCache;
pub use geometry::{curve_to_path, edge_curve};
pub use placement::{PlacedNode, Placement, StartRegime, WarmStart, known_ratio, place_nodes};
pub use simulation::{SimNode, Simulation, collision_radius};
pub use sync::LayoutDriver;
pub use types::*;
