//! microcosm — agent-based 2D microbial ecosystem simulation engine.
//!
//! Bacteria, viruses, immune cells and body cells move, compete, reproduce
//! and die inside a bounded world with spatially-varying conditions. The
//! engine is a fixed eight-phase tick pipeline over a flat agent arena:
//! environment update, per-agent local update, spatial-index rebuild,
//! targeting scan, pairwise interaction, slot-budgeted reproduction, dead
//! sweep, and population-cap enforcement.
//!
//! Cross-agent relations (virus hosts, predator targets, engulf payloads)
//! are ids re-resolved through the world every use; a failed resolution
//! reads as "no reference", never as an error.

pub mod agent;
pub mod brain;
pub mod config;
pub mod environment;
pub mod genome;
pub mod grid;
pub mod interact;
pub mod snapshot;
pub mod stats;
pub mod targeting;
pub mod treatment;
pub mod world;

pub use agent::{Agent, AgentId, Category, Species};
pub use config::Config;
pub use environment::Environment;
pub use grid::SpatialIndex;
pub use snapshot::WorldSnapshot;
pub use stats::{Stats, StatsHistory};
pub use treatment::{Treatment, TreatmentKind};
pub use world::World;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build a seeded world and run it for `ticks`.
pub fn run_simulation(config: Config, seed: u64, ticks: u64) -> World {
    let mut world = World::new_with_seed(config, seed);
    world.run(ticks);
    world
}
