//! Stable public view of the live population for renderers and persistence.
//!
//! Only the fields listed here are stable across versions; internal
//! state-machine fields are deliberately absent.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, Category, Species, SpeciesState};
use crate::world::World;

/// Public fields of one live agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub category: Category,
    pub species: Species,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: [u8; 3],
    pub energy: f32,
    pub health: f32,
    pub target: Option<AgentId>,
}

impl AgentSnapshot {
    fn of(agent: &Agent) -> Self {
        let target = match &agent.state {
            SpeciesState::Immune(immune) => immune.target,
            _ => None,
        };
        Self {
            id: agent.id,
            category: agent.category(),
            species: agent.species,
            x: agent.x,
            y: agent.y,
            size: agent.size,
            color: agent.species.color(),
            energy: agent.energy,
            health: agent.health,
            target,
        }
    }
}

/// Snapshot of the whole world at one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub time: u64,
    pub width: f32,
    pub height: f32,
    pub agents: Vec<AgentSnapshot>,
}

impl WorldSnapshot {
    /// Capture all live agents.
    pub fn capture(world: &World) -> Self {
        Self {
            time: world.time,
            width: world.config.world.width,
            height: world.config.world.height,
            agents: world
                .agents
                .iter()
                .filter(|a| a.alive)
                .map(AgentSnapshot::of)
                .collect(),
        }
    }
}
