//! Simulation configuration.
//!
//! Loaded from YAML with per-section defaults: a missing key or a missing
//! whole section falls back to its documented default instead of failing,
//! so a partial config file is always usable.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::agent::Species;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub world: WorldConfig,
    pub population: PopulationConfig,
    pub simulation: SimulationConfig,
    pub spawn: SpawnConfig,
    pub environment: EnvironmentConfig,
    pub logging: LoggingConfig,
}

/// World bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

/// Population cap and initial composition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Hard cap enforced every tick.
    pub max_organisms: usize,
    pub initial_bacteria: usize,
    pub initial_viruses: usize,
    pub initial_immune_cells: usize,
    pub initial_body_cells: usize,
    /// Offspring per viral burst when an infected host dies.
    pub viral_burst_count: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            max_organisms: 800,
            initial_bacteria: 30,
            initial_viruses: 10,
            initial_immune_cells: 15,
            initial_body_cells: 60,
            viral_burst_count: 5,
        }
    }
}

/// Tunables read by agent behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Per-reproduction chance of a single-base genome mutation.
    pub mutation_rate: f32,
    /// Extra contact slack added to `size_a + size_b` in the pairwise pass.
    pub interaction_radius: f32,
    /// Weight jitter applied when offspring inherit a decision policy.
    pub policy_jitter: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            mutation_rate: 0.05,
            interaction_radius: 10.0,
            policy_jitter: 0.1,
        }
    }
}

/// Periodic agent injection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnConfig {
    /// Ticks between injection waves; 0 disables injection.
    pub interval: u64,
    /// Agents per wave.
    pub count: usize,
    /// Species drawn round-robin each wave.
    pub species: Vec<Species>,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            interval: 100,
            count: 3,
            species: vec![Species::EColi, Species::Influenza, Species::Neutrophil],
        }
    }
}

/// Scalar-field generation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub base_temperature: f32,
    pub base_ph: f32,
    pub nutrient_richness: f32,
    /// Mean flow, also the probability that injected agents enter at an edge.
    pub flow_rate: f32,
    /// Relative per-cell variation applied at field generation.
    pub variation: f32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            base_temperature: 37.0,
            base_ph: 7.4,
            nutrient_richness: 1.0,
            flow_rate: 0.3,
            variation: 0.2,
        }
    }
}

/// Logging and stats cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Ticks between stats snapshots.
    pub stats_interval: u64,
    pub log_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 50,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Check value ranges. Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.world.width <= 0.0 || self.world.height <= 0.0 {
            return Err("world dimensions must be positive".to_string());
        }
        if self.population.max_organisms == 0 {
            return Err("max_organisms must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.simulation.mutation_rate) {
            return Err("mutation_rate must be in [0, 1]".to_string());
        }
        if self.simulation.interaction_radius < 0.0 {
            return Err("interaction_radius must be non-negative".to_string());
        }
        if !(0.0..=1.0).contains(&self.environment.flow_rate) {
            return Err("flow_rate must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.environment.variation) {
            return Err("variation must be in [0, 1]".to_string());
        }
        if self.spawn.interval > 0 && self.spawn.species.is_empty() {
            return Err("spawn.species must not be empty when spawning is enabled".to_string());
        }
        let initial = self.population.initial_bacteria
            + self.population.initial_viruses
            + self.population.initial_immune_cells
            + self.population.initial_body_cells;
        if initial > self.population.max_organisms {
            return Err(format!(
                "initial population {} exceeds max_organisms {}",
                initial, self.population.max_organisms
            ));
        }
        Ok(())
    }
}
