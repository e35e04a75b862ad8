//! The agent model: species taxonomy, vitals, and per-tick local behavior.
//!
//! One [`Agent`] is one organism. Category-specific behavior differences are
//! expressed as tables on [`Species`] and free-standing match arms, not as a
//! type hierarchy; cross-agent references are ids resolved through the world
//! each use, never stored pointers.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::brain::{DecisionPolicy, MlpPolicy, N_INPUTS, N_OUTPUTS};
use crate::config::Config;
use crate::environment::Environment;
use crate::genome::{Genome, Traits};

/// Stable opaque agent identity, unique for the lifetime of a world.
pub type AgentId = u64;

/// Energy soft cap shared by all species.
pub const MAX_ENERGY: f32 = 150.0;

/// Ticks an antibody mark persists before it decays.
pub const MARK_TTL: u32 = 300;

/// Broad behavioral category, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Bacterium,
    Virus,
    Immune,
    Body,
}

/// Concrete species. Determines the trait tables below and which arms of the
/// targeting/interaction logic apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    EColi,
    Streptococcus,
    Staphylococcus,
    Salmonella,
    Beneficial,
    Influenza,
    Rhinovirus,
    Coronavirus,
    Adenovirus,
    Neutrophil,
    Macrophage,
    TCell,
    RedCell,
    Epithelial,
    Platelet,
}

impl Species {
    pub fn category(self) -> Category {
        use Species::*;
        match self {
            EColi | Streptococcus | Staphylococcus | Salmonella | Beneficial => Category::Bacterium,
            Influenza | Rhinovirus | Coronavirus | Adenovirus => Category::Virus,
            Neutrophil | Macrophage | TCell => Category::Immune,
            RedCell | Epithelial | Platelet => Category::Body,
        }
    }

    pub fn base_speed(self) -> f32 {
        use Species::*;
        match self {
            EColi | Streptococcus | Staphylococcus | Salmonella | Beneficial => 1.2,
            Influenza | Rhinovirus | Coronavirus | Adenovirus => 0.8,
            Neutrophil => 1.5,
            Macrophage => 1.2,
            TCell => 1.6,
            RedCell => 0.5,
            Epithelial => 0.1,
            Platelet => 0.6,
        }
    }

    pub fn base_size(self) -> f32 {
        use Species::*;
        match self {
            EColi | Streptococcus | Staphylococcus | Salmonella | Beneficial => 4.0,
            Influenza | Rhinovirus | Coronavirus | Adenovirus => 2.0,
            Neutrophil => 8.0,
            Macrophage => 12.0,
            TCell => 7.0,
            RedCell => 6.0,
            Epithelial => 10.0,
            Platelet => 3.0,
        }
    }

    /// Color hint for the renderer snapshot.
    pub fn color(self) -> [u8; 3] {
        use Species::*;
        match self {
            EColi => [170, 120, 60],
            Streptococcus => [150, 150, 60],
            Staphylococcus => [190, 160, 40],
            Salmonella => [160, 100, 40],
            Beneficial => [100, 180, 100],
            Influenza => [200, 60, 60],
            Rhinovirus => [220, 100, 100],
            Coronavirus => [180, 40, 80],
            Adenovirus => [200, 80, 40],
            Neutrophil => [230, 230, 250],
            Macrophage => [200, 200, 240],
            TCell => [150, 180, 250],
            RedCell => [220, 40, 40],
            Epithelial => [250, 210, 180],
            Platelet => [250, 240, 150],
        }
    }

    /// Body cells clamp to the world bounds; free-moving microbes wrap.
    pub fn wraps(self) -> bool {
        self.category() != Category::Body
    }

    pub fn is_pathogen(self) -> bool {
        matches!(self.category(), Category::Virus) || self.is_harmful_bacterium()
    }

    pub fn is_harmful_bacterium(self) -> bool {
        use Species::*;
        matches!(self, EColi | Streptococcus | Staphylococcus | Salmonella)
    }

    /// Only epithelial tissue regrows by division; red cells and platelets
    /// are replenished by injection instead.
    pub fn can_reproduce(self) -> bool {
        match self.category() {
            Category::Body => self == Species::Epithelial,
            _ => true,
        }
    }

    /// Chance that an infection attempt bounces off this cell.
    pub fn infection_resistance(self) -> f32 {
        match self {
            Species::Epithelial => 0.3,
            _ => 0.2,
        }
    }
}

/// Virus-only state: host reference and antibody marking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirusState {
    /// Infected cell, re-validated by the world every tick before use.
    pub host: Option<AgentId>,
    /// Ticks spent inside the current or most recent host.
    pub dormancy: u32,
    pub replication_cooldown: u32,
    /// Set when the host died while the virus was primed; consumed by the
    /// reproduction phase as a burst.
    pub burst_pending: bool,
    pub marked: bool,
    /// Antibody coverage in [0, 1].
    pub coverage: f32,
    pub marker: Option<AgentId>,
    pub mark_age: u32,
}

/// Macrophage capture pipeline state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngulfState {
    pub target: Option<AgentId>,
    /// 0 → 1 over the engulf duration.
    pub progress: f32,
    pub payload: Vec<AgentId>,
    pub digesting: bool,
    pub digest_timer: u32,
}

/// Immune-cell state: targeting lock, activation, and pathogen memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImmuneState {
    pub target: Option<AgentId>,
    /// Ticks the current lock has been held.
    pub lock_ticks: u32,
    pub activation: f32,
    pub attack_cooldown: u32,
    pub antibody_cooldown: u32,
    /// Previously-seen pathogen ids with remaining TTL.
    pub memory: Vec<(AgentId, u32)>,
    pub engulf: EngulfState,
}

impl ImmuneState {
    /// Record a pathogen id, evicting the oldest entry at capacity.
    pub fn remember(&mut self, id: AgentId, ttl: u32, capacity: usize) {
        if let Some(entry) = self.memory.iter_mut().find(|(m, _)| *m == id) {
            entry.1 = ttl;
            return;
        }
        if self.memory.len() >= capacity {
            self.memory.remove(0);
        }
        self.memory.push((id, ttl));
    }

    pub fn knows(&self, id: AgentId) -> bool {
        self.memory.iter().any(|(m, _)| *m == id)
    }
}

/// Body-cell state: damage tracking, infection, platelet activation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    pub damage: f32,
    pub damaged: bool,
    pub infected_by: Option<AgentId>,
    pub activated: bool,
    pub aggregation: u32,
}

/// Category-specific state, matching [`Category`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpeciesState {
    Bacterium,
    Virus(VirusState),
    Immune(ImmuneState),
    Body(BodyState),
}

/// One simulated organism.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub species: Species,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub base_speed: f32,
    pub size: f32,
    pub energy: f32,
    pub health: f32,
    pub age: u32,
    pub alive: bool,
    pub genome: Genome,
    pub traits: Traits,
    pub policy: MlpPolicy,
    pub state: SpeciesState,
}

/// Failure inside a single agent's update or reproduce call. Logged by the
/// orchestrator; never aborts the tick.
#[derive(Debug)]
pub enum AgentError {
    /// Position or vitals became non-finite, usually a broken policy.
    NonFiniteState { id: AgentId },
    EmptyGenome { id: AgentId },
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFiniteState { id } => write!(f, "agent {} has non-finite state", id),
            Self::EmptyGenome { id } => write!(f, "agent {} has an empty genome", id),
        }
    }
}

impl std::error::Error for AgentError {}

impl Agent {
    /// Factory: build an agent of the given species at a position.
    pub fn spawn(id: AgentId, species: Species, x: f32, y: f32, rng: &mut ChaCha8Rng) -> Self {
        let genome = Genome::random(rng);
        let traits = genome.decode();
        let state = match species.category() {
            Category::Bacterium => SpeciesState::Bacterium,
            Category::Virus => SpeciesState::Virus(VirusState::default()),
            Category::Immune => SpeciesState::Immune(ImmuneState::default()),
            Category::Body => SpeciesState::Body(BodyState::default()),
        };
        Self {
            id,
            species,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            base_speed: species.base_speed(),
            size: species.base_size(),
            energy: 100.0,
            health: 100.0,
            age: 0,
            alive: true,
            genome,
            traits,
            policy: MlpPolicy::random(rng),
            state,
        }
    }

    pub fn category(&self) -> Category {
        self.species.category()
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Child construction shared by every reproduction arm. The world
    /// assigns the real id on admission.
    fn offspring(&self, x: f32, y: f32, rng: &mut ChaCha8Rng, config: &Config) -> Agent {
        let mut genome = self.genome.clone();
        // Surface-drifting viruses mutate faster.
        let rate = match self.category() {
            Category::Virus => (config.simulation.mutation_rate * 2.5).min(1.0),
            _ => config.simulation.mutation_rate,
        };
        genome.mutate(rng, rate);
        let traits = genome.decode();
        let state = match self.category() {
            Category::Bacterium => SpeciesState::Bacterium,
            Category::Virus => SpeciesState::Virus(VirusState::default()),
            Category::Immune => SpeciesState::Immune(ImmuneState::default()),
            Category::Body => SpeciesState::Body(BodyState::default()),
        };
        Agent {
            id: 0,
            species: self.species,
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            base_speed: self.base_speed,
            size: self.size,
            energy: 60.0,
            health: 100.0,
            age: 0,
            alive: true,
            genome,
            traits,
            policy: self.policy.inherit(rng, config.simulation.policy_jitter),
            state,
        }
    }

    /// Inputs for the decision policy: own normalized position and vitals
    /// plus the direction to the current target (zero when idle).
    pub fn sense(&self, target_delta: Option<(f32, f32)>, width: f32, height: f32) -> [f32; N_INPUTS] {
        let (tdx, tdy) = target_delta.unwrap_or((0.0, 0.0));
        [
            self.x / width,
            self.y / height,
            (self.energy / MAX_ENERGY).clamp(0.0, 1.0),
            (self.health / 100.0).clamp(0.0, 1.0),
            (tdx / 200.0).clamp(-1.0, 1.0),
            (tdy / 200.0).clamp(-1.0, 1.0),
        ]
    }

    /// Run the decision policy over current inputs.
    pub fn decide(&self, target_delta: Option<(f32, f32)>, width: f32, height: f32) -> [f32; N_OUTPUTS] {
        self.policy.decide(&self.sense(target_delta, width, height))
    }

    /// Apply a steering vector: set velocity and move, wrapping or clamping
    /// per species.
    pub fn integrate(&mut self, steer: (f32, f32), speed_mul: f32, width: f32, height: f32) {
        let norm = (steer.0 * steer.0 + steer.1 * steer.1).sqrt();
        if norm > 1e-6 {
            let speed = self.base_speed * self.traits.speed * speed_mul;
            self.vx = steer.0 / norm * speed;
            self.vy = steer.1 / norm * speed;
        } else {
            self.vx = 0.0;
            self.vy = 0.0;
        }
        self.x += self.vx;
        self.y += self.vy;
        if self.species.wraps() {
            self.x = self.x.rem_euclid(width);
            self.y = self.y.rem_euclid(height);
        } else {
            self.x = self.x.clamp(self.size, width - self.size);
            self.y = self.y.clamp(self.size, height - self.size);
        }
    }

    /// Category-specific environmental effect. Bacteria feed on local
    /// nutrients and suffer outside their comfort band; body cells ride the
    /// flow field and slowly regenerate. Viruses and immune cells are
    /// handled by their own phases.
    pub fn environment_effect(&mut self, env: &mut Environment, rng: &mut ChaCha8Rng) {
        let conditions = env.conditions_at(self.x, self.y);
        match self.category() {
            Category::Bacterium => {
                let temp = (1.0 - (conditions.temperature - 37.0).abs() / 10.0).clamp(0.0, 1.0);
                let ph = (1.0 - (conditions.ph - 7.0).abs() / 2.5).clamp(0.0, 1.0);
                let food = conditions.nutrients.clamp(0.0, 1.0);
                let suitability = (temp + ph + food) / 3.0;
                let consumed = env.consume_nutrients(self.x, self.y, 0.05 * suitability);
                self.energy = (self.energy + consumed * 10.0).min(MAX_ENERGY);
                if suitability < 0.5 {
                    self.health -= (0.5 - suitability) * 2.0 / self.traits.resilience.max(0.1);
                }
            }
            Category::Body => {
                let push = match self.species {
                    Species::RedCell => 0.8,
                    Species::Platelet => 0.7,
                    _ => 0.0,
                };
                if push > 0.0 {
                    let slowed = if self.activated_platelet() { 0.3 } else { 1.0 };
                    self.x += conditions.flow * push * slowed;
                    self.y += rng.gen_range(-0.2..0.2);
                    self.x = self.x.clamp(self.size, env.width - self.size);
                    self.y = self.y.clamp(self.size, env.height - self.size);
                }
                if let SpeciesState::Body(body) = &mut self.state {
                    if body.damage < 50.0 && self.health < 100.0 {
                        self.health = (self.health + 0.1).min(100.0);
                    }
                }
            }
            Category::Virus | Category::Immune => {}
        }
    }

    /// Age, drain energy, run per-category timers, and settle the alive
    /// flag. Must leave `health <= 0 ⇒ alive == false` true.
    pub fn tick_vitals(&mut self) {
        self.age += 1;
        let drain = match self.category() {
            Category::Bacterium => 0.05,
            Category::Virus => 0.02,
            Category::Immune => 0.05,
            Category::Body => 0.01,
        };
        self.energy -= drain;
        if self.energy <= 0.0 {
            self.energy = 0.0;
            self.health -= 0.5;
        }

        match &mut self.state {
            SpeciesState::Virus(virus) => {
                virus.replication_cooldown = virus.replication_cooldown.saturating_sub(1);
                if virus.marked {
                    virus.mark_age += 1;
                    if virus.mark_age > MARK_TTL {
                        virus.marked = false;
                        virus.coverage = 0.0;
                        virus.marker = None;
                        virus.mark_age = 0;
                    }
                }
            }
            SpeciesState::Immune(immune) => {
                immune.attack_cooldown = immune.attack_cooldown.saturating_sub(1);
                immune.antibody_cooldown = immune.antibody_cooldown.saturating_sub(1);
                immune.activation = (immune.activation - 0.1).max(0.0);
                for entry in &mut immune.memory {
                    entry.1 = entry.1.saturating_sub(1);
                }
                immune.memory.retain(|(_, ttl)| *ttl > 0);
            }
            _ => {}
        }

        if self.health <= 0.0 {
            self.alive = false;
        }
    }

    /// Guard against state corrupted by a faulty policy or interaction.
    pub fn check_integrity(&self) -> Result<(), AgentError> {
        if !(self.x.is_finite() && self.y.is_finite() && self.energy.is_finite() && self.health.is_finite()) {
            return Err(AgentError::NonFiniteState { id: self.id });
        }
        if self.genome.is_empty() {
            return Err(AgentError::EmptyGenome { id: self.id });
        }
        Ok(())
    }

    /// Produce offspring for this tick. May return zero, one, or a viral
    /// burst batch; the scheduler admits them against the slot budget.
    pub fn reproduce(
        &mut self,
        rng: &mut ChaCha8Rng,
        config: &Config,
    ) -> Result<Vec<Agent>, AgentError> {
        self.check_integrity()?;
        let mut offspring = Vec::new();
        match self.category() {
            Category::Bacterium => {
                let chance = 0.04 * self.traits.aggression.min(1.5);
                if self.energy > 80.0 && rng.gen::<f32>() < chance {
                    self.energy -= 50.0;
                    let x = self.x + rng.gen_range(-10.0..10.0);
                    let y = self.y + rng.gen_range(-10.0..10.0);
                    let mut child = self.offspring(x, y, rng, config);
                    child.size = (self.size * 0.8).max(1.0);
                    child.base_speed = (self.base_speed * 0.9).max(0.4);
                    offspring.push(child);
                }
            }
            Category::Immune => {
                if self.energy > 120.0 && rng.gen::<f32>() < 0.01 {
                    self.energy -= 60.0;
                    let x = self.x + rng.gen_range(-12.0..12.0);
                    let y = self.y + rng.gen_range(-12.0..12.0);
                    offspring.push(self.offspring(x, y, rng, config));
                }
            }
            Category::Body => {
                if self.species.can_reproduce() && self.energy > 100.0 && rng.gen::<f32>() < 0.008 {
                    self.energy -= 40.0;
                    let x = self.x + rng.gen_range(-15.0..15.0);
                    let y = self.y + rng.gen_range(-15.0..15.0);
                    offspring.push(self.offspring(x, y, rng, config));
                }
            }
            Category::Virus => {
                let burst = config.population.viral_burst_count;
                let (burst_pending, can_replicate) = match &self.state {
                    SpeciesState::Virus(virus) => (
                        virus.burst_pending,
                        virus.host.is_some()
                            && self.energy > 30.0
                            && virus.replication_cooldown == 0,
                    ),
                    _ => (false, false),
                };
                if burst_pending {
                    if let SpeciesState::Virus(virus) = &mut self.state {
                        virus.burst_pending = false;
                    }
                    for _ in 0..burst {
                        let x = self.x + rng.gen_range(-15.0..15.0);
                        let y = self.y + rng.gen_range(-15.0..15.0);
                        let mut child = self.offspring(x, y, rng, config);
                        child.energy = 100.0;
                        if let SpeciesState::Virus(cv) = &mut child.state {
                            cv.replication_cooldown = 40;
                        }
                        offspring.push(child);
                    }
                } else if can_replicate && rng.gen::<f32>() < 0.1 {
                    if let SpeciesState::Virus(virus) = &mut self.state {
                        virus.replication_cooldown = 40;
                    }
                    self.energy -= 20.0;
                    let x = self.x + rng.gen_range(-10.0..10.0);
                    let y = self.y + rng.gen_range(-10.0..10.0);
                    offspring.push(self.offspring(x, y, rng, config));
                }
            }
        }
        Ok(offspring)
    }

    /// Apply damage and settle the alive flag in the same call, so a kill is
    /// visible to every later reader this tick.
    pub fn take_damage(&mut self, amount: f32) {
        self.health -= amount;
        if let SpeciesState::Body(body) = &mut self.state {
            body.damage += amount;
            body.damaged = true;
        }
        if self.health <= 0.0 {
            self.alive = false;
        }
    }

    fn activated_platelet(&self) -> bool {
        self.species == Species::Platelet
            && matches!(&self.state, SpeciesState::Body(b) if b.activated)
    }

    /// Effective chance an opportunistic immune attack slips past this
    /// agent. Viruses add surface-protein drift to raw evasion.
    pub fn evasion(&self) -> f32 {
        let base = self.traits.evasion;
        match self.category() {
            Category::Virus => (base + self.traits.surface_mutation).min(0.9),
            _ => base,
        }
    }
}
