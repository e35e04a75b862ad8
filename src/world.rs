//! The world: agent arena, tick orchestration, spawning, reproduction
//! scheduling, and population-cap enforcement.
//!
//! Every tick runs the same eight phases in order: environment update,
//! per-agent local update, spatial-index rebuild, targeting scan, pairwise
//! interaction, reproduction, dead sweep, cap enforcement. Cross-agent
//! references are ids resolved through `index_by_id`, which is only valid
//! while the arena is not mutated; it is rebuilt after every phase that adds
//! or removes agents.

use std::cmp::Ordering;
use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::agent::{Agent, AgentId, Category, Species, SpeciesState, MAX_ENERGY};
use crate::config::Config;
use crate::environment::Environment;
use crate::grid::{toroidal_delta, SpatialIndex, CELL_SIZE};
use crate::interact::{self, pair_mut};
use crate::stats::{Stats, StatsHistory, TickEvents};
use crate::targeting;
use crate::treatment::{Treatment, TreatmentKind};

/// Damage an embedded virus deals its host per tick, before traits.
const VIRULENCE: f32 = 0.8;
/// Dormancy a virus needs before a host death triggers a burst.
const BURST_DORMANCY: u32 = 10;
/// Energy a virus needs to burst.
const BURST_ENERGY: f32 = 40.0;
/// Damaged neighbors that flip a platelet to its activated state.
const PLATELET_TRIGGER: usize = 3;

pub struct World {
    pub config: Config,
    pub agents: Vec<Agent>,
    pub environment: Environment,
    pub spatial_index: SpatialIndex,
    pub stats: Stats,
    pub stats_history: StatsHistory,
    pub time: u64,
    index_by_id: HashMap<AgentId, usize>,
    next_agent_id: AgentId,
    rng: ChaCha8Rng,
    seed: u64,
    events: TickEvents,
    spawn_cursor: usize,
    treatments: Vec<Treatment>,
}

impl World {
    pub fn new(config: Config) -> Self {
        let seed = rand::thread_rng().gen();
        Self::new_with_seed(config, seed)
    }

    pub fn new_with_seed(config: Config, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let width = config.world.width;
        let height = config.world.height;
        let environment = Environment::new(&config.environment, width, height, &mut rng);
        let mut world = Self {
            spatial_index: SpatialIndex::new(width, height, CELL_SIZE),
            environment,
            config,
            agents: Vec::new(),
            stats: Stats::default(),
            stats_history: StatsHistory::new(),
            time: 0,
            index_by_id: HashMap::new(),
            next_agent_id: 1,
            rng,
            seed,
            events: TickEvents::default(),
            spawn_cursor: 0,
            treatments: Vec::new(),
        };
        world.populate();
        world.spatial_index.rebuild(&world.agents);
        world.rebuild_id_index();
        world
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Live agent count. Outside a tick the arena holds only live agents.
    pub fn population(&self) -> usize {
        self.agents.iter().filter(|a| a.alive).count()
    }

    pub fn population_of(&self, category: Category) -> usize {
        self.agents
            .iter()
            .filter(|a| a.alive && a.category() == category)
            .count()
    }

    pub fn is_extinct(&self) -> bool {
        self.agents.is_empty()
    }

    fn alloc_id(&mut self) -> AgentId {
        let id = self.next_agent_id;
        self.next_agent_id += 1;
        id
    }

    /// Resolve an id to a live arena index. Absence means "no such agent"
    /// and is never an error.
    pub fn lookup(&self, id: AgentId) -> Option<usize> {
        self.index_by_id
            .get(&id)
            .copied()
            .filter(|&idx| self.agents[idx].id == id && self.agents[idx].alive)
    }

    fn rebuild_id_index(&mut self) {
        self.index_by_id.clear();
        for (idx, agent) in self.agents.iter().enumerate() {
            self.index_by_id.insert(agent.id, idx);
        }
    }

    fn populate(&mut self) {
        let bacteria = [
            Species::EColi,
            Species::Streptococcus,
            Species::Staphylococcus,
            Species::Salmonella,
            Species::Beneficial,
        ];
        let viruses = [
            Species::Influenza,
            Species::Rhinovirus,
            Species::Coronavirus,
            Species::Adenovirus,
        ];
        let immune = [Species::Neutrophil, Species::Macrophage, Species::TCell];

        let counts = self.config.population.clone();
        for _ in 0..counts.initial_bacteria {
            let species = bacteria[self.rng.gen_range(0..bacteria.len())];
            self.spawn_at_random(species);
        }
        for _ in 0..counts.initial_viruses {
            let species = viruses[self.rng.gen_range(0..viruses.len())];
            self.spawn_at_random(species);
        }
        for _ in 0..counts.initial_immune_cells {
            let species = immune[self.rng.gen_range(0..immune.len())];
            self.spawn_at_random(species);
        }
        for _ in 0..counts.initial_body_cells {
            let species = match self.rng.gen_range(0..10) {
                0..=4 => Species::RedCell,
                5..=7 => Species::Epithelial,
                _ => Species::Platelet,
            };
            self.spawn_at_random(species);
        }
    }

    fn spawn_at_random(&mut self, species: Species) {
        let x = self.rng.gen_range(0.0..self.config.world.width);
        let y = self.rng.gen_range(0.0..self.config.world.height);
        let id = self.alloc_id();
        self.agents.push(Agent::spawn(id, species, x, y, &mut self.rng));
    }

    /// Advance the simulation by one tick.
    pub fn step(&mut self) {
        self.time += 1;
        self.events = TickEvents::default();

        // 1. Environment tick, then any active treatment courses.
        self.environment.update();
        self.apply_treatments();

        // 2. Local agent update.
        self.update_agents();

        // 3. Spatial index rebuild; id index is still valid (no arena
        // mutation since last rebuild) but positions moved.
        self.spatial_index.rebuild(&self.agents);

        // 4. Scans: platelet activation, then predator targeting.
        self.activate_platelets();
        let outcomes = targeting::scan_phase(
            &self.agents,
            &self.spatial_index,
            self.config.world.width,
            self.config.world.height,
        );
        let scan_events = targeting::apply_scan(&mut self.agents, &outcomes);
        self.events.marks += scan_events.marks;

        // 5. Pairwise interaction resolution.
        let interaction_events = interact::resolve_interactions(
            &mut self.agents,
            &self.spatial_index,
            self.config.world.width,
            self.config.world.height,
            &self.config,
            &mut self.rng,
        );
        self.events.attacks += interaction_events.attacks;
        self.events.kills += interaction_events.kills;
        self.events.infections += interaction_events.infections;
        self.events.engulf_starts += interaction_events.engulf_starts;

        // 6. Reproduction and periodic injection, both slot-budgeted.
        self.handle_reproduction();
        self.spawn_wave();
        self.rebuild_id_index();

        // 7. Dead sweep.
        self.remove_dead();

        // 8. Population cap.
        self.enforce_population_cap();
        self.rebuild_id_index();

        self.record_stats();
    }

    /// Run many ticks.
    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
            if self.is_extinct() {
                log::info!("population extinct at tick {}", self.time);
                break;
            }
        }
    }

    /// Phase 2: decisions in parallel over an immutable view, then a
    /// sequential pass applying movement, environment effects and vitals.
    fn update_agents(&mut self) {
        let width = self.config.world.width;
        let height = self.config.world.height;
        let time = self.time;

        let deltas: Vec<Option<(f32, f32)>> = self
            .agents
            .iter()
            .map(|agent| self.chase_delta(agent, width, height))
            .collect();
        let decisions: Vec<[f32; 2]> = self
            .agents
            .par_iter()
            .zip(deltas.par_iter())
            .map(|(agent, delta)| agent.decide(*delta, width, height))
            .collect();

        for idx in 0..self.agents.len() {
            if !self.agents[idx].alive {
                continue;
            }
            let decision = decisions[idx];
            match self.agents[idx].category() {
                Category::Virus => self.update_virus(idx, decision, width, height),
                Category::Immune => self.update_immune(idx, decision, width, height),
                Category::Body => {
                    self.validate_infection(idx);
                    self.agents[idx].integrate((decision[0], decision[1]), 1.0, width, height)
                }
                Category::Bacterium => {
                    self.agents[idx].integrate((decision[0], decision[1]), 1.0, width, height)
                }
            }

            let World {
                agents,
                environment,
                rng,
                ..
            } = self;
            let agent = &mut agents[idx];
            agent.environment_effect(environment, rng);
            agent.tick_vitals();
            if let Err(err) = agent.check_integrity() {
                log::warn!("tick {}: dropping agent: {}", time, err);
                agent.x = 0.0;
                agent.y = 0.0;
                agent.health = 0.0;
                agent.alive = false;
            }
        }
    }

    /// Direction to the locked target for the decision inputs, if any.
    fn chase_delta(&self, agent: &Agent, width: f32, height: f32) -> Option<(f32, f32)> {
        let target_id = match &agent.state {
            SpeciesState::Immune(immune) => immune.target?,
            _ => return None,
        };
        let tidx = self.lookup(target_id)?;
        let target = &self.agents[tidx];
        Some(toroidal_delta(agent.x, agent.y, target.x, target.y, width, height))
    }

    /// Virus local update: ride and drain the host, or drift freely. A host
    /// found dead (or missing) primes a burst if the virus is ready, and the
    /// reference is cleared before anyone dereferences it again.
    fn update_virus(&mut self, idx: usize, decision: [f32; 2], width: f32, height: f32) {
        let host_id = match &self.agents[idx].state {
            SpeciesState::Virus(virus) => virus.host,
            _ => None,
        };
        let Some(host_id) = host_id else {
            self.agents[idx].integrate((decision[0], decision[1]), 1.0, width, height);
            return;
        };
        let hidx = self
            .index_by_id
            .get(&host_id)
            .copied()
            .filter(|&h| h != idx && self.agents[h].id == host_id && self.agents[h].alive);
        match hidx {
            Some(h) => {
                let (virus, host) = pair_mut(&mut self.agents, idx, h);
                let virulence = VIRULENCE * virus.traits.aggression;
                host.take_damage(virulence);
                virus.energy = (virus.energy + virulence * 5.0).min(MAX_ENERGY);
                virus.x = host.x;
                virus.y = host.y;
                virus.vx = 0.0;
                virus.vy = 0.0;
                let energy = virus.energy;
                let host_alive = host.alive;
                if let SpeciesState::Virus(state) = &mut virus.state {
                    state.dormancy += 1;
                    if !host_alive {
                        if state.dormancy > BURST_DORMANCY && energy > BURST_ENERGY {
                            state.burst_pending = true;
                        }
                        state.host = None;
                    }
                }
                if !host_alive {
                    if let SpeciesState::Body(body) = &mut self.agents[h].state {
                        body.infected_by = None;
                    }
                }
            }
            None => {
                let energy = self.agents[idx].energy;
                if let SpeciesState::Virus(state) = &mut self.agents[idx].state {
                    if state.dormancy > BURST_DORMANCY && energy > BURST_ENERGY {
                        state.burst_pending = true;
                    }
                    state.host = None;
                }
            }
        }
    }

    /// Immune local update: engulf progression, digestion, then movement
    /// with pursuit bias while locked.
    fn update_immune(&mut self, idx: usize, decision: [f32; 2], width: f32, height: f32) {
        let engulf_target = match &self.agents[idx].state {
            SpeciesState::Immune(immune) => immune.engulf.target,
            _ => None,
        };
        if let Some(tid) = engulf_target {
            let tidx = self
                .index_by_id
                .get(&tid)
                .copied()
                .filter(|&t| t != idx && self.agents[t].id == tid && self.agents[t].alive);
            match tidx {
                Some(t) => {
                    let (pred, prey) = pair_mut(&mut self.agents, idx, t);
                    if targeting::advance_engulf(pred, prey, width, height) {
                        self.events.kills += 1;
                    }
                }
                None => {
                    if let SpeciesState::Immune(immune) = &mut self.agents[idx].state {
                        immune.engulf.target = None;
                        immune.engulf.progress = 0.0;
                    }
                }
            }
        }
        self.events.digested += targeting::advance_digestion(&mut self.agents[idx]) as u32;

        let digesting = matches!(
            &self.agents[idx].state,
            SpeciesState::Immune(immune) if immune.engulf.digesting
        );
        let speed_base = if digesting { targeting::DIGEST_SPEED } else { 1.0 };

        let target_id = match &self.agents[idx].state {
            SpeciesState::Immune(immune) => immune.target,
            _ => None,
        };
        let chase = target_id
            .and_then(|tid| {
                self.index_by_id
                    .get(&tid)
                    .copied()
                    .filter(|&t| t != idx && self.agents[t].id == tid && self.agents[t].alive)
            })
            .map(|t| {
                let (dx, dy) = toroidal_delta(
                    self.agents[idx].x,
                    self.agents[idx].y,
                    self.agents[t].x,
                    self.agents[t].y,
                    width,
                    height,
                );
                (t, dx, dy, (dx * dx + dy * dy).sqrt())
            });
        match chase {
            Some((t, dx, dy, dist)) => {
                let p = targeting::profile(self.agents[idx].species);
                let steer = targeting::pursuit_steer(decision, dx, dy);
                let mul =
                    targeting::pursuit_speed(&self.agents[idx], &self.agents[t], dist, &p)
                        * speed_base;
                self.agents[idx].integrate(steer, mul, width, height);
            }
            None => {
                self.agents[idx].integrate((decision[0], decision[1]), speed_base, width, height)
            }
        }
    }

    /// Clear a body cell's infection back-reference once the virus is gone.
    /// The virus side clears `host` itself; the cell cannot, so the world
    /// re-validates for it.
    fn validate_infection(&mut self, idx: usize) {
        let infected_by = match &self.agents[idx].state {
            SpeciesState::Body(body) => body.infected_by,
            _ => return,
        };
        let Some(virus_id) = infected_by else { return };
        let gone = self
            .index_by_id
            .get(&virus_id)
            .map_or(true, |&v| self.agents[v].id != virus_id || !self.agents[v].alive);
        if gone {
            if let SpeciesState::Body(body) = &mut self.agents[idx].state {
                body.infected_by = None;
            }
        }
    }

    /// Platelets activate when enough damaged tissue surrounds them, and
    /// note how many activated peers they can aggregate with. Read pass over
    /// the fresh index, then apply.
    fn activate_platelets(&mut self) {
        let mut updates = Vec::new();
        for (idx, agent) in self.agents.iter().enumerate() {
            if !agent.alive || agent.species != Species::Platelet {
                continue;
            }
            let neighbors = self.spatial_index.neighbors_of(agent.x, agent.y);
            let mut damaged = 0;
            let mut peers = 0;
            for &j in &neighbors {
                if j == idx || !self.agents[j].alive {
                    continue;
                }
                match &self.agents[j].state {
                    SpeciesState::Body(body) if body.damaged => {
                        damaged += 1;
                        if self.agents[j].species == Species::Platelet && body.activated {
                            peers += 1;
                        }
                    }
                    SpeciesState::Body(body)
                        if self.agents[j].species == Species::Platelet && body.activated =>
                    {
                        peers += 1;
                    }
                    _ => {}
                }
            }
            if damaged >= PLATELET_TRIGGER {
                updates.push((idx, peers));
            }
        }
        for (idx, peers) in updates {
            if let SpeciesState::Body(body) = &mut self.agents[idx].state {
                body.activated = true;
                body.aggregation = peers as u32;
            }
        }
    }

    /// Start a treatment course. Effects apply once per tick from the next
    /// `step()` until the course expires.
    pub fn administer(&mut self, treatment: Treatment) {
        log::info!(
            "tick {}: administering {:?} (strength {:.2}, {} ticks)",
            self.time,
            treatment.kind,
            treatment.strength,
            treatment.duration
        );
        self.treatments.push(treatment);
    }

    /// Treatment courses currently running.
    pub fn treatments(&self) -> &[Treatment] {
        &self.treatments
    }

    /// Apply every active course once, then drop the expired ones.
    fn apply_treatments(&mut self) {
        if self.treatments.is_empty() {
            return;
        }
        let mut treatments = std::mem::take(&mut self.treatments);
        for t in &mut treatments {
            if t.remaining == 0 {
                continue;
            }
            match t.kind {
                TreatmentKind::Antibiotic => self.apply_antibiotic(t.strength),
                TreatmentKind::Antiviral => self.apply_antiviral(t.strength),
                TreatmentKind::Probiotic => self.apply_probiotic(t),
                TreatmentKind::Immunization => self.apply_immunization(t),
            }
            t.remaining -= 1;
        }
        treatments.retain(|t| t.remaining > 0);
        self.treatments = treatments;
    }

    /// Antibiotic: chip away at every bacterium, with an outright kill roll
    /// and an energy penalty that suppresses division. Resilient genomes
    /// resist.
    fn apply_antibiotic(&mut self, strength: f32) {
        for idx in 0..self.agents.len() {
            let World { agents, rng, .. } = self;
            let agent = &mut agents[idx];
            if !agent.alive || agent.category() != Category::Bacterium {
                continue;
            }
            let resistance = ((agent.traits.resilience - 0.8) / 1.6).clamp(0.0, 1.0);
            let kill_chance = strength * (1.0 - resistance);
            agent.take_damage(rng.gen_range(0.3..0.6) * strength);
            if agent.alive && rng.gen::<f32>() < kill_chance * 0.2 {
                let lethal = agent.health;
                agent.take_damage(lethal);
            }
            agent.energy *= 1.0 - kill_chance * 0.5;
        }
    }

    /// Antiviral: push out replication cooldowns, sap viral vitals, and
    /// occasionally shake a virus off its host. A detached host's
    /// back-reference is cleared in the same tick.
    fn apply_antiviral(&mut self, strength: f32) {
        let mut detached: Vec<(AgentId, AgentId)> = Vec::new();
        for idx in 0..self.agents.len() {
            let World { agents, rng, .. } = self;
            let agent = &mut agents[idx];
            if !agent.alive || agent.category() != Category::Virus {
                continue;
            }
            agent.take_damage(rng.gen_range(0.2..0.4) * strength);
            agent.energy *= 1.0 - rng.gen_range(0.1..0.3) * strength;
            let virus_id = agent.id;
            if let SpeciesState::Virus(virus) = &mut agent.state {
                virus.replication_cooldown += ((25.0 * strength) as u32).max(15);
                if let Some(host) = virus.host {
                    if rng.gen::<f32>() < 0.1 * strength {
                        virus.host = None;
                        detached.push((virus_id, host));
                    }
                }
            }
        }
        for (virus_id, host_id) in detached {
            if let Some(h) = self.lookup(host_id) {
                if let SpeciesState::Body(body) = &mut self.agents[h].state {
                    if body.infected_by == Some(virus_id) {
                        body.infected_by = None;
                    }
                }
            }
        }
    }

    /// Probiotic: seed beneficial flora in periodic batches, against the
    /// same cap as every other admission path.
    fn apply_probiotic(&mut self, t: &mut Treatment) {
        if t.spawn_cooldown > 0 {
            t.spawn_cooldown -= 1;
            return;
        }
        let cap = self.config.population.max_organisms;
        let live = self.population();
        if live < cap {
            let count = ((t.strength * 3.0) as usize + 1).min(cap - live);
            for _ in 0..count {
                self.spawn_at_random(Species::Beneficial);
            }
            self.events.spawned += count as u32;
        }
        t.spawn_cooldown = (100.0 / t.strength.max(0.1)) as u32;
    }

    /// Immunization: keep immune cells activated and wear down the targeted
    /// pathogens, antibody-marking viruses among them.
    fn apply_immunization(&mut self, t: &Treatment) {
        for idx in 0..self.agents.len() {
            let World { agents, rng, .. } = self;
            let agent = &mut agents[idx];
            if !agent.alive {
                continue;
            }
            if agent.category() == Category::Immune {
                if let SpeciesState::Immune(immune) = &mut agent.state {
                    immune.activation = (immune.activation + t.strength).min(100.0);
                }
            } else if t.targets.contains(&agent.species) {
                agent.take_damage(rng.gen_range(0.05..0.15) * t.strength);
                if agent.alive && rng.gen::<f32>() < t.strength * 0.3 {
                    if let SpeciesState::Virus(virus) = &mut agent.state {
                        virus.marked = true;
                        virus.coverage = (virus.coverage + 0.7 * t.strength).min(1.0);
                        virus.mark_age = 0;
                    }
                }
            }
        }
    }

    /// Phase 6: fixed-priority buckets against a slot budget computed once.
    /// Viruses go last and are further rate-limited per tick. A failing
    /// agent is logged and skipped.
    fn handle_reproduction(&mut self) {
        let cap = self.config.population.max_organisms;
        let live = self.population();
        if live >= cap {
            return;
        }
        let mut budget = cap - live;
        let time = self.time;
        let virus_cap = self.config.population.viral_burst_count.saturating_mul(2);
        let mut virus_admitted = 0usize;

        let mut buckets: [Vec<usize>; 4] = Default::default();
        for (idx, agent) in self.agents.iter().enumerate() {
            if !agent.alive {
                continue;
            }
            match agent.category() {
                Category::Bacterium => buckets[0].push(idx),
                Category::Immune => buckets[1].push(idx),
                Category::Body if agent.species.can_reproduce() => buckets[2].push(idx),
                Category::Virus => buckets[3].push(idx),
                Category::Body => {}
            }
        }

        'buckets: for (bucket_no, bucket) in buckets.iter().enumerate() {
            let is_virus_bucket = bucket_no == 3;
            for &idx in bucket {
                if budget == 0 {
                    break 'buckets;
                }
                let World {
                    agents, rng, config, ..
                } = self;
                let children = match agents[idx].reproduce(rng, config) {
                    Ok(children) => children,
                    Err(err) => {
                        log::warn!("tick {}: reproduce failed: {}", time, err);
                        continue;
                    }
                };
                for mut child in children {
                    if budget == 0 {
                        break;
                    }
                    if is_virus_bucket && virus_admitted >= virus_cap {
                        break;
                    }
                    child.id = self.alloc_id();
                    self.agents.push(child);
                    self.events.births += 1;
                    budget -= 1;
                    if is_virus_bucket {
                        virus_admitted += 1;
                    }
                }
            }
        }
    }

    /// Periodic injection of fresh agents, modeling circulation inflow. An
    /// injected agent enters at a world edge with probability equal to the
    /// configured flow rate. Counts against the same cap as reproduction.
    fn spawn_wave(&mut self) {
        let interval = self.config.spawn.interval;
        if interval == 0 || self.time % interval != 0 {
            return;
        }
        let cap = self.config.population.max_organisms;
        let live = self.population();
        if live >= cap {
            return;
        }
        let budget = (cap - live).min(self.config.spawn.count);
        let species_list = self.config.spawn.species.clone();
        if species_list.is_empty() {
            return;
        }
        let flow = self.config.environment.flow_rate;
        let width = self.config.world.width;
        let height = self.config.world.height;
        for _ in 0..budget {
            let species = species_list[self.spawn_cursor % species_list.len()];
            self.spawn_cursor += 1;
            let (x, y) = if self.rng.gen::<f32>() < flow {
                // Enter at the upstream edge.
                (1.0, self.rng.gen_range(0.0..height))
            } else {
                (
                    self.rng.gen_range(0.0..width),
                    self.rng.gen_range(0.0..height),
                )
            };
            let id = self.alloc_id();
            self.agents.push(Agent::spawn(id, species, x, y, &mut self.rng));
            self.events.spawned += 1;
        }
    }

    /// Phase 7: drop everything with a cleared alive flag. References into
    /// the removed set die with the id index rebuild.
    fn remove_dead(&mut self) {
        let before = self.agents.len();
        self.agents.retain(|a| a.alive);
        self.events.deaths += (before - self.agents.len()) as u32;
    }

    /// Phase 8: priority culling down to the cap. Old and starving agents
    /// go first; viruses are protected, young viruses strongly so, and
    /// non-virus agents are preferred whenever they cover the excess alone.
    fn enforce_population_cap(&mut self) {
        let cap = self.config.population.max_organisms;
        if self.agents.len() <= cap {
            return;
        }
        let excess = self.agents.len() - cap;

        let mut scored: Vec<(f32, usize)> = self
            .agents
            .iter()
            .enumerate()
            .map(|(idx, agent)| (cull_priority(agent), idx))
            .collect();
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        let non_virus = self
            .agents
            .iter()
            .filter(|a| a.category() != Category::Virus)
            .count();
        let mut remove = vec![false; self.agents.len()];
        let mut removed = 0;
        if non_virus >= excess {
            for &(_, idx) in &scored {
                if removed == excess {
                    break;
                }
                if self.agents[idx].category() != Category::Virus {
                    remove[idx] = true;
                    removed += 1;
                }
            }
        } else {
            for &(_, idx) in scored.iter().take(excess) {
                remove[idx] = true;
                removed += 1;
            }
        }
        let mut flags = remove.into_iter();
        self.agents.retain(|_| !flags.next().unwrap());
        self.events.culls += removed as u32;
    }

    fn record_stats(&mut self) {
        self.stats = Stats::collect(self.time, &self.agents, self.events);
        let interval = self.config.logging.stats_interval;
        if interval > 0 && self.time % interval == 0 {
            self.stats_history.record(self.stats.clone());
            log::info!("{}", self.stats.summary());
        }
    }
}

/// Cull priority: old and energy-starved agents first, with protective
/// multipliers for viruses.
fn cull_priority(agent: &Agent) -> f32 {
    let mut priority = agent.age as f32 / agent.energy.max(1.0);
    if agent.category() == Category::Virus {
        priority *= if agent.age < 10 { 0.2 } else { 0.5 };
    }
    priority
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.population.max_organisms = 120;
        config.population.initial_bacteria = 15;
        config.population.initial_viruses = 8;
        config.population.initial_immune_cells = 8;
        config.population.initial_body_cells = 30;
        config.logging.stats_interval = 10;
        config
    }

    #[test]
    fn test_cap_never_exceeded() {
        let mut config = small_config();
        config.population.max_organisms = 80;
        let mut world = World::new_with_seed(config, 1234);
        for _ in 0..300 {
            world.step();
            assert!(world.population() <= 80, "cap exceeded at tick {}", world.time);
        }
    }

    #[test]
    fn test_reproduction_admits_nothing_at_cap() {
        let mut config = small_config();
        let mut world = World::new_with_seed(config.clone(), 55);
        // Fill the arena exactly to the cap with energetic bacteria.
        while world.agents.len() < config.population.max_organisms {
            world.spawn_at_random(Species::EColi);
        }
        for agent in &mut world.agents {
            agent.energy = 140.0;
        }
        world.rebuild_id_index();
        let before = world.agents.len();
        world.handle_reproduction();
        assert_eq!(world.agents.len(), before);

        // Drop below the cap: offspring admitted, but never past it.
        config.population.max_organisms = before + 3;
        world.config = config;
        for _ in 0..50 {
            world.handle_reproduction();
            assert!(world.agents.len() <= before + 3);
        }
    }

    #[test]
    fn test_health_invariant_after_local_update() {
        let mut world = World::new_with_seed(small_config(), 77);
        for _ in 0..100 {
            world.step();
            for agent in &world.agents {
                assert!(
                    agent.health > 0.0 || !agent.alive,
                    "live agent with non-positive health at tick {}",
                    world.time
                );
            }
        }
    }

    #[test]
    fn test_dead_swept_every_tick() {
        let mut world = World::new_with_seed(small_config(), 88);
        for _ in 0..100 {
            world.step();
            assert!(world.agents.iter().all(|a| a.alive));
        }
    }

    #[test]
    fn test_no_stale_references_after_injected_deaths() {
        let mut world = World::new_with_seed(small_config(), 4242);
        for tick in 0..1000 {
            // Kill a pseudo-random agent to stress reference hygiene.
            if tick % 7 == 0 && !world.agents.is_empty() {
                let victim = tick as usize % world.agents.len();
                world.agents[victim].take_damage(10_000.0);
            }
            world.step();
            for agent in &world.agents {
                match &agent.state {
                    SpeciesState::Immune(immune) => {
                        for id in immune.target.iter().chain(immune.engulf.target.iter()) {
                            if let Some(idx) = world.lookup(*id) {
                                assert!(world.agents[idx].alive);
                            }
                        }
                    }
                    SpeciesState::Virus(virus) => {
                        if let Some(idx) = virus.host.and_then(|id| world.lookup(id)) {
                            assert!(world.agents[idx].alive);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let config = small_config();
        let mut a = World::new_with_seed(config.clone(), 999);
        let mut b = World::new_with_seed(config, 999);
        a.run(100);
        b.run(100);
        assert_eq!(a.time, b.time);
        assert_eq!(a.agents.len(), b.agents.len());
        for (x, y) in a.agents.iter().zip(&b.agents) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.x, y.x);
            assert_eq!(x.y, y.y);
            assert_eq!(x.energy, y.energy);
        }
    }

    #[test]
    fn test_cull_priority_protects_young_viruses() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut old_bacterium = Agent::spawn(1, Species::EColi, 0.0, 0.0, &mut rng);
        old_bacterium.age = 100;
        old_bacterium.energy = 10.0;
        let mut young_virus = Agent::spawn(2, Species::Influenza, 0.0, 0.0, &mut rng);
        young_virus.age = 5;
        young_virus.energy = 10.0;
        let mut old_virus = Agent::spawn(3, Species::Influenza, 0.0, 0.0, &mut rng);
        old_virus.age = 100;
        old_virus.energy = 10.0;

        assert!(cull_priority(&old_bacterium) > cull_priority(&old_virus));
        assert!(cull_priority(&old_virus) > cull_priority(&young_virus));
    }

    #[test]
    fn test_cull_prefers_non_viruses_when_possible() {
        let mut config = small_config();
        config.population.initial_viruses = 0;
        let mut world = World::new_with_seed(config, 21);
        // Add a handful of viruses, then blow past the cap with bacteria.
        for _ in 0..5 {
            world.spawn_at_random(Species::Influenza);
        }
        while world.agents.len() <= world.config.population.max_organisms + 20 {
            world.spawn_at_random(Species::EColi);
        }
        world.rebuild_id_index();
        let viruses_before = world.population_of(Category::Virus);
        world.enforce_population_cap();
        assert!(world.agents.len() <= world.config.population.max_organisms);
        assert_eq!(world.population_of(Category::Virus), viruses_before);
    }

    #[test]
    fn test_spawn_wave_respects_cap() {
        let mut config = small_config();
        config.spawn.interval = 1;
        config.spawn.count = 50;
        let mut world = World::new_with_seed(config.clone(), 31);
        while world.agents.len() < config.population.max_organisms {
            world.spawn_at_random(Species::RedCell);
        }
        world.rebuild_id_index();
        world.time = 1;
        let before = world.agents.len();
        world.spawn_wave();
        assert_eq!(world.agents.len(), before);
    }

    #[test]
    fn test_stats_recorded_at_interval() {
        let mut world = World::new_with_seed(small_config(), 61);
        world.run(50);
        assert!(!world.stats_history.snapshots.is_empty());
        assert_eq!(world.stats.time, world.time);
    }

    #[test]
    fn test_antibiotic_suppresses_bacteria() {
        let mut config = small_config();
        config.population.initial_viruses = 0;
        config.population.initial_immune_cells = 0;
        let mut world = World::new_with_seed(config, 5150);
        let before = world.population_of(Category::Bacterium);
        world.administer(Treatment::new(TreatmentKind::Antibiotic));
        world.run(200);
        let after = world.population_of(Category::Bacterium);
        assert!(
            after < before,
            "bacteria grew from {} to {} under antibiotics",
            before,
            after
        );
    }

    #[test]
    fn test_antiviral_raises_replication_cooldowns() {
        let mut world = World::new_with_seed(small_config(), 5151);
        world.administer(Treatment::new(TreatmentKind::Antiviral));
        world.step();
        for agent in world.agents.iter().filter(|a| a.alive) {
            if let SpeciesState::Virus(virus) = &agent.state {
                assert!(virus.replication_cooldown >= 14);
            }
        }
    }

    #[test]
    fn test_probiotic_seeds_beneficial_flora() {
        let mut config = small_config();
        config.population.initial_bacteria = 0;
        let mut world = World::new_with_seed(config, 5152);
        world.administer(Treatment::new(TreatmentKind::Probiotic));
        world.step();
        let beneficial = world
            .agents
            .iter()
            .filter(|a| a.alive && a.species == Species::Beneficial)
            .count();
        assert!(beneficial > 0);
        assert!(world.population() <= world.config.population.max_organisms);
    }

    #[test]
    fn test_immunization_marks_target_pathogens() {
        let mut config = small_config();
        config.population.initial_viruses = 20;
        config.population.initial_immune_cells = 0;
        let mut world = World::new_with_seed(config, 5153);
        world.administer(Treatment::new(TreatmentKind::Immunization));
        let mut marked = 0;
        for _ in 0..50 {
            world.step();
            marked = marked.max(world.stats.marked_viruses);
        }
        assert!(marked > 0, "immunization never marked a target virus");
    }

    #[test]
    fn test_treatment_course_expires() {
        let mut world = World::new_with_seed(small_config(), 5154);
        world.administer(Treatment::new(TreatmentKind::Antibiotic));
        assert_eq!(world.treatments().len(), 1);
        world.run(201);
        assert!(world.treatments().is_empty());
    }

    #[test]
    fn test_ids_are_unique_over_time() {
        let mut world = World::new_with_seed(small_config(), 71);
        world.run(200);
        let mut ids: Vec<_> = world.agents.iter().map(|a| a.id).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before);
    }
}
