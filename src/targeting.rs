//! Immune-cell targeting: scan, threat scoring, lock management, pursuit
//! bias, and the macrophage engulf/digest pipeline.
//!
//! The scan phase is split read-then-apply: an immutable pass over the agent
//! slice produces one [`ScanOutcome`] per predator, then the outcomes are
//! applied in stable index order. Only the scanning agent's own fields and
//! (for T-Cell antibody fire) its marked target mutate.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, Category, Species, SpeciesState, MARK_TTL};
use crate::grid::{toroidal_delta, toroidal_distance, SpatialIndex};

/// Ticks a completed engulf takes.
pub const ENGULF_DURATION: u32 = 30;
/// Ticks digestion takes once started.
pub const DIGEST_DURATION: u32 = 80;
/// Speed factor while digesting.
pub const DIGEST_SPEED: f32 = 0.8;
/// Energy credited per digested prey.
pub const ENERGY_PER_PREY: f32 = 30.0;

const ANTIBODY_COOLDOWN: u32 = 25;
const ANTIBODY_COST: f32 = 15.0;
const ACTIVATION_THRESHOLD: f32 = 50.0;
const COVERAGE_STEP: f32 = 0.3;

/// Per-species targeting parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImmuneProfile {
    pub detection_radius: f32,
    pub attack_strength: f32,
    pub lock_duration: u32,
    /// Pursuit speed factor while locked.
    pub pursuit: f32,
    /// Distance at which the final-approach boost kicks in.
    pub final_approach: f32,
    pub final_boost: f32,
    pub memory_capacity: usize,
    pub memory_ttl: u32,
    pub engulf_capacity: usize,
}

/// Targeting parameters for an immune species. Panics on non-immune input;
/// callers dispatch on category first.
pub fn profile(species: Species) -> ImmuneProfile {
    match species {
        Species::Neutrophil => ImmuneProfile {
            detection_radius: 200.0,
            attack_strength: 5.0,
            lock_duration: 50,
            pursuit: 1.5,
            final_approach: 50.0,
            final_boost: 1.2,
            memory_capacity: 3,
            memory_ttl: MARK_TTL,
            engulf_capacity: 0,
        },
        Species::Macrophage => ImmuneProfile {
            detection_radius: 250.0,
            attack_strength: 5.0,
            lock_duration: 50,
            pursuit: 1.7,
            final_approach: 50.0,
            final_boost: 1.2,
            memory_capacity: 5,
            memory_ttl: MARK_TTL,
            engulf_capacity: 5,
        },
        Species::TCell => ImmuneProfile {
            detection_radius: 220.0,
            attack_strength: 4.0,
            lock_duration: 50,
            pursuit: 1.8,
            final_approach: 50.0,
            final_boost: 1.2,
            memory_capacity: 4,
            memory_ttl: MARK_TTL,
            engulf_capacity: 0,
        },
        other => unreachable!("profile() called for non-immune species {:?}", other),
    }
}

/// Base threat of a candidate species; zero means "never a target".
pub fn base_type_score(species: Species) -> f32 {
    use Species::*;
    match species {
        Influenza => 12.0,
        Rhinovirus => 11.0,
        Coronavirus => 14.0,
        Adenovirus => 13.0,
        Streptococcus => 8.0,
        EColi => 9.0,
        Staphylococcus => 10.0,
        Salmonella => 10.0,
        // Beneficial flora, other immune cells and body tissue are ignored.
        _ => 0.0,
    }
}

/// Distance falloff: `max(0, 1 - d/r)^1.5`.
pub fn proximity_weight(distance: f32, detection_radius: f32) -> f32 {
    (1.0 - distance / detection_radius).max(0.0).powf(1.5)
}

/// Full threat score of one candidate as seen by one predator.
pub fn threat_score(predator: &Agent, candidate: &Agent, distance: f32, p: &ImmuneProfile) -> f32 {
    let base = base_type_score(candidate.species);
    if base <= 0.0 {
        return 0.0;
    }
    let mut score = base * proximity_weight(distance, p.detection_radius);

    if let SpeciesState::Virus(virus) = &candidate.state {
        if virus.marked {
            // Phagocytes chase marked prey; T-Cells move on to unmarked work.
            score *= match predator.species {
                Species::Neutrophil => 2.5,
                Species::Macrophage => 3.0,
                Species::TCell => 0.3,
                _ => 1.0,
            };
        }
    }
    if predator.species == Species::Macrophage {
        score *= match candidate.category() {
            Category::Virus => 2.5,
            Category::Bacterium => 2.0,
            _ => 1.0,
        };
    }
    if candidate.health < 50.0 {
        score *= 1.3;
    }
    if let SpeciesState::Immune(immune) = &predator.state {
        if immune.knows(candidate.id) {
            score *= 2.0;
        }
    }
    score
}

/// A scored candidate in stable encounter order.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub idx: usize,
    pub id: AgentId,
    pub distance: f32,
    pub score: f32,
}

/// Pick the strictly-highest-scoring candidate; ties keep the first
/// encountered. No randomness.
pub fn select_target(candidates: &[Candidate]) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for c in candidates {
        if c.score <= 0.0 {
            continue;
        }
        match best {
            Some(b) if c.score <= b.score => {}
            _ => best = Some(*c),
        }
    }
    best
}

/// Lock transition decided by the scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockAction {
    /// Keep the current lock; counter advances.
    Stay,
    Acquire { id: AgentId },
    /// Drop to idle (expiry or invalidated target).
    Release,
}

/// One predator's scan result, applied after the whole read pass.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub idx: usize,
    pub action: LockAction,
    /// Index of a virus to antibody-mark this tick (T-Cell only).
    pub antibody: Option<usize>,
    pub activation_gain: f32,
    pub remember: Option<AgentId>,
}

/// Counters fed back into the tick statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScanEvents {
    pub marks: u32,
    pub acquisitions: u32,
}

/// Read pass: evaluate every live immune agent against the current spatial
/// index. Candidates come from the 3x3 neighborhood, then an exact toroidal
/// distance filter against the detection radius.
pub fn scan_phase(
    agents: &[Agent],
    index: &SpatialIndex,
    width: f32,
    height: f32,
) -> Vec<ScanOutcome> {
    let mut outcomes = Vec::new();
    for (idx, predator) in agents.iter().enumerate() {
        if !predator.alive || predator.category() != Category::Immune {
            continue;
        }
        let immune = match &predator.state {
            SpeciesState::Immune(s) => s,
            _ => continue,
        };
        let p = profile(predator.species);
        let neighbors = index.neighbors_of(predator.x, predator.y);

        if let Some(target_id) = immune.target {
            // Lock bookkeeping: forced re-evaluation at expiry, immediate
            // release when the target left the candidate set or died.
            if immune.lock_ticks + 1 >= p.lock_duration {
                outcomes.push(ScanOutcome {
                    idx,
                    action: LockAction::Release,
                    antibody: None,
                    activation_gain: 0.0,
                    remember: None,
                });
                continue;
            }
            let target = neighbors.iter().find_map(|&j| {
                let a = &agents[j];
                (a.id == target_id && a.alive).then_some(j)
            });
            let valid = target.and_then(|j| {
                let a = &agents[j];
                let d = toroidal_distance(predator.x, predator.y, a.x, a.y, width, height);
                (d <= p.detection_radius).then_some((j, d))
            });
            match valid {
                Some((tj, dist)) => {
                    let antibody = antibody_opportunity(predator, immune, &agents[tj], dist, &p);
                    outcomes.push(ScanOutcome {
                        idx,
                        action: LockAction::Stay,
                        antibody: antibody.then_some(tj),
                        activation_gain: 0.0,
                        remember: None,
                    });
                }
                None => outcomes.push(ScanOutcome {
                    idx,
                    action: LockAction::Release,
                    antibody: None,
                    activation_gain: 0.0,
                    remember: None,
                }),
            }
            continue;
        }

        // Idle: score candidates in stable neighbor order.
        let mut candidates = Vec::new();
        for &j in &neighbors {
            if j == idx {
                continue;
            }
            let other = &agents[j];
            if !other.alive {
                continue;
            }
            let distance =
                toroidal_distance(predator.x, predator.y, other.x, other.y, width, height);
            if distance > p.detection_radius {
                continue;
            }
            let score = threat_score(predator, other, distance, &p);
            candidates.push(Candidate {
                idx: j,
                id: other.id,
                distance,
                score,
            });
        }
        if let Some(chosen) = select_target(&candidates) {
            let remember = agents[chosen.idx]
                .species
                .is_pathogen()
                .then_some(chosen.id);
            outcomes.push(ScanOutcome {
                idx,
                action: LockAction::Acquire { id: chosen.id },
                antibody: None,
                activation_gain: 2.0,
                remember,
            });
        }
    }
    outcomes
}

fn antibody_opportunity(
    predator: &Agent,
    immune: &crate::agent::ImmuneState,
    target: &Agent,
    distance: f32,
    p: &ImmuneProfile,
) -> bool {
    predator.species == Species::TCell
        && target.category() == Category::Virus
        && distance <= p.detection_radius * 0.8
        && immune.activation >= ACTIVATION_THRESHOLD
        && immune.antibody_cooldown == 0
        && predator.energy > ANTIBODY_COST
}

/// Write pass: apply scan outcomes in order. Antibody fire mutates the
/// target virus as well as the T-Cell itself.
pub fn apply_scan(agents: &mut [Agent], outcomes: &[ScanOutcome]) -> ScanEvents {
    let mut events = ScanEvents::default();
    for outcome in outcomes {
        if let Some(tidx) = outcome.antibody {
            if tidx != outcome.idx {
                let (pred, virus) = crate::interact::pair_mut(agents, outcome.idx, tidx);
                apply_antibody(pred, virus);
                events.marks += 1;
            }
        }
        let predator = &mut agents[outcome.idx];
        let p = profile(predator.species);
        let immune = match &mut predator.state {
            SpeciesState::Immune(s) => s,
            _ => continue,
        };
        match outcome.action {
            LockAction::Stay => immune.lock_ticks += 1,
            LockAction::Acquire { id } => {
                immune.target = Some(id);
                immune.lock_ticks = 0;
                immune.activation = (immune.activation + outcome.activation_gain).min(100.0);
                if let Some(remember) = outcome.remember {
                    immune.remember(remember, p.memory_ttl, p.memory_capacity);
                }
                events.acquisitions += 1;
            }
            LockAction::Release => {
                immune.target = None;
                immune.lock_ticks = 0;
            }
        }
    }
    events
}

fn apply_antibody(pred: &mut Agent, virus: &mut Agent) {
    pred.energy -= ANTIBODY_COST;
    let pred_id = pred.id;
    let virus_id = virus.id;
    let p = profile(pred.species);
    if let SpeciesState::Immune(immune) = &mut pred.state {
        immune.antibody_cooldown = ANTIBODY_COOLDOWN;
        immune.remember(virus_id, p.memory_ttl, p.memory_capacity);
    }
    if let SpeciesState::Virus(state) = &mut virus.state {
        state.marked = true;
        state.coverage = (state.coverage + COVERAGE_STEP).min(1.0);
        state.mark_age = 0;
        state.marker = Some(pred_id);
    }
}

/// Blend the policy's steering with the direction to the locked target,
/// weighting toward pure pursuit as distance shrinks.
pub fn pursuit_steer(decision: [f32; 2], dx: f32, dy: f32) -> (f32, f32) {
    let dist = (dx * dx + dy * dy).sqrt();
    if dist < 1e-6 {
        return (decision[0], decision[1]);
    }
    let blend = (dist / 100.0).min(1.0);
    let ux = dx / dist;
    let uy = dy / dist;
    (
        decision[0] * blend + ux * (1.0 - blend) + ux * 0.5,
        decision[1] * blend + uy * (1.0 - blend) + uy * 0.5,
    )
}

/// Speed factor while locked, including the final-approach boost and the
/// macrophage sprint toward marked prey.
pub fn pursuit_speed(predator: &Agent, target: &Agent, distance: f32, p: &ImmuneProfile) -> f32 {
    let mut speed = p.pursuit;
    if predator.species == Species::Macrophage {
        if let SpeciesState::Virus(v) = &target.state {
            if v.marked {
                speed = 2.0;
            }
        }
    }
    if distance <= p.final_approach {
        speed *= p.final_boost;
    }
    speed
}

/// Probability that a macrophage engulf attempt on this prey succeeds.
pub fn engulf_chance(prey: &Agent) -> f32 {
    let mut chance: f32 = match &prey.state {
        SpeciesState::Virus(v) if v.marked => 0.8,
        SpeciesState::Virus(_) => 0.25,
        _ if prey.species.is_harmful_bacterium() => 0.5,
        _ => 0.4,
    };
    let weakened = matches!(&prey.state, SpeciesState::Body(b) if b.damaged);
    if weakened {
        chance = chance.max(0.7);
    }
    let ratio = (prey.health / 100.0).clamp(0.0, 1.0);
    if ratio < 0.5 {
        chance += 0.5 - ratio;
    }
    chance.min(0.95)
}

/// Whether a macrophage can accept a new engulf target right now.
pub fn can_engulf(predator: &Agent) -> bool {
    if predator.species != Species::Macrophage {
        return false;
    }
    match &predator.state {
        SpeciesState::Immune(immune) => {
            let p = profile(predator.species);
            immune.engulf.target.is_none() && immune.engulf.payload.len() < p.engulf_capacity
        }
        _ => false,
    }
}

/// Advance an in-progress engulf by one tick: pull the prey inward, shrink
/// it, and report completion. On completion the prey is killed and moved to
/// the payload; digestion starts (or restarts).
pub fn advance_engulf(predator: &mut Agent, prey: &mut Agent, width: f32, height: f32) -> bool {
    let step = 1.0 / ENGULF_DURATION as f32;
    let (dx, dy) = toroidal_delta(prey.x, prey.y, predator.x, predator.y, width, height);
    let progress = match &mut predator.state {
        SpeciesState::Immune(immune) => {
            immune.engulf.progress += step;
            immune.engulf.progress
        }
        _ => return false,
    };
    // Drawn toward the predator and shrunk as coverage progresses.
    prey.x = (prey.x + dx * 0.2).rem_euclid(width);
    prey.y = (prey.y + dy * 0.2).rem_euclid(height);
    prey.size = (prey.size * (1.0 - 0.5 * step)).max(0.5);
    if progress < 1.0 {
        return false;
    }
    prey.alive = false;
    prey.health = prey.health.min(0.0);
    if let SpeciesState::Immune(immune) = &mut predator.state {
        immune.engulf.payload.push(prey.id);
        immune.engulf.target = None;
        immune.engulf.progress = 0.0;
        immune.engulf.digesting = true;
        immune.engulf.digest_timer = DIGEST_DURATION;
    }
    true
}

/// Advance digestion by one tick. Returns the number of prey converted to
/// energy when the timer expires.
pub fn advance_digestion(predator: &mut Agent) -> usize {
    let mut digested = 0;
    let mut credit = 0.0;
    if let SpeciesState::Immune(immune) = &mut predator.state {
        if !immune.engulf.digesting {
            return 0;
        }
        immune.engulf.digest_timer = immune.engulf.digest_timer.saturating_sub(1);
        if immune.engulf.digest_timer == 0 {
            digested = immune.engulf.payload.len();
            credit = digested as f32 * ENERGY_PER_PREY;
            immune.engulf.payload.clear();
            immune.engulf.digesting = false;
        }
    }
    if credit > 0.0 {
        predator.energy = (predator.energy + credit).min(crate::agent::MAX_ENERGY);
    }
    digested
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{SpatialIndex, CELL_SIZE};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn spawn(id: u64, species: Species, x: f32, y: f32) -> Agent {
        let mut rng = ChaCha8Rng::seed_from_u64(id);
        Agent::spawn(id, species, x, y, &mut rng)
    }

    #[test]
    fn test_proximity_weight_matches_worked_example() {
        // detection 200, prey at 50: 0.75^1.5 ~ 0.6495
        let near = proximity_weight(50.0, 200.0);
        assert!((near - 0.6495).abs() < 1e-3);
        assert!((8.0 * near - 5.196).abs() < 1e-2);
        // second candidate at 180: 0.1^1.5 ~ 0.0316
        let far = proximity_weight(180.0, 200.0);
        assert!((5.0 * far - 0.158).abs() < 0.01);
        // The near, lower-base candidate still dominates.
        assert!(8.0 * near > 5.0 * far);
    }

    #[test]
    fn test_select_target_is_deterministic_on_ties() {
        let candidates = vec![
            Candidate { idx: 3, id: 30, distance: 10.0, score: 5.0 },
            Candidate { idx: 7, id: 70, distance: 12.0, score: 5.0 },
            Candidate { idx: 9, id: 90, distance: 8.0, score: 4.0 },
        ];
        for _ in 0..10 {
            let winner = select_target(&candidates).unwrap();
            assert_eq!(winner.id, 30);
        }
    }

    #[test]
    fn test_select_target_requires_positive_score() {
        let candidates = vec![Candidate { idx: 0, id: 1, distance: 300.0, score: 0.0 }];
        assert!(select_target(&candidates).is_none());
    }

    #[test]
    fn test_scan_prefers_near_virus_over_far_bacterium() {
        let predator = spawn(1, Species::Neutrophil, 100.0, 100.0);
        let virus = spawn(2, Species::Influenza, 140.0, 100.0);
        let bacterium = spawn(3, Species::Streptococcus, 145.0, 100.0);
        let agents = vec![predator, virus, bacterium];
        let mut index = SpatialIndex::new(800.0, 600.0, CELL_SIZE);
        index.rebuild(&agents);

        let outcomes = scan_phase(&agents, &index, 800.0, 600.0);
        assert_eq!(outcomes.len(), 1);
        match outcomes[0].action {
            LockAction::Acquire { id } => assert_eq!(id, 2),
            ref other => panic!("expected acquisition, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_ignores_beneficial_and_body() {
        let predator = spawn(1, Species::Neutrophil, 100.0, 100.0);
        let flora = spawn(2, Species::Beneficial, 110.0, 100.0);
        let tissue = spawn(3, Species::Epithelial, 120.0, 100.0);
        let other = spawn(4, Species::Macrophage, 130.0, 100.0);
        let agents = vec![predator, flora, tissue, other];
        let mut index = SpatialIndex::new(800.0, 600.0, CELL_SIZE);
        index.rebuild(&agents);

        let outcomes = scan_phase(&agents, &index, 800.0, 600.0);
        // The macrophage also scans; neither predator acquires anything.
        assert!(outcomes
            .iter()
            .all(|o| !matches!(o.action, LockAction::Acquire { .. })));
    }

    #[test]
    fn test_lock_expires_within_lock_duration() {
        let mut predator = spawn(1, Species::Neutrophil, 100.0, 100.0);
        let virus = spawn(2, Species::Influenza, 120.0, 100.0);
        if let SpeciesState::Immune(immune) = &mut predator.state {
            immune.target = Some(2);
            immune.lock_ticks = 0;
        }
        let mut agents = vec![predator, virus];
        let mut index = SpatialIndex::new(800.0, 600.0, CELL_SIZE);

        let p = profile(Species::Neutrophil);
        let mut released = false;
        for _ in 0..p.lock_duration {
            index.rebuild(&agents);
            let outcomes = scan_phase(&agents, &index, 800.0, 600.0);
            let mine = outcomes.iter().find(|o| o.idx == 0).unwrap();
            if mine.action == LockAction::Release {
                released = true;
                break;
            }
            apply_scan(&mut agents, &outcomes);
        }
        assert!(released, "lock never re-evaluated within lock_duration");
    }

    #[test]
    fn test_dead_target_released_immediately() {
        let mut predator = spawn(1, Species::Neutrophil, 100.0, 100.0);
        let mut virus = spawn(2, Species::Influenza, 120.0, 100.0);
        virus.alive = false;
        if let SpeciesState::Immune(immune) = &mut predator.state {
            immune.target = Some(2);
            immune.lock_ticks = 3;
        }
        let agents = vec![predator, virus];
        let mut index = SpatialIndex::new(800.0, 600.0, CELL_SIZE);
        index.rebuild(&agents);

        let outcomes = scan_phase(&agents, &index, 800.0, 600.0);
        assert_eq!(outcomes[0].action, LockAction::Release);
    }

    #[test]
    fn test_marked_virus_boosts_phagocyte_score() {
        let predator = spawn(1, Species::Macrophage, 100.0, 100.0);
        let mut plain = spawn(2, Species::Influenza, 140.0, 100.0);
        let mut marked = spawn(3, Species::Influenza, 140.0, 100.0);
        plain.health = 100.0;
        marked.health = 100.0;
        if let SpeciesState::Virus(v) = &mut marked.state {
            v.marked = true;
        }
        let p = profile(Species::Macrophage);
        let s_plain = threat_score(&predator, &plain, 40.0, &p);
        let s_marked = threat_score(&predator, &marked, 40.0, &p);
        assert!((s_marked / s_plain - 3.0).abs() < 1e-3);
    }

    #[test]
    fn test_engulf_refused_at_capacity() {
        let mut macrophage = spawn(1, Species::Macrophage, 100.0, 100.0);
        let p = profile(Species::Macrophage);
        if let SpeciesState::Immune(immune) = &mut macrophage.state {
            immune.engulf.payload = (10..10 + p.engulf_capacity as u64).collect();
        }
        assert!(!can_engulf(&macrophage));
    }

    #[test]
    fn test_engulf_refused_while_one_in_progress() {
        let mut macrophage = spawn(1, Species::Macrophage, 100.0, 100.0);
        if let SpeciesState::Immune(immune) = &mut macrophage.state {
            immune.engulf.target = Some(42);
        }
        assert!(!can_engulf(&macrophage));
    }

    #[test]
    fn test_engulf_completes_and_digestion_credits_energy() {
        let mut macrophage = spawn(1, Species::Macrophage, 100.0, 100.0);
        let mut prey = spawn(2, Species::Influenza, 110.0, 100.0);
        if let SpeciesState::Immune(immune) = &mut macrophage.state {
            immune.engulf.target = Some(2);
        }
        let mut done = false;
        for _ in 0..=ENGULF_DURATION {
            if advance_engulf(&mut macrophage, &mut prey, 800.0, 600.0) {
                done = true;
                break;
            }
        }
        assert!(done);
        assert!(!prey.alive);

        macrophage.energy = 50.0;
        let mut digested = 0;
        for _ in 0..DIGEST_DURATION {
            digested += advance_digestion(&mut macrophage);
        }
        assert_eq!(digested, 1);
        assert!((macrophage.energy - 80.0).abs() < 1e-3);
        if let SpeciesState::Immune(immune) = &macrophage.state {
            assert!(immune.engulf.payload.is_empty());
            assert!(!immune.engulf.digesting);
        }
    }

    #[test]
    fn test_antibody_marks_virus_and_sets_cooldown() {
        let mut tcell = spawn(1, Species::TCell, 100.0, 100.0);
        let virus = spawn(2, Species::Influenza, 120.0, 100.0);
        if let SpeciesState::Immune(immune) = &mut tcell.state {
            immune.target = Some(2);
            immune.activation = 60.0;
            immune.antibody_cooldown = 0;
        }
        let mut agents = vec![tcell, virus];
        let mut index = SpatialIndex::new(800.0, 600.0, CELL_SIZE);
        index.rebuild(&agents);

        let outcomes = scan_phase(&agents, &index, 800.0, 600.0);
        let events = apply_scan(&mut agents, &outcomes);
        assert_eq!(events.marks, 1);
        if let SpeciesState::Virus(v) = &agents[1].state {
            assert!(v.marked);
            assert_eq!(v.marker, Some(1));
            assert!((v.coverage - COVERAGE_STEP).abs() < 1e-5);
        }
        if let SpeciesState::Immune(immune) = &agents[0].state {
            assert_eq!(immune.antibody_cooldown, ANTIBODY_COOLDOWN);
        }
    }

    #[test]
    fn test_engulf_chance_ranks_prey() {
        let mut marked = spawn(1, Species::Influenza, 0.0, 0.0);
        if let SpeciesState::Virus(v) = &mut marked.state {
            v.marked = true;
        }
        let unmarked = spawn(2, Species::Influenza, 0.0, 0.0);
        let bacterium = spawn(3, Species::EColi, 0.0, 0.0);
        assert!(engulf_chance(&marked) > engulf_chance(&bacterium));
        assert!(engulf_chance(&bacterium) > engulf_chance(&unmarked));
    }
}
