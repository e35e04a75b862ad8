//! Pairwise interaction resolution.
//!
//! For every unordered live pair sharing a 3x3 cell neighborhood and within
//! contact range, both directions run independently: `a` acts on `b`, then
//! `b` acts on the possibly-already-modified `a`. Per-field exchanges are
//! commutative but the pair is not atomic as a whole; that ordering is part
//! of the semantics.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::agent::{Agent, Category, Species, SpeciesState};
use crate::config::Config;
use crate::grid::{toroidal_distance, SpatialIndex};
use crate::targeting;

/// Counters fed back into the tick statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct InteractionEvents {
    pub attacks: u32,
    pub kills: u32,
    pub infections: u32,
    pub engulf_starts: u32,
}

/// Disjoint mutable access to two agents of the same slice.
pub(crate) fn pair_mut(agents: &mut [Agent], i: usize, j: usize) -> (&mut Agent, &mut Agent) {
    debug_assert_ne!(i, j);
    if i < j {
        let (head, tail) = agents.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = agents.split_at_mut(i);
        let (a, b) = (&mut tail[0], &mut head[j]);
        (a, b)
    }
}

/// Run the full pairwise pass over the current spatial index.
pub fn resolve_interactions(
    agents: &mut [Agent],
    index: &SpatialIndex,
    width: f32,
    height: f32,
    config: &Config,
    rng: &mut ChaCha8Rng,
) -> InteractionEvents {
    let mut events = InteractionEvents::default();
    for i in 0..agents.len() {
        if !agents[i].alive {
            continue;
        }
        let neighbors = index.neighbors_of(agents[i].x, agents[i].y);
        for j in neighbors {
            if j <= i || !agents[i].alive || !agents[j].alive {
                continue;
            }
            let distance = toroidal_distance(
                agents[i].x,
                agents[i].y,
                agents[j].x,
                agents[j].y,
                width,
                height,
            );
            let reach =
                agents[i].size + agents[j].size + config.simulation.interaction_radius;
            if distance > reach {
                continue;
            }
            let (a, b) = pair_mut(agents, i, j);
            act(a, b, distance, rng, &mut events);
            if a.alive && b.alive {
                act(b, a, distance, rng, &mut events);
            }
        }
    }
    events
}

/// One direction of a contact: `actor` decides whether and how to act on
/// `other`.
fn act(
    actor: &mut Agent,
    other: &mut Agent,
    distance: f32,
    rng: &mut ChaCha8Rng,
    events: &mut InteractionEvents,
) {
    match actor.category() {
        Category::Bacterium => bacterium_act(actor, other, distance, rng, events),
        Category::Virus => virus_act(actor, other, rng, events),
        Category::Immune => immune_act(actor, other, rng, events),
        Category::Body => {}
    }
}

fn bacterium_act(
    actor: &mut Agent,
    other: &mut Agent,
    distance: f32,
    _rng: &mut ChaCha8Rng,
    events: &mut InteractionEvents,
) {
    // Harmful strains chew on body tissue within close contact.
    if actor.species.is_harmful_bacterium()
        && other.category() == Category::Body
        && distance <= actor.size + other.size + 5.0
    {
        let damage = if other.species == Species::RedCell {
            match actor.species {
                Species::EColi => 2.0,
                Species::Streptococcus => 4.0,
                _ => 0.8,
            }
        } else {
            match actor.species {
                Species::Salmonella | Species::Staphylococcus => 1.5,
                _ => 0.8,
            }
        } * actor.traits.aggression;
        other.take_damage(damage);
        actor.energy = (actor.energy + damage * 2.0).min(crate::agent::MAX_ENERGY);
        events.attacks += 1;
        if !other.alive {
            events.kills += 1;
        }
        return;
    }

    // Resource competition between bacteria: a clear strength advantage
    // siphons energy from the weaker neighbor.
    if other.category() == Category::Bacterium {
        let strength_a = actor.energy * (actor.health / 100.0);
        let strength_b = other.energy * (other.health / 100.0);
        if strength_a > strength_b * 1.2 && other.energy >= 2.0 {
            other.energy -= 2.0;
            actor.energy = (actor.energy + 2.0).min(crate::agent::MAX_ENERGY);
        }
    }
}

fn virus_act(
    actor: &mut Agent,
    other: &mut Agent,
    rng: &mut ChaCha8Rng,
    events: &mut InteractionEvents,
) {
    if other.category() != Category::Body {
        return;
    }
    let hostless = matches!(&actor.state, SpeciesState::Virus(v) if v.host.is_none());
    let open = matches!(&other.state, SpeciesState::Body(b) if b.infected_by.is_none());
    if !hostless || !open {
        return;
    }
    // The cell's membrane resists some attempts outright.
    if rng.gen::<f32>() < other.species.infection_resistance() {
        return;
    }
    if let SpeciesState::Virus(virus) = &mut actor.state {
        virus.host = Some(other.id);
        virus.dormancy = 0;
    }
    if let SpeciesState::Body(body) = &mut other.state {
        body.infected_by = Some(actor.id);
    }
    events.infections += 1;
}

fn immune_act(
    actor: &mut Agent,
    other: &mut Agent,
    rng: &mut ChaCha8Rng,
    events: &mut InteractionEvents,
) {
    if !other.species.is_pathogen() {
        // Macrophages also clear damaged tissue they bump into.
        if actor.species == Species::Macrophage
            && matches!(&other.state, SpeciesState::Body(b) if b.damaged)
            && targeting::can_engulf(actor)
            && rng.gen::<f32>() < targeting::engulf_chance(other)
        {
            if let SpeciesState::Immune(immune) = &mut actor.state {
                immune.engulf.target = Some(other.id);
                immune.engulf.progress = 0.0;
            }
            events.engulf_starts += 1;
        }
        return;
    }
    let p = targeting::profile(actor.species);
    let (locked_on_other, cooldown_ready, activation) = match &actor.state {
        SpeciesState::Immune(immune) => (
            immune.target == Some(other.id),
            immune.attack_cooldown == 0,
            immune.activation,
        ),
        _ => return,
    };

    // Macrophages try to swallow prey they touch.
    if actor.species == Species::Macrophage && targeting::can_engulf(actor) {
        if rng.gen::<f32>() < targeting::engulf_chance(other) {
            if let SpeciesState::Immune(immune) = &mut actor.state {
                immune.engulf.target = Some(other.id);
                immune.engulf.progress = 0.0;
            }
            events.engulf_starts += 1;
        } else {
            other.take_damage(p.attack_strength * 0.5);
            events.attacks += 1;
            if !other.alive {
                actor.energy = (actor.energy + 10.0).min(crate::agent::MAX_ENERGY);
                events.kills += 1;
            }
        }
        pathogen_counterattack(actor, other, rng);
        return;
    }

    let landed = if locked_on_other && cooldown_ready {
        // Committed strike; surface drift can still shake it off.
        rng.gen::<f32>() >= other.evasion()
    } else {
        // Opportunistic contact attack.
        let chance = if actor.species == Species::Macrophage { 0.25 } else { 0.1 };
        rng.gen::<f32>() < chance * (1.0 - other.evasion())
    };
    if landed {
        let mut damage = p.attack_strength;
        if actor.species == Species::TCell {
            if activation >= 50.0 {
                damage *= 2.0;
            }
            if other.category() == Category::Virus {
                damage *= 2.0;
            }
        }
        other.take_damage(damage);
        actor.energy -= 1.0;
        events.attacks += 1;
        if !other.alive {
            actor.energy = (actor.energy + 10.0).min(crate::agent::MAX_ENERGY);
            events.kills += 1;
        }
        if actor.species == Species::TCell {
            if let SpeciesState::Immune(immune) = &mut actor.state {
                immune.activation = (immune.activation + 10.0).min(100.0);
                let reduction = (immune.activation / 10.0) as u32;
                immune.attack_cooldown = 15u32.saturating_sub(reduction).max(5);
            }
        }
    }
    pathogen_counterattack(actor, other, rng);
}

/// Pathogens occasionally damage the immune cell grappling them.
fn pathogen_counterattack(actor: &mut Agent, other: &Agent, rng: &mut ChaCha8Rng) {
    if other.alive && rng.gen::<f32>() < 0.3 {
        actor.take_damage(1.0 * other.traits.aggression.min(1.5));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{SpatialIndex, CELL_SIZE};
    use rand::SeedableRng;

    fn spawn(id: u64, species: Species, x: f32, y: f32) -> Agent {
        let mut rng = ChaCha8Rng::seed_from_u64(id);
        Agent::spawn(id, species, x, y, &mut rng)
    }

    fn run_pass(agents: &mut Vec<Agent>, seed: u64) -> InteractionEvents {
        let config = Config::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut index = SpatialIndex::new(800.0, 600.0, CELL_SIZE);
        index.rebuild(agents);
        resolve_interactions(agents, &index, 800.0, 600.0, &config, &mut rng)
    }

    #[test]
    fn test_bacterium_damages_adjacent_body_cell() {
        let mut agents = vec![
            spawn(1, Species::Salmonella, 100.0, 100.0),
            spawn(2, Species::Epithelial, 105.0, 100.0),
        ];
        let before = agents[1].health;
        run_pass(&mut agents, 7);
        assert!(agents[1].health < before);
        if let SpeciesState::Body(body) = &agents[1].state {
            assert!(body.damaged);
        }
    }

    #[test]
    fn test_beneficial_bacterium_never_attacks() {
        let mut agents = vec![
            spawn(1, Species::Beneficial, 100.0, 100.0),
            spawn(2, Species::Epithelial, 105.0, 100.0),
        ];
        let before = agents[1].health;
        run_pass(&mut agents, 8);
        assert_eq!(agents[1].health, before);
    }

    #[test]
    fn test_out_of_range_pair_never_interacts() {
        let mut agents = vec![
            spawn(1, Species::Salmonella, 100.0, 100.0),
            spawn(2, Species::Epithelial, 140.0, 100.0),
        ];
        let before = agents[1].health;
        let events = run_pass(&mut agents, 9);
        assert_eq!(agents[1].health, before);
        assert_eq!(events.attacks, 0);
    }

    #[test]
    fn test_stronger_bacterium_siphons_energy() {
        let mut agents = vec![
            spawn(1, Species::EColi, 100.0, 100.0),
            spawn(2, Species::EColi, 104.0, 100.0),
        ];
        agents[0].energy = 140.0;
        agents[1].energy = 40.0;
        run_pass(&mut agents, 10);
        assert!(agents[1].energy < 40.0);
    }

    #[test]
    fn test_virus_infection_sets_both_references() {
        // Many seeds: infection is probabilistic per contact, so retry until
        // a roll lands. The references must always appear as a pair.
        for seed in 0..20 {
            let mut agents = vec![
                spawn(1, Species::Influenza, 100.0, 100.0),
                spawn(2, Species::Epithelial, 104.0, 100.0),
            ];
            run_pass(&mut agents, seed);
            let host = match &agents[0].state {
                SpeciesState::Virus(v) => v.host,
                _ => None,
            };
            let infected_by = match &agents[1].state {
                SpeciesState::Body(b) => b.infected_by,
                _ => None,
            };
            match host {
                Some(h) => {
                    assert_eq!(h, 2);
                    assert_eq!(infected_by, Some(1));
                    return;
                }
                None => assert_eq!(infected_by, None),
            }
        }
        panic!("infection never succeeded across 20 seeds");
    }

    #[test]
    fn test_hosted_virus_does_not_reinfect() {
        let mut agents = vec![
            spawn(1, Species::Influenza, 100.0, 100.0),
            spawn(2, Species::Epithelial, 104.0, 100.0),
        ];
        if let SpeciesState::Virus(v) = &mut agents[0].state {
            v.host = Some(99);
        }
        for seed in 0..20 {
            run_pass(&mut agents, seed);
        }
        if let SpeciesState::Body(b) = &agents[1].state {
            assert_eq!(b.infected_by, None);
        }
    }

    #[test]
    fn test_macrophage_contact_can_start_engulf() {
        let mut started = false;
        for seed in 0..30 {
            let mut agents = vec![
                spawn(1, Species::Macrophage, 100.0, 100.0),
                spawn(2, Species::EColi, 108.0, 100.0),
            ];
            let events = run_pass(&mut agents, seed);
            if events.engulf_starts > 0 {
                if let SpeciesState::Immune(immune) = &agents[0].state {
                    assert_eq!(immune.engulf.target, Some(2));
                }
                started = true;
                break;
            }
        }
        assert!(started, "engulf never started across 30 seeds");
    }

    #[test]
    fn test_immune_cell_ignores_body_tissue() {
        let mut agents = vec![
            spawn(1, Species::Neutrophil, 100.0, 100.0),
            spawn(2, Species::RedCell, 106.0, 100.0),
        ];
        let before = agents[1].health;
        for seed in 0..10 {
            run_pass(&mut agents, seed);
        }
        assert_eq!(agents[1].health, before);
    }

    #[test]
    fn test_macrophage_engulfs_damaged_tissue() {
        let mut started = false;
        for seed in 0..40 {
            let mut agents = vec![
                spawn(1, Species::Macrophage, 100.0, 100.0),
                spawn(2, Species::Epithelial, 110.0, 100.0),
            ];
            agents[1].take_damage(60.0);
            assert!(agents[1].alive);
            let events = run_pass(&mut agents, seed);
            if events.engulf_starts > 0 {
                if let SpeciesState::Immune(immune) = &agents[0].state {
                    assert_eq!(immune.engulf.target, Some(2));
                }
                started = true;
                break;
            }
        }
        assert!(started, "damaged tissue never engulfed across 40 seeds");
    }

    #[test]
    fn test_macrophage_leaves_intact_tissue_alone() {
        for seed in 0..20 {
            let mut agents = vec![
                spawn(1, Species::Macrophage, 100.0, 100.0),
                spawn(2, Species::Epithelial, 110.0, 100.0),
            ];
            let events = run_pass(&mut agents, seed);
            assert_eq!(events.engulf_starts, 0);
            assert_eq!(agents[1].health, 100.0);
        }
    }

    #[test]
    fn test_pair_mut_returns_requested_order() {
        let mut agents = vec![
            spawn(1, Species::EColi, 0.0, 0.0),
            spawn(2, Species::EColi, 10.0, 0.0),
        ];
        let (a, b) = pair_mut(&mut agents, 1, 0);
        assert_eq!(a.id, 2);
        assert_eq!(b.id, 1);
    }
}
