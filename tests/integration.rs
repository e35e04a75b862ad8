//! Integration tests for microcosm

use microcosm::agent::SpeciesState;
use microcosm::{Category, Config, Species, World, WorldSnapshot};

fn small_config() -> Config {
    let mut config = Config::default();
    config.population.max_organisms = 200;
    config.population.initial_bacteria = 25;
    config.population.initial_viruses = 10;
    config.population.initial_immune_cells = 12;
    config.population.initial_body_cells = 50;
    config.logging.stats_interval = 25;
    config
}

#[test]
fn test_full_simulation_cycle() {
    let config = small_config();
    let cap = config.population.max_organisms;
    let width = config.world.width;
    let height = config.world.height;

    let mut world = World::new_with_seed(config, 12345);
    world.run(500);

    assert!(world.time <= 500);
    assert!(world.population() <= cap);
    for agent in &world.agents {
        assert!(agent.alive);
        assert!(agent.health > 0.0);
        assert!(agent.x >= 0.0 && agent.x <= width);
        assert!(agent.y >= 0.0 && agent.y <= height);
    }
}

#[test]
fn test_cap_holds_under_spawn_pressure() {
    let mut config = small_config();
    config.population.max_organisms = 80;
    config.spawn.interval = 5;
    config.spawn.count = 30;
    let mut world = World::new_with_seed(config, 54321);
    for _ in 0..400 {
        world.step();
        assert!(
            world.population() <= 80,
            "cap violated at tick {}: {}",
            world.time,
            world.population()
        );
    }
}

#[test]
fn test_reproducibility() {
    let config = small_config();
    let mut world1 = World::new_with_seed(config.clone(), 99999);
    let mut world2 = World::new_with_seed(config, 99999);

    world1.run(300);
    world2.run(300);

    assert_eq!(world1.time, world2.time);
    assert_eq!(world1.agents.len(), world2.agents.len());
    for (a, b) in world1.agents.iter().zip(&world2.agents) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.species, b.species);
        assert_eq!(a.x, b.x);
        assert_eq!(a.health, b.health);
    }
}

#[test]
fn test_population_dynamics() {
    let mut world = World::new_with_seed(small_config(), 77777);

    let mut populations = Vec::new();
    for _ in 0..8 {
        world.run(100);
        populations.push(world.population());
        if world.is_extinct() {
            break;
        }
    }
    println!("population over time: {:?}", populations);
    assert!(!populations.is_empty());
}

#[test]
fn test_immune_response_suppresses_marked_viruses() {
    // With plenty of immune cells the marked-virus count should stay
    // bounded by the virus count, and locks must always point at live prey.
    let mut config = small_config();
    config.population.initial_immune_cells = 30;
    config.population.initial_viruses = 20;
    let mut world = World::new_with_seed(config, 13579);

    for _ in 0..300 {
        world.step();
        assert!(world.stats.marked_viruses <= world.stats.viruses);
        for agent in &world.agents {
            if let SpeciesState::Immune(immune) = &agent.state {
                if let Some(target) = immune.target {
                    if let Some(idx) = world.lookup(target) {
                        assert!(world.agents[idx].alive);
                        let prey = &world.agents[idx];
                        assert!(
                            prey.species.is_pathogen(),
                            "immune cell locked onto {:?}",
                            prey.species
                        );
                    }
                }
            }
        }
    }
}

#[test]
fn test_infection_lifecycle() {
    // Seed a virus-heavy world and check that host references stay
    // consistent with the infected cells' back-references.
    let mut config = small_config();
    config.population.initial_viruses = 30;
    config.population.initial_body_cells = 80;
    config.population.initial_immune_cells = 0;
    let mut world = World::new_with_seed(config, 2468);

    let mut saw_infection = false;
    for _ in 0..500 {
        world.step();
        for agent in &world.agents {
            if let SpeciesState::Virus(virus) = &agent.state {
                if let Some(host) = virus.host {
                    saw_infection = true;
                    if let Some(idx) = world.lookup(host) {
                        assert_eq!(world.agents[idx].category(), Category::Body);
                    }
                }
            }
        }
        if saw_infection && world.time > 100 {
            break;
        }
    }
    assert!(saw_infection, "no infection occurred in 500 ticks");
}

#[test]
fn test_stats_tracking() {
    let mut world = World::new_with_seed(small_config(), 33333);
    world.run(100);

    assert!(world.stats.time > 0);
    assert!(world.stats.time <= 100);
    assert!(!world.stats_history.snapshots.is_empty());
    let series = world.stats_history.population_series();
    assert!(!series.is_empty());
    // Categories sum to the total.
    let s = &world.stats;
    assert_eq!(
        s.bacteria + s.viruses + s.immune_cells + s.body_cells,
        s.population
    );
}

#[test]
fn test_snapshot_roundtrip() {
    let mut world = World::new_with_seed(small_config(), 44444);
    world.run(50);

    let snapshot = WorldSnapshot::capture(&world);
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: WorldSnapshot = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.time, world.time);
    assert_eq!(restored.agents.len(), world.population());
    for agent in &restored.agents {
        assert!(agent.size > 0.0);
        assert!(agent.species.category() == agent.category);
    }
}

#[test]
fn test_config_file_fallbacks() {
    let dir = std::env::temp_dir();
    let path = dir.join("microcosm_partial_config.yaml");
    std::fs::write(&path, "simulation:\n  mutation_rate: 0.2\nspawn:\n  interval: 0\n").unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.simulation.mutation_rate, 0.2);
    assert_eq!(config.spawn.interval, 0);
    // Everything else falls back to defaults.
    assert_eq!(config.population.max_organisms, 800);
    assert_eq!(config.population.viral_burst_count, 5);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_spawn_species_configuration() {
    let mut config = small_config();
    config.spawn.interval = 10;
    config.spawn.count = 5;
    config.spawn.species = vec![Species::Beneficial];
    config.population.initial_bacteria = 0;
    let mut world = World::new_with_seed(config, 8642);

    world.run(50);
    let beneficial = world
        .agents
        .iter()
        .filter(|a| a.species == Species::Beneficial)
        .count();
    assert!(beneficial > 0, "injection never added configured species");
}
