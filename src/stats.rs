//! Simulation statistics and history.

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, Category, SpeciesState};

/// Event counters accumulated over one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    pub births: u32,
    pub spawned: u32,
    pub deaths: u32,
    pub culls: u32,
    pub infections: u32,
    pub marks: u32,
    pub engulf_starts: u32,
    pub digested: u32,
    pub attacks: u32,
    pub kills: u32,
}

/// Snapshot of the population at one tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub time: u64,
    pub population: usize,
    pub bacteria: usize,
    pub viruses: usize,
    pub immune_cells: usize,
    pub body_cells: usize,
    pub infected_cells: usize,
    pub marked_viruses: usize,
    pub mean_energy: f32,
    pub mean_health: f32,
    pub events: TickEvents,
}

impl Stats {
    /// Aggregate over the live population.
    pub fn collect(time: u64, agents: &[Agent], events: TickEvents) -> Self {
        let mut stats = Stats {
            time,
            events,
            ..Default::default()
        };
        let mut energy_sum = 0.0;
        let mut health_sum = 0.0;
        for agent in agents.iter().filter(|a| a.alive) {
            stats.population += 1;
            energy_sum += agent.energy;
            health_sum += agent.health;
            match agent.category() {
                Category::Bacterium => stats.bacteria += 1,
                Category::Virus => stats.viruses += 1,
                Category::Immune => stats.immune_cells += 1,
                Category::Body => stats.body_cells += 1,
            }
            match &agent.state {
                SpeciesState::Virus(v) if v.marked => stats.marked_viruses += 1,
                SpeciesState::Body(b) if b.infected_by.is_some() => stats.infected_cells += 1,
                _ => {}
            }
        }
        if stats.population > 0 {
            energy_sum /= stats.population as f32;
            health_sum /= stats.population as f32;
        }
        stats.mean_energy = energy_sum;
        stats.mean_health = health_sum;
        stats
    }

    /// One-line progress report.
    pub fn summary(&self) -> String {
        format!(
            "t={:6} pop={:4} (bact={} vir={} imm={} body={}) infected={} marked={} E={:.1} H={:.1} +{} -{}",
            self.time,
            self.population,
            self.bacteria,
            self.viruses,
            self.immune_cells,
            self.body_cells,
            self.infected_cells,
            self.marked_viruses,
            self.mean_energy,
            self.mean_health,
            self.events.births + self.events.spawned,
            self.events.deaths + self.events.culls,
        )
    }
}

/// Time series of snapshots, exportable as JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    pub snapshots: Vec<Stats>,
}

impl StatsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stats: Stats) {
        self.snapshots.push(stats);
    }

    pub fn population_series(&self) -> Vec<(u64, usize)> {
        self.snapshots.iter().map(|s| (s.time, s.population)).collect()
    }

    pub fn save_json<P: AsRef<std::path::Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(&self.snapshots)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
