//! Spatially-varying world conditions.
//!
//! Four scalar fields (temperature, pH, nutrients, flow) sampled on a coarse
//! grid. The simulation core touches this module only through
//! [`Environment::conditions_at`], [`Environment::consume_nutrients`] and the
//! world bounds; everything else is internal.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::EnvironmentConfig;

/// Resolution of every scalar field.
pub const FIELD_SIZE: usize = 20;

/// Conditions sampled at one point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions {
    pub temperature: f32,
    pub ph: f32,
    pub nutrients: f32,
    pub flow: f32,
}

/// One scalar field over the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Field {
    values: Vec<f32>,
}

impl Field {
    fn uniform(value: f32) -> Self {
        Self {
            values: vec![value; FIELD_SIZE * FIELD_SIZE],
        }
    }

    /// Base value with per-cell variation plus a few stronger hotspots.
    fn varied(rng: &mut ChaCha8Rng, base: f32, variation: f32, hotspots: usize, boost: f32) -> Self {
        let mut field = Self {
            values: (0..FIELD_SIZE * FIELD_SIZE)
                .map(|_| base + rng.gen_range(-variation..=variation))
                .collect(),
        };
        for _ in 0..hotspots {
            let idx = rng.gen_range(0..field.values.len());
            field.values[idx] += boost;
        }
        field
    }

    fn get(&self, gx: usize, gy: usize) -> f32 {
        self.values[gy * FIELD_SIZE + gx]
    }

    fn get_mut(&mut self, gx: usize, gy: usize) -> &mut f32 {
        &mut self.values[gy * FIELD_SIZE + gx]
    }

    /// Average each cell with its 4-neighborhood, weighted toward itself.
    fn diffuse(&mut self, rate: f32) {
        let old = self.values.clone();
        for gy in 0..FIELD_SIZE {
            for gx in 0..FIELD_SIZE {
                let mut sum = 0.0;
                let mut count = 0.0;
                for (dx, dy) in [(-1i32, 0i32), (1, 0), (0, -1), (0, 1)] {
                    let nx = gx as i32 + dx;
                    let ny = gy as i32 + dy;
                    if (0..FIELD_SIZE as i32).contains(&nx) && (0..FIELD_SIZE as i32).contains(&ny)
                    {
                        sum += old[ny as usize * FIELD_SIZE + nx as usize];
                        count += 1.0;
                    }
                }
                let here = old[gy * FIELD_SIZE + gx];
                let neighborhood = if count > 0.0 { sum / count } else { here };
                self.values[gy * FIELD_SIZE + gx] = here * (1.0 - rate) + neighborhood * rate;
            }
        }
    }

    /// Roll the field one column to the right, wrapping.
    fn shift(&mut self) {
        for gy in 0..FIELD_SIZE {
            let row = gy * FIELD_SIZE;
            self.values[row..row + FIELD_SIZE].rotate_right(1);
        }
    }
}

/// The world's scalar fields and bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Environment {
    pub width: f32,
    pub height: f32,
    tick: u64,
    temperature: Field,
    ph: Field,
    nutrients: Field,
    flow: Field,
    nutrient_cap: f32,
}

impl Environment {
    /// Build fields from configured base values with seeded variation.
    pub fn new(config: &EnvironmentConfig, width: f32, height: f32, rng: &mut ChaCha8Rng) -> Self {
        let nutrient_cap = config.nutrient_richness * 2.0;
        Self {
            width,
            height,
            tick: 0,
            temperature: Field::varied(rng, config.base_temperature, config.variation * 4.0, 3, 3.0),
            ph: Field::varied(rng, config.base_ph, config.variation, 2, 0.5),
            nutrients: Field::varied(
                rng,
                config.nutrient_richness,
                config.nutrient_richness * config.variation,
                5,
                config.nutrient_richness,
            ),
            flow: Field::varied(rng, config.flow_rate, config.variation * 0.3, 2, 0.2),
            nutrient_cap,
        }
    }

    /// Flat environment, used by tests that need predictable conditions.
    pub fn flat(config: &EnvironmentConfig, width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            tick: 0,
            temperature: Field::uniform(config.base_temperature),
            ph: Field::uniform(config.base_ph),
            nutrients: Field::uniform(config.nutrient_richness),
            flow: Field::uniform(config.flow_rate),
            nutrient_cap: config.nutrient_richness * 2.0,
        }
    }

    fn cell_of(&self, x: f32, y: f32) -> (usize, usize) {
        let gx = ((x / self.width) * FIELD_SIZE as f32).floor() as i32;
        let gy = ((y / self.height) * FIELD_SIZE as f32).floor() as i32;
        (
            gx.clamp(0, FIELD_SIZE as i32 - 1) as usize,
            gy.clamp(0, FIELD_SIZE as i32 - 1) as usize,
        )
    }

    /// Sample all four fields at a world coordinate.
    pub fn conditions_at(&self, x: f32, y: f32) -> Conditions {
        let (gx, gy) = self.cell_of(x, y);
        Conditions {
            temperature: self.temperature.get(gx, gy),
            ph: self.ph.get(gx, gy),
            nutrients: self.nutrients.get(gx, gy),
            flow: self.flow.get(gx, gy).clamp(0.0, 1.0),
        }
    }

    /// Draw nutrients from the local cell. Returns the amount actually
    /// consumed, never driving the cell below zero.
    pub fn consume_nutrients(&mut self, x: f32, y: f32, amount: f32) -> f32 {
        let (gx, gy) = self.cell_of(x, y);
        let cell = self.nutrients.get_mut(gx, gy);
        let consumed = amount.min(*cell).max(0.0);
        *cell -= consumed;
        consumed
    }

    /// Advance one tick: replenish nutrients, diffuse flow, occasionally
    /// shift the fields to keep conditions drifting.
    pub fn update(&mut self) {
        self.tick += 1;
        for cell in &mut self.nutrients.values {
            *cell = (*cell + 0.01).min(self.nutrient_cap);
        }
        self.flow.diffuse(0.1);
        if self.tick % 500 == 0 {
            self.nutrients.shift();
            self.flow.shift();
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }
}
