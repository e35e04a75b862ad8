//! Symbolic genome and derived traits.
//!
//! Each agent carries a fixed-length sequence over a 4-symbol alphabet.
//! Behavioral traits are decoded once at construction and after every
//! mutation; nothing reads the raw sequence during simulation.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of every genome sequence.
pub const GENOME_LEN: usize = 12;

/// The four bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Base {
    A,
    T,
    G,
    C,
}

impl Base {
    pub const ALL: [Base; 4] = [Base::A, Base::T, Base::G, Base::C];

    fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..4)]
    }
}

/// Fixed-length base sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    sequence: Vec<Base>,
}

impl Genome {
    /// Random genome of the standard length.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let sequence = (0..GENOME_LEN).map(|_| Base::random(rng)).collect();
        Self { sequence }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Point mutation: with probability `rate`, replace one random base.
    /// Returns true if a base changed.
    pub fn mutate<R: Rng>(&mut self, rng: &mut R, rate: f32) -> bool {
        if self.sequence.is_empty() || rng.gen::<f32>() >= rate {
            return false;
        }
        let pos = rng.gen_range(0..self.sequence.len());
        let old = self.sequence[pos];
        self.sequence[pos] = Base::random(rng);
        self.sequence[pos] != old
    }

    fn count(&self, base: Base) -> usize {
        self.sequence.iter().filter(|&&b| b == base).count()
    }

    /// Decode the sequence into behavioral traits. Each trait is a simple
    /// function of base frequencies, centered so a uniform genome yields
    /// neutral (1.0 or mid-range) values.
    pub fn decode(&self) -> Traits {
        let n = self.sequence.len().max(1) as f32;
        let a = self.count(Base::A) as f32 / n;
        let t = self.count(Base::T) as f32 / n;
        let g = self.count(Base::G) as f32 / n;
        let c = self.count(Base::C) as f32 / n;

        Traits {
            speed: 0.8 + 1.6 * a,
            resilience: 0.8 + 1.6 * t,
            evasion: (g * 1.5).min(0.5),
            aggression: 0.8 + 1.6 * c,
            surface_mutation: (g + c) * 0.2,
        }
    }
}

/// Traits decoded from a genome. Multiplicative factors sit around 1.0;
/// `evasion` and `surface_mutation` are probabilities in [0, 0.5].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    /// Movement speed factor.
    pub speed: f32,
    /// Environmental damage resistance factor.
    pub resilience: f32,
    /// Chance to dodge an opportunistic immune attack.
    pub evasion: f32,
    /// Attack damage factor.
    pub aggression: f32,
    /// Extra evasion for viruses with drifting surface proteins.
    pub surface_mutation: f32,
}

impl Default for Traits {
    fn default() -> Self {
        Self {
            speed: 1.0,
            resilience: 1.0,
            evasion: 0.25,
            aggression: 1.0,
            surface_mutation: 0.1,
        }
    }
}
