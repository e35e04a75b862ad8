//! Per-agent movement decision policy.
//!
//! The simulation treats the policy as an opaque function from sensed inputs
//! to a steering vector. The default implementation is a small fixed-topology
//! network; any deterministic replacement satisfying [`DecisionPolicy`] works
//! without touching the tick pipeline.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Sensed inputs: normalized x, normalized y, energy fraction, health
/// fraction, and direction-to-target (zero when idle).
pub const N_INPUTS: usize = 6;

/// Outputs: steering vector components in [-1, 1].
pub const N_OUTPUTS: usize = 2;

const N_HIDDEN: usize = 8;

/// Strategy seam between the tick pipeline and whatever decides movement.
pub trait DecisionPolicy {
    /// Map sensed inputs to a steering vector. Must be deterministic for a
    /// given policy state.
    fn decide(&self, inputs: &[f32; N_INPUTS]) -> [f32; N_OUTPUTS];
}

/// Default policy: one hidden tanh layer with randomly initialized weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpPolicy {
    w_hidden: Vec<f32>,
    b_hidden: Vec<f32>,
    w_out: Vec<f32>,
    b_out: Vec<f32>,
}

impl MlpPolicy {
    /// Random policy with weights in [-1, 1].
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut w = |n: usize| (0..n).map(|_| rng.gen_range(-1.0..1.0)).collect::<Vec<f32>>();
        Self {
            w_hidden: w(N_INPUTS * N_HIDDEN),
            b_hidden: w(N_HIDDEN),
            w_out: w(N_HIDDEN * N_OUTPUTS),
            b_out: w(N_OUTPUTS),
        }
    }

    /// Inherit with small gaussian-ish jitter on every weight.
    pub fn inherit<R: Rng>(&self, rng: &mut R, strength: f32) -> Self {
        let jitter = |v: &[f32], rng: &mut R| {
            v.iter()
                .map(|w| w + rng.gen_range(-strength..strength))
                .collect::<Vec<f32>>()
        };
        Self {
            w_hidden: jitter(&self.w_hidden, rng),
            b_hidden: jitter(&self.b_hidden, rng),
            w_out: jitter(&self.w_out, rng),
            b_out: jitter(&self.b_out, rng),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.w_hidden.len() == N_INPUTS * N_HIDDEN
            && self.b_hidden.len() == N_HIDDEN
            && self.w_out.len() == N_HIDDEN * N_OUTPUTS
            && self.b_out.len() == N_OUTPUTS
            && self
                .w_hidden
                .iter()
                .chain(&self.b_hidden)
                .chain(&self.w_out)
                .chain(&self.b_out)
                .all(|w| w.is_finite())
    }
}

impl DecisionPolicy for MlpPolicy {
    fn decide(&self, inputs: &[f32; N_INPUTS]) -> [f32; N_OUTPUTS] {
        let mut hidden = [0.0f32; N_HIDDEN];
        for (h, hv) in hidden.iter_mut().enumerate() {
            let mut sum = self.b_hidden[h];
            for (i, &x) in inputs.iter().enumerate() {
                sum += self.w_hidden[h * N_INPUTS + i] * x;
            }
            *hv = sum.tanh();
        }
        let mut out = [0.0f32; N_OUTPUTS];
        for (o, ov) in out.iter_mut().enumerate() {
            let mut sum = self.b_out[o];
            for (h, &hv) in hidden.iter().enumerate() {
                sum += self.w_out[o * N_HIDDEN + h] * hv;
            }
            *ov = sum.tanh();
        }
        out
    }
}
