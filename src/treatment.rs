//! Synthetic treatments introduced into a running world.
//!
//! A treatment is administered through [`crate::world::World::administer`]
//! and applies its effect once per tick until its duration runs out. The
//! engine owns the effects; triggering (CLI, UI, scenario scripts) is left
//! to the caller.

use serde::{Deserialize, Serialize};

use crate::agent::Species;

/// The available treatment classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreatmentKind {
    /// Damages and sterilizes bacteria, scaled down by their resilience.
    Antibiotic,
    /// Suppresses viral replication and can shake viruses off their hosts.
    Antiviral,
    /// Periodically seeds beneficial flora into the world.
    Probiotic,
    /// Sustains immune activation and antibody-marks target pathogens.
    Immunization,
}

/// One administered treatment course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub kind: TreatmentKind,
    /// Potency in [0, 1].
    pub strength: f32,
    /// Total course length in ticks.
    pub duration: u32,
    /// Ticks left; the course is dropped at zero.
    pub remaining: u32,
    /// Pathogen species an immunization targets; ignored by other kinds.
    pub targets: Vec<Species>,
    pub(crate) spawn_cooldown: u32,
}

impl Treatment {
    /// Standard course for a treatment kind.
    pub fn new(kind: TreatmentKind) -> Self {
        let (duration, strength) = match kind {
            TreatmentKind::Antibiotic => (200, 0.7),
            TreatmentKind::Antiviral => (250, 0.6),
            TreatmentKind::Probiotic => (300, 0.5),
            TreatmentKind::Immunization => (400, 0.8),
        };
        let targets = match kind {
            TreatmentKind::Immunization => vec![Species::Influenza, Species::Rhinovirus],
            _ => Vec::new(),
        };
        Self {
            kind,
            strength,
            duration,
            remaining: duration,
            targets,
            spawn_cooldown: 0,
        }
    }

    /// Standard course with an overridden potency, clamped to [0, 1].
    pub fn with_strength(kind: TreatmentKind, strength: f32) -> Self {
        Self {
            strength: strength.clamp(0.0, 1.0),
            ..Self::new(kind)
        }
    }

    /// Immunization course against a specific pathogen list.
    pub fn immunization_against(targets: Vec<Species>) -> Self {
        Self {
            targets,
            ..Self::new(TreatmentKind::Immunization)
        }
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }
}
