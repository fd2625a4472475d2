//! Population initialization.
//!
//! Agents start in a center-biased disk that fills the smaller field
//! dimension, each facing back toward the center, so the first frames show
//! a contracting ring that breaks into a network.
//!
//! Initialization is a pure function of the agent index, the field size and
//! the species mode: running it twice yields identical agents. Positions are
//! clamped into the field like any boundary hit, since a disk sample on the
//! rim lands exactly on the far edge.

use glam::Vec2;

use crate::agents::BOUNDARY_EPSILON;
use crate::population::Agent;
use crate::random::unit_disk_sample;
use crate::species::SpeciesMode;

/// Shared inputs of the initializer kernel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnContext {
    /// Disk center (field center).
    pub center: Vec2,
    /// Disk radius, `min(width, height) / 2`.
    pub radius: f32,
    /// Field extent; spawned positions stay below it.
    pub size: Vec2,
    pub species: SpeciesMode,
}

impl SpawnContext {
    /// Context for a `width × height` field.
    pub fn new(width: u32, height: u32, species: SpeciesMode) -> Self {
        let size = Vec2::new(width as f32, height as f32);
        Self {
            center: size / 2.0,
            radius: width.min(height) as f32 / 2.0,
            size,
            species,
        }
    }

    /// Initializer kernel for the agent at `index`.
    #[inline]
    pub fn spawn(&self, index: usize) -> Agent {
        let mut seed = index as u32;
        let sample = unit_disk_sample(&mut seed);
        let position = (Vec2::new(sample.x, sample.y) * self.radius + self.center)
            .clamp(Vec2::ZERO, self.size - BOUNDARY_EPSILON);
        Agent::new(position, sample.angle, self.species.mask(index as u32))
    }
}
