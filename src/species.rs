//! Species policies and lazy reassignment.
//!
//! A species is a set of trail channels. Each agent carries a 0/1 mask over
//! the four field channels (r, g, b, a); the alpha slot is always 1. When
//! sensing, the mask is mapped to `mask * 2 - 1`, so same-species channels
//! attract and the other channels repel.
//!
//! | Mode | Agents | Mask |
//! |------|--------|------|
//! | `Mono` | all | `(0, 1, 1, 1)` |
//! | `Binary` | even / odd index | `(0, 0, 1, 1)` / `(0, 1, 0, 1)` |
//! | `Ternary` | `i % 3 == 0 / 1 / 2` | `(0, 0, 1, 1)` / `(0, 1, 0, 1)` / `(1, 0, 0, 1)` |

use glam::IVec4;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::population::Agent;

/// How many species share the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SpeciesMode {
    /// One species painting the green and blue channels.
    #[default]
    Mono,
    /// Two species on green / blue.
    Binary,
    /// Three species on red / green / blue.
    Ternary,
}

impl SpeciesMode {
    /// Number of species.
    pub fn count(&self) -> u32 {
        match self {
            SpeciesMode::Mono => 1,
            SpeciesMode::Binary => 2,
            SpeciesMode::Ternary => 3,
        }
    }

    /// Mask for the agent at `index`.
    #[inline]
    pub fn mask(&self, index: u32) -> IVec4 {
        match self {
            SpeciesMode::Mono => IVec4::new(0, 1, 1, 1),
            SpeciesMode::Binary => {
                let odd = (index % 2) as i32;
                IVec4::new(0, odd, 1 - odd, 1)
            }
            SpeciesMode::Ternary => {
                let slot = index % 3;
                IVec4::new((slot == 2) as i32, (slot == 1) as i32, (slot == 0) as i32, 1)
            }
        }
    }

    /// Whether source markers should feed both species channels.
    pub fn is_mono(&self) -> bool {
        matches!(self, SpeciesMode::Mono)
    }
}

impl TryFrom<u32> for SpeciesMode {
    type Error = ConfigError;

    fn try_from(count: u32) -> Result<Self, Self::Error> {
        match count {
            1 => Ok(SpeciesMode::Mono),
            2 => Ok(SpeciesMode::Binary),
            3 => Ok(SpeciesMode::Ternary),
            n => Err(ConfigError::SpeciesCount(n)),
        }
    }
}

impl From<SpeciesMode> for u32 {
    fn from(mode: SpeciesMode) -> u32 {
        mode.count()
    }
}

/// Lazy reassignment state: the mode last written into the agents versus the
/// mode the caller asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpeciesState {
    applied: SpeciesMode,
    requested: SpeciesMode,
}

/// The two states of [`SpeciesState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeciesPhase {
    /// Agents carry the requested masks.
    Current,
    /// Agents carry masks for a different mode.
    Stale,
}

impl SpeciesState {
    pub fn new(mode: SpeciesMode) -> Self {
        Self {
            applied: mode,
            requested: mode,
        }
    }

    pub fn phase(&self) -> SpeciesPhase {
        if self.applied == self.requested {
            SpeciesPhase::Current
        } else {
            SpeciesPhase::Stale
        }
    }

    pub fn applied(&self) -> SpeciesMode {
        self.applied
    }

    pub fn requested(&self) -> SpeciesMode {
        self.requested
    }

    /// Set the target mode. Requesting the applied mode clears any pending
    /// change, so the next [`take_pending`](Self::take_pending) returns `None`.
    pub fn request(&mut self, mode: SpeciesMode) {
        self.requested = mode;
    }

    /// Returns the mode to apply if stale and records it as applied.
    pub fn take_pending(&mut self) -> Option<SpeciesMode> {
        match self.phase() {
            SpeciesPhase::Current => None,
            SpeciesPhase::Stale => {
                self.applied = self.requested;
                Some(self.applied)
            }
        }
    }

    /// Record that freshly initialized agents already carry `mode`.
    pub fn mark_applied(&mut self, mode: SpeciesMode) {
        self.applied = mode;
        self.requested = mode;
    }
}

/// Reassignment kernel: rewrite the mask, keep position and heading.
#[inline]
pub fn reassign_agent(index: usize, agent: &mut Agent, mode: SpeciesMode) {
    agent.species = mode.mask(index as u32);
}
