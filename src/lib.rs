//! # Physarum - slime-mold trail simulation
//!
//! Large populations of simple agents that wander a 2D trail field, follow
//! the trail they sense ahead of them, and deposit more of it. Networks of
//! veins emerge from nothing but that feedback loop plus diffusion and
//! evaporation of the trail.
//!
//! The same frame runs on the CPU ([`Simulation`], rayon work groups) or on
//! the GPU ([`GpuSimulation`], wgpu compute kernels).
//!
//! ## Quick Start
//!
//! ```ignore
//! use physarum::prelude::*;
//!
//! fn main() -> Result<(), SimulationError> {
//!     let mut sim = Simulation::new(SimulationConfig::default())?;
//!     sim.set_agent_count(250_000)?;
//!     sim.initialize(1024, 1024)?;
//!
//!     for _ in 0..600 {
//!         sim.step(&FrameInput::new().with_delta(1.0 / 60.0))?;
//!     }
//!     sim.field().unwrap().to_rgba8().save("physarum.png").ok();
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Agents
//!
//! Each [`Agent`] has a position, a heading and a species mask. Every frame
//! it reads three sensors (forward, left, right), turns toward the strongest
//! reading with some randomness, moves, and writes trail into its cell.
//!
//! ### Trail Field
//!
//! A [`TrailField`] holds one channel per species (r, g, b). Agents are drawn
//! to their own species' channel and repelled by the others. After the agents
//! move, the field is blurred and decays by `evaporation_speed`.
//!
//! ### Species
//!
//! Up to three species share the field ([`SpeciesMode`]). Changing the
//! count relabels agents in place on the next frame.
//!
//! ### Per-Frame Input
//!
//! [`FrameInput`] carries the elapsed time plus optional [`SourceMarker`]s
//! (paint or erase trail around a point) and [`InteractionPoint`]s (pull a
//! trickle of agents to a point).
//!
//! ### Determinism
//!
//! All randomness is a pure hash of agent index and frame number, so a run is
//! reproducible, and [`Serial`] and [`Parallel`] dispatch produce identical
//! results.

pub mod agents;
pub mod config;
pub mod diffusion;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod gpu;
pub mod input;
pub mod interactions;
pub mod population;
pub mod random;
pub mod shader_utils;
mod simulation;
pub mod spawn;
pub mod species;
pub mod time;

pub use bytemuck;
pub use config::SimulationConfig;
pub use dispatch::{Dispatch, Parallel, Serial};
pub use error::{ConfigError, FieldError, GpuError, PopulationError, SimulationError};
pub use field::TrailField;
pub use glam::{IVec4, Vec2, Vec4};
pub use gpu::{GpuContext, GpuSimulation};
pub use input::{FrameInput, InteractionPoint, SourceMarker};
pub use population::{Agent, AgentCount, Population};
pub use simulation::{Simulation, StepReport};
pub use species::{SpeciesMode, SpeciesState};
pub use time::FrameClock;

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use physarum::prelude::*;
/// ```
///
/// This imports:
/// - [`Simulation`] and [`GpuSimulation`] - the two backends
/// - [`SimulationConfig`] and [`SpeciesMode`] - parameters
/// - [`FrameInput`], [`SourceMarker`], [`InteractionPoint`] - per-frame input
/// - [`Vec2`], [`Vec4`] - glam vector types
pub mod prelude {
    pub use crate::config::SimulationConfig;
    pub use crate::dispatch::{Dispatch, Parallel, Serial};
    pub use crate::error::{GpuError, SimulationError};
    pub use crate::field::TrailField;
    pub use crate::gpu::{GpuContext, GpuSimulation};
    pub use crate::input::{FrameInput, InteractionPoint, SourceMarker};
    pub use crate::population::Agent;
    pub use crate::simulation::{Simulation, StepReport};
    pub use crate::species::SpeciesMode;
    pub use crate::time::FrameClock;
    pub use glam::{Vec2, Vec4};
}
