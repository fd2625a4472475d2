//! Agent records and the population that owns them.
//!
//! The population size is always a whole number of work groups so every
//! dispatch covers exactly the agent array with no partial group.
//!
//! # Example
//!
//! ```ignore
//! let mut population = Population::new();
//! let actual = population.resize(100_000)?;
//! assert_eq!(actual, 100_096); // next multiple of 256
//! assert!(!population.is_initialized());
//! ```

use bytemuck::{Pod, Zeroable};
use glam::{IVec4, Vec2};

use crate::error::PopulationError;

/// Work-group size shared by every agent and cell dispatch.
pub const WORKGROUP_SIZE: usize = 256;

/// Smallest population the engine will run.
pub const MIN_AGENTS: usize = 1 << 10;

/// Largest population the engine will run.
pub const MAX_AGENTS: usize = 1 << 24;

/// A single agent.
///
/// Layout matches the WGSL `Agent` struct (32 bytes):
/// `position: vec2<f32>`, `heading: f32`, padding, `species: vec4<i32>`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Agent {
    /// Field-space position in cells.
    pub position: Vec2,
    /// Heading in radians.
    pub heading: f32,
    _pad: f32,
    /// Species mask, see [`SpeciesMode::mask`](crate::SpeciesMode::mask).
    pub species: IVec4,
}

impl Agent {
    pub fn new(position: Vec2, heading: f32, species: IVec4) -> Self {
        Self {
            position,
            heading,
            _pad: 0.0,
            species,
        }
    }

    /// Sensing weights, `species * 2 - 1`.
    #[inline]
    pub fn affinity(&self) -> glam::Vec4 {
        self.species.as_vec4() * 2.0 - 1.0
    }
}

/// Population size rounding.
pub struct AgentCount;

impl AgentCount {
    /// Round `requested` up to a multiple of [`WORKGROUP_SIZE`] and clamp to
    /// `[MIN_AGENTS, MAX_AGENTS]`.
    ///
    /// Idempotent: `round(round(n)) == round(n)`.
    pub fn round(requested: usize) -> usize {
        let rounded = requested
            .checked_next_multiple_of(WORKGROUP_SIZE)
            .unwrap_or(MAX_AGENTS);
        rounded.clamp(MIN_AGENTS, MAX_AGENTS)
    }
}

/// Owns the agent array and tracks whether it has been initialized.
#[derive(Debug, Default)]
pub struct Population {
    agents: Vec<Agent>,
    initialized: bool,
}

impl Population {
    /// Create an empty population. Call [`resize`](Self::resize) before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a population of `AgentCount::round(requested)` zeroed agents.
    pub fn with_count(requested: usize) -> Result<Self, PopulationError> {
        let mut population = Self::new();
        population.resize(requested)?;
        Ok(population)
    }

    /// Reallocate for `requested` agents, returning the actual count.
    ///
    /// All agents are discarded and the population is marked uninitialized.
    /// On allocation failure the previous agents are kept.
    pub fn resize(&mut self, requested: usize) -> Result<usize, PopulationError> {
        let count = AgentCount::round(requested);

        let mut agents = Vec::new();
        agents
            .try_reserve_exact(count)
            .map_err(|_| PopulationError::Allocation { requested: count })?;
        agents.resize(count, Agent::zeroed());

        log::debug!("population resized: requested {} -> {} agents", requested, count);
        self.agents = agents;
        self.initialized = false;
        Ok(count)
    }

    /// Number of agents.
    #[inline]
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether no agents are allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Whether the initializer has run since the last resize.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Force the initializer to run again on the next frame.
    pub fn invalidate(&mut self) {
        self.initialized = false;
    }

    /// Agent at `index`, if in range.
    pub fn get(&self, index: usize) -> Option<&Agent> {
        self.agents.get(index)
    }

    /// Mutable agent at `index`, if in range.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Agent> {
        self.agents.get_mut(index)
    }

    pub fn as_slice(&self) -> &[Agent] {
        &self.agents
    }

    pub fn as_mut_slice(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    /// Raw bytes for upload to a GPU buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.agents)
    }
}
