//! The simulation context and its per-frame pass sequence.
//!
//! [`Simulation`] owns everything that persists across frames: the config
//! snapshot, the agents, the trail field, the species state and the frame
//! counter. [`Simulation::step`] runs the passes in a fixed order, each one
//! finishing before the next starts:
//!
//! 1. population initialization (first frame, or after a resize), otherwise
//!    species reassignment if the species count changed
//! 2. interaction injection (only when interaction points are supplied)
//! 3. agent update
//! 4. diffusion
//!
//! # Example
//!
//! ```ignore
//! let mut sim = Simulation::new(SimulationConfig::default())?;
//! sim.set_agent_count(100_000)?;
//! sim.initialize(512, 512)?;
//! for _ in 0..600 {
//!     sim.step(&FrameInput::new().with_delta(1.0 / 60.0))?;
//! }
//! let image = sim.field().unwrap().to_rgba8();
//! ```

use crate::agents::update_agents;
use crate::config::SimulationConfig;
use crate::diffusion::diffuse;
use crate::dispatch::{Dispatch, Parallel};
use crate::error::SimulationError;
use crate::field::TrailField;
use crate::input::FrameInput;
use crate::interactions::{frame_seed, inject_interactions};
use crate::population::{Agent, Population, MIN_AGENTS};
use crate::spawn::SpawnContext;
use crate::species::{reassign_agent, SpeciesMode, SpeciesState};
use crate::time::clamp_delta;

/// What one call to [`Simulation::step`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepReport {
    /// Index of the frame that ran (0 for the first).
    pub frame: u64,
    /// Step size after clamping, in seconds.
    pub delta: f32,
    /// The population was (re)initialized this frame.
    pub initialized: bool,
    /// Species masks were rewritten this frame.
    pub species_reassigned: bool,
    /// Source markers applied during diffusion.
    pub sources: usize,
    /// Interaction points rolled against.
    pub interactions: usize,
}

/// A Physarum simulation on the CPU.
///
/// `D` decides how kernels run; the default spreads work groups over the
/// rayon pool. Use [`Serial`](crate::dispatch::Serial) for single-threaded,
/// in-order execution.
pub struct Simulation<D: Dispatch = Parallel> {
    config: SimulationConfig,
    population: Population,
    field: Option<TrailField>,
    species: SpeciesState,
    /// Per-agent deposit targets, reused across frames.
    deposits: Vec<u32>,
    frame: u64,
    dispatch: D,
}

impl Simulation<Parallel> {
    /// Create a simulation with the minimum population and no field.
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        Self::with_dispatch(config, Parallel::default())
    }
}

impl<D: Dispatch> Simulation<D> {
    /// Create a simulation that runs its kernels through `dispatch`.
    pub fn with_dispatch(config: SimulationConfig, dispatch: D) -> Result<Self, SimulationError> {
        config.validate()?;
        Ok(Self {
            config,
            population: Population::with_count(MIN_AGENTS)?,
            field: None,
            species: SpeciesState::new(config.species),
            deposits: Vec::new(),
            frame: 0,
            dispatch,
        })
    }

    /// Allocate (or reallocate) a cleared `width × height` field.
    ///
    /// Agents are respawned on the next step to fit the new size. On failure
    /// the previous field and agents are kept.
    pub fn initialize(&mut self, width: u32, height: u32) -> Result<(), SimulationError> {
        match self.field.as_mut() {
            Some(field) => field.resize(width, height)?,
            None => self.field = Some(TrailField::new(width, height)?),
        }
        self.population.invalidate();
        log::debug!("Initialized {}x{} trail field", width, height);
        Ok(())
    }

    /// Resize the population. Returns the count actually used.
    ///
    /// The count is rounded up to a whole work group and clamped to the
    /// supported range. Agents are respawned on the next step.
    pub fn set_agent_count(&mut self, requested: usize) -> Result<usize, SimulationError> {
        Ok(self.population.resize(requested)?)
    }

    /// Change the number of species. Existing agents are relabeled on the
    /// next step without moving.
    pub fn set_species_count(&mut self, count: u32) -> Result<SpeciesMode, SimulationError> {
        let mode = SpeciesMode::try_from(count).map_err(|e| {
            log::warn!("Rejected species count: {}", e);
            e
        })?;
        self.config.species = mode;
        Ok(mode)
    }

    /// Replace the config. Takes effect on the next step.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<(), SimulationError> {
        if let Err(e) = config.validate() {
            log::warn!("Rejected config: {}", e);
            return Err(e.into());
        }
        self.config = config;
        Ok(())
    }

    /// Advance one frame.
    pub fn step(&mut self, input: &FrameInput) -> Result<StepReport, SimulationError> {
        let config = self.config;
        config.validate()?;
        let field = self.field.as_mut().ok_or(SimulationError::NotInitialized)?;

        let mut report = StepReport {
            frame: self.frame,
            delta: clamp_delta(input.delta),
            ..Default::default()
        };

        self.species.request(config.species);
        if !self.population.is_initialized() {
            let ctx = SpawnContext::new(field.width(), field.height(), config.species);
            self.dispatch
                .for_each(self.population.as_mut_slice(), |i, agent| *agent = ctx.spawn(i));
            self.population.mark_initialized();
            self.species.mark_applied(config.species);
            report.initialized = true;
            log::debug!(
                "Spawned {} agents ({} species)",
                self.population.len(),
                config.species.count()
            );
        } else if let Some(mode) = self.species.take_pending() {
            self.dispatch.for_each(self.population.as_mut_slice(), |i, agent| {
                reassign_agent(i, agent, mode)
            });
            report.species_reassigned = true;
            log::debug!("Reassigned agents to {} species", mode.count());
        }

        let interactions = input.honored_interactions();
        if !interactions.is_empty() {
            inject_interactions(
                &self.dispatch,
                self.population.as_mut_slice(),
                interactions,
                frame_seed(self.frame),
                field.size(),
            );
        }
        report.interactions = interactions.len();

        self.deposits.resize(self.population.len(), 0);
        update_agents(
            &self.dispatch,
            self.population.as_mut_slice(),
            &mut self.deposits,
            field,
            config,
            report.delta,
        );

        let sources = input.honored_sources();
        diffuse(&self.dispatch, field, &config, sources);
        report.sources = sources.len();

        self.frame += 1;
        log::trace!("Frame {} done (dt = {:.4})", report.frame, report.delta);
        Ok(report)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The trail field, or `None` before [`initialize`](Self::initialize).
    pub fn field(&self) -> Option<&TrailField> {
        self.field.as_ref()
    }

    pub fn agents(&self) -> &[Agent] {
        self.population.as_slice()
    }

    pub fn agent_count(&self) -> usize {
        self.population.len()
    }

    /// Frames stepped so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Species mode currently written into the agents.
    pub fn applied_species(&self) -> SpeciesMode {
        self.species.applied()
    }

    pub fn dispatch(&self) -> &D {
        &self.dispatch
    }
}
