//! GPU backend.
//!
//! [`GpuSimulation`] runs the same frame as [`Simulation`](crate::Simulation)
//! with wgpu compute kernels: every pass is its own compute pass in one
//! command encoder, so each pass sees the complete output of the previous
//! one. State stays on the GPU between frames; [`GpuSimulation::read_field`]
//! and [`GpuSimulation::read_agents`] copy it back on demand.
//!
//! # Example
//!
//! ```ignore
//! let context = GpuContext::new()?;
//! let mut sim = GpuSimulation::new(context, SimulationConfig::default(), 1 << 20)?;
//! sim.initialize(1920, 1080)?;
//! for _ in 0..600 {
//!     sim.step(&FrameInput::new().with_delta(1.0 / 60.0))?;
//! }
//! let field = sim.read_field()?;
//! ```

mod field_gpu;
pub mod kernels;

use wgpu::util::DeviceExt;

use crate::config::SimulationConfig;
use crate::error::{GpuError, SimulationError};
use crate::field::TrailField;
use crate::input::{FrameInput, InteractionPoint, SourceMarker};
use crate::interactions::frame_seed;
use crate::population::{Agent, AgentCount};
use crate::simulation::StepReport;
use crate::species::{SpeciesMode, SpeciesState};
use crate::time::clamp_delta;

pub use field_gpu::{check_buffer_size, TrailBuffers, CELL_BYTES};
pub use kernels::{dispatch_size, Kernel, Kernels, ParamsGpu, MARKER_BUFFER_SIZE};

/// Headless device and queue.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Request a high-performance adapter, blocking until it is ready.
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::request())
    }

    pub async fn request() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        // Large fields and populations need the adapter's full buffer limits.
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Physarum Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: adapter.limits(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let adapter_info = adapter.get_info();
        log::debug!("Using GPU adapter {} ({:?})", adapter_info.name, adapter_info.backend);

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }
}

/// A Physarum simulation on the GPU.
pub struct GpuSimulation {
    context: GpuContext,
    kernels: Kernels,
    config: SimulationConfig,
    species: SpeciesState,
    agent_count: u32,
    agents_initialized: bool,
    frame: u64,
    params_buffer: wgpu::Buffer,
    agent_buffer: wgpu::Buffer,
    deposit_buffer: wgpu::Buffer,
    sources_buffer: wgpu::Buffer,
    interactions_buffer: wgpu::Buffer,
    field: Option<TrailBuffers>,
    /// `bind_groups[k]` reads trail buffer `k` and writes the other one.
    bind_groups: Option<[wgpu::BindGroup; 2]>,
}

impl GpuSimulation {
    /// Build pipelines and agent storage. The field is allocated by
    /// [`initialize`](Self::initialize).
    pub fn new(
        context: GpuContext,
        config: SimulationConfig,
        agent_count: usize,
    ) -> Result<Self, GpuError> {
        config.validate()?;
        let device = &context.device;

        let kernels = Kernels::new(device);
        let count = AgentCount::round(agent_count);
        let (agent_buffer, deposit_buffer) = create_agent_buffers(device, count)?;

        let params_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Params Buffer"),
            contents: bytemuck::bytes_of(&ParamsGpu::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sources_buffer = create_marker_buffer(device, "Source Marker Buffer");
        let interactions_buffer = create_marker_buffer(device, "Interaction Point Buffer");

        Ok(Self {
            kernels,
            config,
            species: SpeciesState::new(config.species),
            agent_count: count as u32,
            agents_initialized: false,
            frame: 0,
            params_buffer,
            agent_buffer,
            deposit_buffer,
            sources_buffer,
            interactions_buffer,
            field: None,
            bind_groups: None,
            context,
        })
    }

    /// Allocate (or reallocate) a cleared `width × height` field on the GPU.
    ///
    /// On failure the previous field is kept.
    pub fn initialize(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        let field = TrailBuffers::new(&self.context.device, width, height)?;
        self.field = Some(field);
        self.agents_initialized = false;
        self.rebuild_bind_groups();
        Ok(())
    }

    /// Resize the population. Returns the count actually used.
    pub fn set_agent_count(&mut self, requested: usize) -> Result<usize, GpuError> {
        let count = AgentCount::round(requested);
        let (agents, deposits) = create_agent_buffers(&self.context.device, count)?;
        self.agent_buffer = agents;
        self.deposit_buffer = deposits;
        self.agent_count = count as u32;
        self.agents_initialized = false;
        self.rebuild_bind_groups();
        log::debug!("Resized GPU population to {} agents (requested {})", count, requested);
        Ok(count)
    }

    /// Change the number of species; agents are relabeled on the next step.
    pub fn set_species_count(&mut self, count: u32) -> Result<SpeciesMode, GpuError> {
        let mode = SpeciesMode::try_from(count).map_err(|e| {
            log::warn!("Rejected species count: {}", e);
            e
        })?;
        self.config.species = mode;
        Ok(mode)
    }

    /// Replace the config. Takes effect on the next step.
    pub fn set_config(&mut self, config: SimulationConfig) -> Result<(), GpuError> {
        if let Err(e) = config.validate() {
            log::warn!("Rejected config: {}", e);
            return Err(e.into());
        }
        self.config = config;
        Ok(())
    }

    /// Record and submit one frame.
    pub fn step(&mut self, input: &FrameInput) -> Result<StepReport, GpuError> {
        let config = self.config;
        config.validate()?;
        let (field, bind_groups) = match (self.field.as_mut(), self.bind_groups.as_ref()) {
            (Some(field), Some(bind_groups)) => (field, bind_groups),
            _ => return Err(SimulationError::NotInitialized.into()),
        };

        let sources = input.honored_sources();
        let interactions = input.honored_interactions();
        let mut report = StepReport {
            frame: self.frame,
            delta: clamp_delta(input.delta),
            sources: sources.len(),
            interactions: interactions.len(),
            ..Default::default()
        };

        let mut params = ParamsGpu::new(&config, field.width, field.height, self.agent_count);
        params.delta = report.delta;
        params.seed = frame_seed(self.frame);
        params.source_count = sources.len() as u32;
        params.interaction_count = interactions.len() as u32;

        let queue = &self.context.queue;
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
        if !sources.is_empty() {
            queue.write_buffer(&self.sources_buffer, 0, bytemuck::cast_slice(&encode_sources(sources)));
        }
        if !interactions.is_empty() {
            queue.write_buffer(
                &self.interactions_buffer,
                0,
                bytemuck::cast_slice(&encode_interactions(interactions)),
            );
        }

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Physarum Frame Encoder"),
            });

        let front = field.front();
        let read_front = &bind_groups[front];
        let write_front = &bind_groups[1 - front];
        let agents = self.agent_count;

        self.species.request(config.species);
        if !self.agents_initialized {
            self.kernels.dispatch(&mut encoder, Kernel::Spawn, read_front, agents);
            self.agents_initialized = true;
            self.species.mark_applied(config.species);
            report.initialized = true;
            log::debug!("Spawned {} GPU agents ({} species)", agents, config.species.count());
        } else if let Some(mode) = self.species.take_pending() {
            self.kernels.dispatch(&mut encoder, Kernel::Reassign, read_front, agents);
            report.species_reassigned = true;
            log::debug!("Reassigned GPU agents to {} species", mode.count());
        }

        if !interactions.is_empty() {
            self.kernels.dispatch(&mut encoder, Kernel::Inject, read_front, agents);
        }

        self.kernels.dispatch(&mut encoder, Kernel::Agents, read_front, agents);
        encoder.clear_buffer(&field.owners, 0, None);
        self.kernels.dispatch(&mut encoder, Kernel::Claim, read_front, agents);
        self.kernels.dispatch(&mut encoder, Kernel::Deposit, write_front, agents);
        self.kernels
            .dispatch(&mut encoder, Kernel::Diffuse, read_front, field.cell_count());

        queue.submit(Some(encoder.finish()));
        field.swap_buffers();

        self.frame += 1;
        log::trace!("GPU frame {} submitted (dt = {:.4})", report.frame, report.delta);
        Ok(report)
    }

    /// Copy the current trail field back to the CPU.
    pub fn read_field(&self) -> Result<TrailField, GpuError> {
        let field = self
            .field
            .as_ref()
            .ok_or(GpuError::Simulation(SimulationError::NotInitialized))?;
        let bytes = self.read_buffer(field.current(), field.byte_size())?;
        let cells = bytes
            .chunks_exact(CELL_BYTES as usize)
            .map(|c| glam::Vec4::from_array(bytemuck::pod_read_unaligned(c)))
            .collect();
        Ok(TrailField::from_cells(field.width, field.height, cells)?)
    }

    /// Copy the agents back to the CPU.
    pub fn read_agents(&self) -> Result<Vec<Agent>, GpuError> {
        let size = self.agent_count as u64 * std::mem::size_of::<Agent>() as u64;
        let bytes = self.read_buffer(&self.agent_buffer, size)?;
        Ok(bytes
            .chunks_exact(std::mem::size_of::<Agent>())
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agent_count(&self) -> usize {
        self.agent_count as usize
    }

    /// Frames submitted so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Field dimensions, or `None` before [`initialize`](Self::initialize).
    pub fn field_size(&self) -> Option<(u32, u32)> {
        self.field.as_ref().map(|f| (f.width, f.height))
    }

    /// Species mode currently written into the agents.
    pub fn applied_species(&self) -> SpeciesMode {
        self.species.applied()
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    fn rebuild_bind_groups(&mut self) {
        let Some(field) = self.field.as_ref() else {
            self.bind_groups = None;
            return;
        };
        let device = &self.context.device;
        let make = |input: usize| {
            let buffers = [
                &self.params_buffer,
                &self.agent_buffer,
                &field.trail[input],
                &field.trail[1 - input],
                &self.deposit_buffer,
                &field.owners,
                &self.sources_buffer,
                &self.interactions_buffer,
            ];
            let entries: Vec<wgpu::BindGroupEntry> = buffers
                .iter()
                .enumerate()
                .map(|(binding, buffer)| wgpu::BindGroupEntry {
                    binding: binding as u32,
                    resource: buffer.as_entire_binding(),
                })
                .collect();
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Physarum Bind Group"),
                layout: &self.kernels.bind_group_layout,
                entries: &entries,
            })
        };
        self.bind_groups = Some([make(0), make(1)]);
    }

    fn read_buffer(&self, source: &wgpu::Buffer, size: u64) -> Result<Vec<u8>, GpuError> {
        let GpuContext { device, queue, .. } = &self.context;

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        queue.submit(Some(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|e| GpuError::BufferMapping(e.to_string()))?
            .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }
}

fn create_agent_buffers(
    device: &wgpu::Device,
    count: usize,
) -> Result<(wgpu::Buffer, wgpu::Buffer), GpuError> {
    let agent_bytes = (count * std::mem::size_of::<Agent>()) as u64;
    check_buffer_size(device, "agents", agent_bytes)?;

    let agents = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Agent Buffer"),
        size: agent_bytes,
        usage: wgpu::BufferUsages::STORAGE
            | wgpu::BufferUsages::COPY_SRC
            | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let deposits = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Deposit Cell Buffer"),
        size: count as u64 * 4,
        usage: wgpu::BufferUsages::STORAGE,
        mapped_at_creation: false,
    });
    Ok((agents, deposits))
}

fn create_marker_buffer(device: &wgpu::Device, label: &str) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size: MARKER_BUFFER_SIZE,
        usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Pack source markers as `(x, y, attract, 0)`.
pub(crate) fn encode_sources(sources: &[SourceMarker]) -> Vec<[f32; 4]> {
    sources
        .iter()
        .map(|s| {
            let attract = if s.attract { 1.0 } else { 0.0 };
            [s.position.x, s.position.y, attract, 0.0]
        })
        .collect()
}

/// Pack interaction points as `(x, y, dx, dy)`.
pub(crate) fn encode_interactions(points: &[InteractionPoint]) -> Vec<[f32; 4]> {
    points
        .iter()
        .map(|p| [p.position.x, p.position.y, p.direction.x, p.direction.y])
        .collect()
}
