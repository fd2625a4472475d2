//! WGSL compute kernels and their pipelines.
//!
//! Every kernel shares one bind group layout:
//!
//! | Binding | Resource |
//! |---------|----------|
//! | 0 | `Params` uniform |
//! | 1 | agents (read/write) |
//! | 2 | trail input (read) |
//! | 3 | trail output (read/write) |
//! | 4 | per-agent deposit cell |
//! | 5 | per-cell deposit owner (atomic) |
//! | 6 | source markers |
//! | 7 | interaction points |
//!
//! Deposits take three kernels. `agents` records each agent's target cell,
//! `claim` keeps the highest agent index per cell with `atomicMax`, and
//! `deposit` lets only that agent write. The result matches the CPU's
//! in-order scatter without depending on thread scheduling.

use bytemuck::{Pod, Zeroable};

use crate::config::SimulationConfig;
use crate::diffusion::{source_radius, REPEL_CORE};
use crate::input::MAX_MARKERS;
use crate::interactions::{TELEPORT_JITTER, TELEPORT_PROBABILITY};
use crate::population::WORKGROUP_SIZE;
use crate::shader_utils::all_utils_wgsl;

/// Largest workgroup count per dispatch dimension.
pub const MAX_GROUPS_PER_DIMENSION: u32 = 65_535;

/// Per-frame uniforms, laid out to match the WGSL `Params` struct.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ParamsGpu {
    pub width: u32,
    pub height: u32,
    pub agent_count: u32,
    pub species_count: u32,
    pub sensor_offset: f32,
    pub sensor_size: u32,
    pub sensor_angle_spacing: f32,
    pub turn_speed: f32,
    pub decay: f32,
    pub move_speed: f32,
    pub trail_weight: f32,
    pub delta: f32,
    pub seed: u32,
    pub source_count: u32,
    pub interaction_count: u32,
    pub source_radius: f32,
}

impl ParamsGpu {
    pub fn new(config: &SimulationConfig, width: u32, height: u32, agent_count: u32) -> Self {
        Self {
            width,
            height,
            agent_count,
            species_count: config.species.count(),
            sensor_offset: config.sensor_offset,
            sensor_size: config.sensor_size,
            sensor_angle_spacing: config.sensor_angle_spacing,
            turn_speed: config.turn_speed,
            decay: config.decay_factor(),
            move_speed: config.move_speed,
            trail_weight: config.trail_weight,
            delta: 0.0,
            seed: 0,
            source_count: 0,
            interaction_count: 0,
            source_radius: source_radius(width, height),
        }
    }
}

/// Declarations shared by every kernel.
const COMMON_WGSL: &str = r#"
struct Agent {
    position: vec2<f32>,
    heading: f32,
    _pad: f32,
    species: vec4<i32>,
};

struct Params {
    width: u32,
    height: u32,
    agent_count: u32,
    species_count: u32,
    sensor_offset: f32,
    sensor_size: u32,
    sensor_angle_spacing: f32,
    turn_speed: f32,
    decay: f32,
    move_speed: f32,
    trail_weight: f32,
    delta: f32,
    seed: u32,
    source_count: u32,
    interaction_count: u32,
    source_radius: f32,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var<storage, read_write> agents: array<Agent>;
@group(0) @binding(2) var<storage, read> trail_in: array<vec4<f32>>;
@group(0) @binding(3) var<storage, read_write> trail_out: array<vec4<f32>>;
@group(0) @binding(4) var<storage, read_write> deposits: array<u32>;
@group(0) @binding(5) var<storage, read_write> owners: array<atomic<u32>>;
@group(0) @binding(6) var<storage, read> sources: array<vec4<f32>>;
@group(0) @binding(7) var<storage, read> interactions: array<vec4<f32>>;

const BOUNDARY_EPSILON: f32 = 0.01;

// Flatten a 2D dispatch back into a linear work item index.
fn work_index(gid: vec3<u32>, groups: vec3<u32>) -> u32 {
    return gid.y * groups.x * 256u + gid.x;
}

fn field_size() -> vec2<f32> {
    return vec2<f32>(f32(params.width), f32(params.height));
}
"#;

const SPAWN_WGSL: &str = r#"
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) groups: vec3<u32>) {
    let i = work_index(gid, groups);
    if i >= params.agent_count {
        return;
    }

    let size = field_size();
    var seed = i;
    let s = unit_disk_sample(&seed);

    var agent: Agent;
    agent.position = clamp(s.xy * (min(size.x, size.y) / 2.0) + size / 2.0, vec2<f32>(0.0), size - BOUNDARY_EPSILON);
    agent.heading = s.z;
    agent._pad = 0.0;
    agent.species = species_mask(i, params.species_count);
    agents[i] = agent;
}
"#;

const REASSIGN_WGSL: &str = r#"
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) groups: vec3<u32>) {
    let i = work_index(gid, groups);
    if i >= params.agent_count {
        return;
    }
    agents[i].species = species_mask(i, params.species_count);
}
"#;

/// Kernel bodies that reference host constants are built at runtime.
fn inject_wgsl() -> String {
    format!(
        r#"
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) groups: vec3<u32>) {{
    let i = work_index(gid, groups);
    if i >= params.agent_count {{
        return;
    }}

    var agent = agents[i];
    let size = field_size();
    var rnd = hash(hash(i) ^ params.seed);
    var moved = false;
    for (var k = 0u; k < params.interaction_count; k++) {{
        rnd = hash(rnd);
        if unit_fraction(rnd) > {probability:?} {{
            continue;
        }}
        let spot = interactions[k];
        let jitter = unit_disk_sample(&rnd);
        agent.position = clamp(spot.xy + jitter.xy * {jitter:?}, vec2<f32>(0.0), size - BOUNDARY_EPSILON);
        agent.heading = atan2(spot.w, spot.z);
        moved = true;
    }}
    if moved {{
        agents[i] = agent;
    }}
}}
"#,
        probability = TELEPORT_PROBABILITY,
        jitter = TELEPORT_JITTER,
    )
}

const AGENTS_WGSL: &str = r#"
fn sense(agent: Agent, angle_offset: f32) -> f32 {
    let angle = agent.heading + angle_offset;
    let sensor = agent.position + vec2<f32>(cos(angle), sin(angle)) * params.sensor_offset;
    let weights = vec4<f32>(agent.species) * 2.0 - 1.0;

    let bound = i32(max(params.sensor_size, 1u)) - 1;
    let w = i32(params.width);
    let h = i32(params.height);
    let cx = clamp(i32(floor(sensor.x)), -bound - 1, w + bound);
    let cy = clamp(i32(floor(sensor.y)), -bound - 1, h + bound);

    var sum = 0.0;
    for (var dy = -bound; dy <= bound; dy++) {
        for (var dx = -bound; dx <= bound; dx++) {
            let x = cx + dx;
            let y = cy + dy;
            if x >= 0 && x < w && y >= 0 && y < h {
                sum += dot(trail_in[y * w + x], weights);
            }
        }
    }
    return sum;
}

@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) groups: vec3<u32>) {
    let i = work_index(gid, groups);
    if i >= params.agent_count {
        return;
    }

    var agent = agents[i];
    let size = field_size();

    let cell = u32(max(agent.position.y, 0.0)) * params.width + u32(max(agent.position.x, 0.0));
    let seed = hash(cell + hash(i));

    // Sense and steer.
    let forward = sense(agent, 0.0);
    let left = sense(agent, params.sensor_angle_spacing);
    let right = sense(agent, -params.sensor_angle_spacing);
    let f = unit_fraction(hash(seed));
    let max_turn = params.turn_speed * params.delta;
    if forward >= left && forward >= right {
    } else if forward < left && forward < right {
        agent.heading += (f - 0.5) * 2.0 * max_turn;
    } else if right > left {
        agent.heading -= f * max_turn;
    } else if left > right {
        agent.heading += f * max_turn;
    }

    // Move; leaving the field picks a fresh random heading.
    let direction = vec2<f32>(cos(agent.heading), sin(agent.heading));
    var position = agent.position + direction * params.move_speed * params.delta;
    if position.x < 0.0 || position.y < 0.0 || position.x >= size.x || position.y >= size.y {
        position = clamp(position, vec2<f32>(0.0), size - BOUNDARY_EPSILON);
        agent.heading = unit_fraction(seed) * TAU;
    }
    agent.position = position;
    agents[i] = agent;

    let x = min(u32(position.x), params.width - 1u);
    let y = min(u32(position.y), params.height - 1u);
    deposits[i] = y * params.width + x;
}
"#;

const CLAIM_WGSL: &str = r#"
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) groups: vec3<u32>) {
    let i = work_index(gid, groups);
    if i >= params.agent_count {
        return;
    }
    atomicMax(&owners[deposits[i]], i + 1u);
}
"#;

const DEPOSIT_WGSL: &str = r#"
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) groups: vec3<u32>) {
    let i = work_index(gid, groups);
    if i >= params.agent_count {
        return;
    }
    let cell = deposits[i];
    if atomicLoad(&owners[cell]) == i + 1u {
        trail_out[cell] = min(vec4<f32>(agents[i].species) * params.trail_weight, vec4<f32>(1.0));
    }
}
"#;

fn diffuse_wgsl() -> String {
    format!(
        r#"
@compute @workgroup_size(256)
fn main(@builtin(global_invocation_id) gid: vec3<u32>, @builtin(num_workgroups) groups: vec3<u32>) {{
    let i = work_index(gid, groups);
    let w = params.width;
    if i >= w * params.height {{
        return;
    }}
    let x = i % w;
    let y = i / w;

    var value: vec4<f32>;
    if x == 0u || y == 0u || x + 1u >= w || y + 1u >= params.height {{
        value = trail_in[i];
    }} else {{
        var sum = vec4<f32>(0.0);
        for (var dy = 0u; dy < 3u; dy++) {{
            for (var dx = 0u; dx < 3u; dx++) {{
                sum += trail_in[(y + dy - 1u) * w + x + dx - 1u];
            }}
        }}
        value = sum / 9.0;
    }}

    var rgb = value.rgb * params.decay;
    let position = vec2<f32>(f32(x), f32(y));
    for (var k = 0u; k < params.source_count; k++) {{
        let marker = sources[k];
        let d = distance(position, marker.xy) / params.source_radius;
        if d > 1.0 {{
            continue;
        }}
        if marker.z < 0.5 {{
            rgb = min(rgb, vec3<f32>(max(d - {repel_core:?}, 0.0)));
        }} else if params.species_count == 1u {{
            rgb.g = max(rgb.g, 1.0 - d);
            rgb.b = max(rgb.b, 1.0 - d);
        }} else {{
            rgb.g = max(rgb.g, 1.0 - d);
        }}
    }}

    trail_out[i] = vec4<f32>(clamp(rgb, vec3<f32>(0.0), vec3<f32>(1.0)), 1.0);
}}
"#,
        repel_core = REPEL_CORE,
    )
}

/// The compute kernels, in the order a frame may run them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kernel {
    Spawn,
    Reassign,
    Inject,
    Agents,
    Claim,
    Deposit,
    Diffuse,
}

impl Kernel {
    pub const ALL: [Kernel; 7] = [
        Kernel::Spawn,
        Kernel::Reassign,
        Kernel::Inject,
        Kernel::Agents,
        Kernel::Claim,
        Kernel::Deposit,
        Kernel::Diffuse,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Kernel::Spawn => "Spawn",
            Kernel::Reassign => "Species Reassign",
            Kernel::Inject => "Interaction Inject",
            Kernel::Agents => "Agent Update",
            Kernel::Claim => "Deposit Claim",
            Kernel::Deposit => "Deposit",
            Kernel::Diffuse => "Diffuse",
        }
    }

    /// Complete WGSL module for this kernel.
    pub fn source(&self) -> String {
        let body = match self {
            Kernel::Spawn => SPAWN_WGSL.to_string(),
            Kernel::Reassign => REASSIGN_WGSL.to_string(),
            Kernel::Inject => inject_wgsl(),
            Kernel::Agents => AGENTS_WGSL.to_string(),
            Kernel::Claim => CLAIM_WGSL.to_string(),
            Kernel::Deposit => DEPOSIT_WGSL.to_string(),
            Kernel::Diffuse => diffuse_wgsl(),
        };
        format!("{}\n{}\n{}", COMMON_WGSL, all_utils_wgsl(), body)
    }
}

/// Workgroup grid covering `items` work items.
///
/// Large counts spill into the second dimension; kernels recover the linear
/// index with `work_index`.
pub fn dispatch_size(items: u32) -> (u32, u32) {
    let groups = items.div_ceil(WORKGROUP_SIZE as u32).max(1);
    let x = groups.min(MAX_GROUPS_PER_DIMENSION);
    (x, groups.div_ceil(x))
}

/// Byte size of the marker buffers (one `vec4<f32>` per marker).
pub const MARKER_BUFFER_SIZE: u64 = (MAX_MARKERS * 16) as u64;

/// Bind group layout plus one pipeline per kernel.
pub struct Kernels {
    pub bind_group_layout: wgpu::BindGroupLayout,
    pipelines: Vec<wgpu::ComputePipeline>,
}

impl Kernels {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = create_bind_group_layout(device);
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Physarum Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipelines = Kernel::ALL
            .iter()
            .map(|kernel| {
                let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some(kernel.label()),
                    source: wgpu::ShaderSource::Wgsl(kernel.source().into()),
                });
                device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(kernel.label()),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: Some("main"),
                    compilation_options: Default::default(),
                    cache: None,
                })
            })
            .collect();

        Self {
            bind_group_layout,
            pipelines,
        }
    }

    pub fn pipeline(&self, kernel: Kernel) -> &wgpu::ComputePipeline {
        // Pipelines are built in `Kernel::ALL` order.
        &self.pipelines[kernel as usize]
    }

    /// Record `kernel` over `items` work items as its own compute pass.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        kernel: Kernel,
        bind_group: &wgpu::BindGroup,
        items: u32,
    ) {
        let (x, y) = dispatch_size(items);
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(kernel.label()),
            timestamp_writes: None,
        });
        pass.set_pipeline(self.pipeline(kernel));
        pass.set_bind_group(0, bind_group, &[]);
        pass.dispatch_workgroups(x, y, 1);
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Physarum Bind Group Layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            // Agents
            storage_entry(1, false),
            // Trail in / out
            storage_entry(2, true),
            storage_entry(3, false),
            // Deposit cells and owners
            storage_entry(4, false),
            storage_entry(5, false),
            // Markers
            storage_entry(6, true),
            storage_entry(7, true),
        ],
    })
}
