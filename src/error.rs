//! Error types for the Physarum engine.
//!
//! Every fallible operation leaves the previous simulation state untouched:
//! a failed resize keeps the old buffers, a rejected config keeps the old
//! config, and a failed step does not advance the frame.

use std::fmt;

/// Errors raised while (re)allocating the trail field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Width or height is zero, or `width * height` overflows.
    InvalidDimensions { width: u32, height: u32 },
    /// The cell buffer could not be reserved.
    Allocation { cells: usize },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::InvalidDimensions { width, height } => {
                write!(f, "Invalid trail field dimensions {}x{}", width, height)
            }
            FieldError::Allocation { cells } => {
                write!(f, "Failed to allocate trail field of {} cells", cells)
            }
        }
    }
}

impl std::error::Error for FieldError {}

/// Errors raised while resizing the agent population.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopulationError {
    /// The agent buffer could not be reserved.
    Allocation { requested: usize },
}

impl fmt::Display for PopulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationError::Allocation { requested } => {
                write!(f, "Failed to allocate population of {} agents", requested)
            }
        }
    }
}

impl std::error::Error for PopulationError {}

/// Out-of-domain simulation parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A parameter is NaN or infinite.
    NonFinite { name: &'static str },
    /// A parameter lies outside its allowed range.
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    /// Species count is not 1, 2 or 3.
    SpeciesCount(u32),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonFinite { name } => write!(f, "Config value '{}' is not finite", name),
            ConfigError::OutOfRange { name, value, min, max } => write!(
                f,
                "Config value '{}' = {} is outside [{}, {}]",
                name, value, min, max
            ),
            ConfigError::SpeciesCount(n) => {
                write!(f, "Species count must be 1, 2 or 3 (got {})", n)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors surfaced by [`Simulation`](crate::Simulation) operations.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Trail field allocation failed.
    Field(FieldError),
    /// Population allocation failed.
    Population(PopulationError),
    /// The configuration was rejected.
    Config(ConfigError),
    /// `step` was called before `initialize`.
    NotInitialized,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::Field(e) => write!(f, "Field error: {}", e),
            SimulationError::Population(e) => write!(f, "Population error: {}", e),
            SimulationError::Config(e) => write!(f, "Config error: {}", e),
            SimulationError::NotInitialized => write!(
                f,
                "Simulation has no trail field. Call initialize(width, height) first."
            ),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Field(e) => Some(e),
            SimulationError::Population(e) => Some(e),
            SimulationError::Config(e) => Some(e),
            SimulationError::NotInitialized => None,
        }
    }
}

impl From<FieldError> for SimulationError {
    fn from(e: FieldError) -> Self {
        SimulationError::Field(e)
    }
}

impl From<PopulationError> for SimulationError {
    fn from(e: PopulationError) -> Self {
        SimulationError::Population(e)
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

/// Errors that can occur in the GPU backend.
#[derive(Debug)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// Failed to map buffer for reading.
    BufferMapping(String),
    /// A buffer would exceed the device limits.
    BufferTooLarge { label: &'static str, size: u64, max: u64 },
    /// Engine-level failure (config, field size, agent count).
    Simulation(SimulationError),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::BufferMapping(msg) => write!(f, "Failed to map GPU buffer: {}", msg),
            GpuError::BufferTooLarge { label, size, max } => write!(
                f,
                "GPU buffer '{}' needs {} bytes but the device allows {}",
                label, size, max
            ),
            GpuError::Simulation(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::DeviceCreation(e) => Some(e),
            GpuError::Simulation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

impl From<SimulationError> for GpuError {
    fn from(e: SimulationError) -> Self {
        GpuError::Simulation(e)
    }
}

impl From<ConfigError> for GpuError {
    fn from(e: ConfigError) -> Self {
        GpuError::Simulation(SimulationError::Config(e))
    }
}

impl From<FieldError> for GpuError {
    fn from(e: FieldError) -> Self {
        GpuError::Simulation(SimulationError::Field(e))
    }
}
