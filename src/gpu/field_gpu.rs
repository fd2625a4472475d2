//! GPU storage for the trail field.

use wgpu::util::DeviceExt;

use crate::error::{FieldError, GpuError};
use crate::field::CLEARED_CELL;

/// Bytes per trail cell (`vec4<f32>`).
pub const CELL_BYTES: u64 = 16;

/// Ping-pong trail buffers plus the per-cell deposit owner buffer.
pub struct TrailBuffers {
    pub width: u32,
    pub height: u32,
    /// Trail buffers A and B.
    pub trail: [wgpu::Buffer; 2],
    /// Atomic owner per cell, cleared before each deposit claim.
    pub owners: wgpu::Buffer,
    /// Which trail buffer is current (0 = A, 1 = B).
    front: usize,
}

impl TrailBuffers {
    /// Allocate cleared buffers for a `width × height` field.
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Result<Self, GpuError> {
        let cells = width as u64 * height as u64;
        if cells == 0 || cells > u32::MAX as u64 {
            return Err(FieldError::InvalidDimensions { width, height }.into());
        }
        check_buffer_size(device, "trail", cells * CELL_BYTES)?;

        let cleared = vec![CLEARED_CELL; cells as usize];
        let trail = ["Trail Buffer A", "Trail Buffer B"].map(|label| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(&cleared),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC
                    | wgpu::BufferUsages::COPY_DST,
            })
        });

        let owners = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Deposit Owner Buffer"),
            size: cells * 4,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        log::debug!(
            "Allocated {}x{} GPU trail field ({} bytes)",
            width,
            height,
            cells * (CELL_BYTES * 2 + 4)
        );

        Ok(Self {
            width,
            height,
            trail,
            owners,
            front: 0,
        })
    }

    pub fn cell_count(&self) -> u32 {
        self.width * self.height
    }

    /// Index of the current trail buffer.
    pub fn front(&self) -> usize {
        self.front
    }

    /// The buffer agents sense from and that readback copies.
    pub fn current(&self) -> &wgpu::Buffer {
        &self.trail[self.front]
    }

    /// Make the other buffer current after diffusion.
    pub fn swap_buffers(&mut self) {
        self.front = 1 - self.front;
    }

    pub fn byte_size(&self) -> u64 {
        self.cell_count() as u64 * CELL_BYTES
    }
}

/// Reject buffers the device cannot bind as storage.
pub fn check_buffer_size(device: &wgpu::Device, label: &'static str, size: u64) -> Result<(), GpuError> {
    let limits = device.limits();
    let max = (limits.max_storage_buffer_binding_size as u64).min(limits.max_buffer_size);
    if size > max {
        log::warn!("{} buffer of {} bytes exceeds device limit {}", label, size, max);
        return Err(GpuError::BufferTooLarge { label, size, max });
    }
    Ok(())
}
