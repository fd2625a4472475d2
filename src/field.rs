//! The 2D trail field.
//!
//! A dense `width × height` grid of `Vec4` cells. Channels r, g and b hold
//! the trail of up to three species; alpha is held at 1.0 so the buffer has a
//! uniform RGBA float layout for upload and display.
//!
//! The field is double-buffered. Agents read the front buffer and scatter
//! their deposits into it after every agent has moved; the diffusion pass
//! reads front, writes back and swaps. No pass ever reads a cell that another
//! work item of the same pass writes.
//!
//! # Memory Usage
//!
//! Two buffers of 16 bytes per cell:
//!
//! - 512×512 = 8MB
//! - 1920×1080 = 63MB
//! - 4096×4096 = 512MB

use glam::Vec4;

use crate::error::FieldError;

/// Value every cell holds after allocation or [`TrailField::clear`].
pub const CLEARED_CELL: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// Double-buffered RGBA float trail field.
#[derive(Clone, Debug)]
pub struct TrailField {
    width: u32,
    height: u32,
    front: Vec<Vec4>,
    back: Vec<Vec4>,
}

impl TrailField {
    /// Allocate a cleared field.
    pub fn new(width: u32, height: u32) -> Result<Self, FieldError> {
        let cells = Self::cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            front: Self::allocate(cells)?,
            back: Self::allocate(cells)?,
        })
    }

    /// Build a field from existing front-buffer contents (e.g. a GPU readback).
    pub fn from_cells(width: u32, height: u32, cells: Vec<Vec4>) -> Result<Self, FieldError> {
        let count = Self::cell_count(width, height)?;
        if cells.len() != count {
            return Err(FieldError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            back: Self::allocate(count)?,
            front: cells,
        })
    }

    fn cell_count(width: u32, height: u32) -> Result<usize, FieldError> {
        if width == 0 || height == 0 {
            return Err(FieldError::InvalidDimensions { width, height });
        }
        (width as usize)
            .checked_mul(height as usize)
            .filter(|&cells| cells.checked_mul(2 * std::mem::size_of::<Vec4>()).is_some())
            .ok_or(FieldError::InvalidDimensions { width, height })
    }

    fn allocate(cells: usize) -> Result<Vec<Vec4>, FieldError> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(cells)
            .map_err(|_| FieldError::Allocation { cells })?;
        buffer.resize(cells, CLEARED_CELL);
        Ok(buffer)
    }

    /// Reallocate for new dimensions and clear.
    ///
    /// On failure the current contents and size are kept.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), FieldError> {
        *self = Self::new(width, height)?;
        log::debug!("trail field allocated: {}x{}", width, height);
        Ok(())
    }

    /// Reset every cell to [`CLEARED_CELL`].
    pub fn clear(&mut self) {
        self.front.fill(CLEARED_CELL);
        self.back.fill(CLEARED_CELL);
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)` as floats.
    #[inline]
    pub fn size(&self) -> glam::Vec2 {
        glam::Vec2::new(self.width as f32, self.height as f32)
    }

    /// Total number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.front.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.front.is_empty()
    }

    /// Memory size in bytes of both buffers.
    pub fn memory_size(&self) -> usize {
        self.len() * 2 * std::mem::size_of::<Vec4>()
    }

    /// Linear index of an in-bounds cell.
    #[inline]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Whether the signed cell coordinate lies inside the field.
    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Cell value, or `None` outside the field.
    pub fn get(&self, x: i32, y: i32) -> Option<Vec4> {
        if self.contains(x, y) {
            Some(self.front[self.index(x as u32, y as u32)])
        } else {
            None
        }
    }

    /// Overwrite a cell. Returns `false` (and writes nothing) outside the field.
    pub fn set(&mut self, x: i32, y: i32, value: Vec4) -> bool {
        if !self.contains(x, y) {
            return false;
        }
        let idx = self.index(x as u32, y as u32);
        self.front[idx] = value;
        true
    }

    /// Read-only view of the current field state.
    #[inline]
    pub fn cells(&self) -> &[Vec4] {
        &self.front
    }

    /// Raw bytes of the current state, for upload to a GPU buffer.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.front)
    }

    #[inline]
    pub(crate) fn front_mut(&mut self) -> &mut [Vec4] {
        &mut self.front
    }

    /// Front for reading, back for writing.
    #[inline]
    pub(crate) fn split(&mut self) -> (&[Vec4], &mut [Vec4]) {
        (&self.front, &mut self.back)
    }

    /// Make the back buffer current.
    #[inline]
    pub(crate) fn swap(&mut self) {
        std::mem::swap(&mut self.front, &mut self.back);
    }

    /// Fraction of cells whose strongest species channel exceeds `threshold`.
    pub fn coverage(&self, threshold: f32) -> f32 {
        let covered = self
            .front
            .iter()
            .filter(|c| c.x.max(c.y).max(c.z) > threshold)
            .count();
        covered as f32 / self.len() as f32
    }

    /// Sum of the r, g and b channels over the whole field.
    pub fn total_intensity(&self) -> f64 {
        self.front.iter().map(|c| (c.x + c.y + c.z) as f64).sum()
    }

    /// Largest r/g/b value in the field.
    pub fn max_intensity(&self) -> f32 {
        self.front
            .iter()
            .map(|c| c.x.max(c.y).max(c.z))
            .fold(0.0, f32::max)
    }

    /// Convert to an 8-bit RGBA image (alpha opaque).
    pub fn to_rgba8(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            let c = self.front[self.index(x, y)];
            let rgb = c.truncate().clamp(glam::Vec3::ZERO, glam::Vec3::ONE) * 255.0;
            image::Rgba([rgb.x as u8, rgb.y as u8, rgb.z as u8, 255])
        })
    }
}
