//! Trail diffusion, evaporation and source markers.
//!
//! One pass per frame over every cell: blur, decay, paint markers, clamp.
//! The pass reads the front buffer and writes the back buffer, then the two
//! are swapped, so every cell sees its neighbors as they were before the pass.
//!
//! Border cells are not blurred; they keep their own value and only decay.

use glam::{Vec2, Vec3, Vec4};

use crate::config::SimulationConfig;
use crate::dispatch::Dispatch;
use crate::field::TrailField;
use crate::input::SourceMarker;

/// Marker radius as a fraction of the smaller field dimension.
pub const SOURCE_RADIUS_FRACTION: f32 = 0.1;

/// Distance below which a repelling marker erases trail completely
/// (in units of the marker radius).
pub const REPEL_CORE: f32 = 0.2;

/// Read-only inputs of the diffusion kernel.
pub struct DiffusionContext<'a> {
    cells: &'a [Vec4],
    width: u32,
    height: u32,
    decay: f32,
    mono: bool,
    sources: &'a [SourceMarker],
    source_radius: f32,
}

impl<'a> DiffusionContext<'a> {
    pub fn new(
        cells: &'a [Vec4],
        width: u32,
        height: u32,
        config: &SimulationConfig,
        sources: &'a [SourceMarker],
    ) -> Self {
        Self {
            cells,
            width,
            height,
            decay: config.decay_factor(),
            mono: config.species.is_mono(),
            sources,
            source_radius: source_radius(width, height),
        }
    }

    /// 3×3 mean for interior cells, the cell itself on the border.
    pub fn blur(&self, x: u32, y: u32) -> Vec4 {
        let w = self.width as usize;
        let (xu, yu) = (x as usize, y as usize);
        if x == 0 || y == 0 || x + 1 >= self.width || y + 1 >= self.height {
            return self.cells[yu * w + xu];
        }

        let mut sum = Vec4::ZERO;
        for row in yu - 1..=yu + 1 {
            let start = row * w + xu - 1;
            for cell in &self.cells[start..start + 3] {
                sum += *cell;
            }
        }
        sum / 9.0
    }

    /// Apply every source marker to one cell's rgb.
    pub fn apply_sources(&self, position: Vec2, mut rgb: Vec3) -> Vec3 {
        for source in self.sources {
            let d = position.distance(source.position) / self.source_radius;
            if d > 1.0 {
                continue;
            }
            if !source.attract {
                rgb = rgb.min(Vec3::splat((d - REPEL_CORE).max(0.0)));
            } else if self.mono {
                rgb.y = rgb.y.max(1.0 - d);
                rgb.z = rgb.z.max(1.0 - d);
            } else {
                rgb.y = rgb.y.max(1.0 - d);
            }
        }
        rgb
    }

    /// Cell kernel: new value of cell `index`.
    pub fn cell(&self, index: usize) -> Vec4 {
        let x = (index % self.width as usize) as u32;
        let y = (index / self.width as usize) as u32;

        let decayed = self.blur(x, y).truncate() * self.decay;
        let rgb = self.apply_sources(Vec2::new(x as f32, y as f32), decayed);
        rgb.clamp(Vec3::ZERO, Vec3::ONE).extend(1.0)
    }
}

/// Marker radius in cells, never below one cell.
#[inline]
pub fn source_radius(width: u32, height: u32) -> f32 {
    (SOURCE_RADIUS_FRACTION * width.min(height) as f32).max(1.0)
}

/// Run the diffusion pass and swap the field buffers.
pub fn diffuse<D: Dispatch>(
    dispatch: &D,
    field: &mut TrailField,
    config: &SimulationConfig,
    sources: &[SourceMarker],
) {
    let (width, height) = (field.width(), field.height());
    {
        let (front, back) = field.split();
        let ctx = DiffusionContext::new(front, width, height, config, sources);
        dispatch.for_each(back, |i, out| *out = ctx.cell(i));
    }
    field.swap();
}
