//! Per-frame input supplied by the caller.
//!
//! Source markers and interaction points typically come from touches or
//! mouse drags. They are borrowed for a single frame; the engine never keeps
//! them. Each list is capped at [`MAX_MARKERS`] entries: the newest source
//! markers (the end of the list) and the first interaction points are kept.
//!
//! # Example
//!
//! ```ignore
//! let sources = [SourceMarker::attract(Vec2::new(128.0, 128.0))];
//! let input = FrameInput::new().with_sources(&sources).with_delta(1.0 / 60.0);
//! sim.step(&input)?;
//! ```

use glam::Vec2;

/// Maximum markers or interaction points honored per frame.
pub const MAX_MARKERS: usize = 256;

/// An attracting or repelling point applied during diffusion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceMarker {
    /// Field-space position.
    pub position: Vec2,
    /// `true` paints trail around the marker, `false` erases it.
    pub attract: bool,
}

impl SourceMarker {
    pub fn attract(position: Vec2) -> Self {
        Self {
            position,
            attract: true,
        }
    }

    pub fn repel(position: Vec2) -> Self {
        Self {
            position,
            attract: false,
        }
    }
}

/// A point that occasionally pulls agents to itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InteractionPoint {
    /// Field-space position.
    pub position: Vec2,
    /// Heading given to teleported agents (need not be normalized).
    pub direction: Vec2,
}

impl InteractionPoint {
    pub fn new(position: Vec2, direction: Vec2) -> Self {
        Self {
            position,
            direction,
        }
    }

    /// Heading in radians, `atan2(direction.y, direction.x)`.
    #[inline]
    pub fn heading(&self) -> f32 {
        self.direction.y.atan2(self.direction.x)
    }
}

/// Everything the caller feeds into one frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput<'a> {
    pub sources: &'a [SourceMarker],
    pub interactions: &'a [InteractionPoint],
    /// Seconds since the previous frame; `None` on the first frame.
    pub delta: Option<f32>,
}

impl<'a> FrameInput<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(mut self, sources: &'a [SourceMarker]) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_interactions(mut self, interactions: &'a [InteractionPoint]) -> Self {
        self.interactions = interactions;
        self
    }

    pub fn with_delta(mut self, delta: f32) -> Self {
        self.delta = Some(delta);
        self
    }

    /// The newest source markers within the per-frame cap.
    pub fn honored_sources(&self) -> &'a [SourceMarker] {
        let sources = self.sources;
        if sources.len() > MAX_MARKERS {
            log::warn!(
                "{} source markers supplied, only the last {} are used",
                sources.len(),
                MAX_MARKERS
            );
        }
        &sources[sources.len().saturating_sub(MAX_MARKERS)..]
    }

    /// The first interaction points within the per-frame cap.
    pub fn honored_interactions(&self) -> &'a [InteractionPoint] {
        let points = self.interactions;
        if points.len() > MAX_MARKERS {
            log::warn!(
                "{} interaction points supplied, only the first {} are used",
                points.len(),
                MAX_MARKERS
            );
        }
        &points[..points.len().min(MAX_MARKERS)]
    }
}
