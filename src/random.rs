//! Stateless hash randomness.
//!
//! Every agent derives its random numbers from its own index (and, where a
//! frame-varying value is needed, a frame seed) through a pure integer hash.
//! There is no shared RNG stream, so kernels can run in any order on any
//! number of threads and each agent still sees the same sequence.
//!
//! The same functions exist in WGSL ([`RANDOM_WGSL`](crate::shader_utils::RANDOM_WGSL))
//! and produce identical integers on the GPU.

use std::f32::consts::{PI, TAU};

/// Avalanche hash: xor-shift and multiply by an odd constant, three rounds.
#[inline]
pub fn hash(seed: u32) -> u32 {
    let mut x = seed ^ 2_447_636_419;
    x = x.wrapping_mul(2_654_435_769);
    x ^= x >> 16;
    x = x.wrapping_mul(2_654_435_769);
    x ^= x >> 16;
    x.wrapping_mul(2_654_435_769)
}

/// Map a hash to `[0, 1]`.
#[inline]
pub fn unit_fraction(h: u32) -> f32 {
    h as f32 / u32::MAX as f32
}

/// Map a hash to an angle in `[0, 2π]`.
#[inline]
pub fn unit_angle(h: u32) -> f32 {
    unit_fraction(h) * TAU
}

/// A point in the unit disk plus a companion heading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiskSample {
    pub x: f32,
    pub y: f32,
    /// `arg + π`: points back toward the disk center.
    pub angle: f32,
}

/// Draw a point in the unit disk and advance `seed`.
///
/// The radius is the *square* of a uniform sample, which clusters points
/// toward the center. This is not a uniform disk distribution; the initial
/// blob and interaction jitter rely on that bias.
pub fn unit_disk_sample(seed: &mut u32) -> DiskSample {
    let arg_seed = hash(*seed);
    let abs_seed = hash(arg_seed);
    *seed = abs_seed;

    let arg = unit_angle(arg_seed);
    let r = unit_fraction(abs_seed);
    let r = r * r;

    DiskSample {
        x: r * arg.cos(),
        y: r * arg.sin(),
        angle: arg + PI,
    }
}
