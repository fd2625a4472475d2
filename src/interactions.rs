//! Interaction injection: rare teleports toward interaction points.
//!
//! Every frame with interaction points, each agent rolls once per point. On a
//! hit (probability [`TELEPORT_PROBABILITY`]) it jumps next to the point and
//! takes the point's direction as its heading. With enough agents this
//! produces a steady trickle of new walkers at each point without ever
//! draining the network.
//!
//! Rolls are stateless: agent index and frame seed fully determine them.

use glam::Vec2;

use crate::agents::BOUNDARY_EPSILON;
use crate::dispatch::Dispatch;
use crate::input::InteractionPoint;
use crate::population::Agent;
use crate::random::{hash, unit_disk_sample, unit_fraction};

/// Per-agent, per-point chance of a teleport each frame.
pub const TELEPORT_PROBABILITY: f32 = 0.0001;

/// Largest offset between a teleported agent and its point, in cells.
pub const TELEPORT_JITTER: f32 = 10.0;

/// Frame seed derived from the frame counter.
#[inline]
pub fn frame_seed(frame: u64) -> u32 {
    hash(frame as u32)
}

/// Read-only inputs of the injection kernel.
#[derive(Clone, Copy, Debug)]
pub struct InjectionContext<'a> {
    pub points: &'a [InteractionPoint],
    pub seed: u32,
    /// Field size; teleported agents are clamped into it.
    pub bounds: Vec2,
}

impl<'a> InjectionContext<'a> {
    pub fn new(points: &'a [InteractionPoint], seed: u32, bounds: Vec2) -> Self {
        Self {
            points,
            seed,
            bounds,
        }
    }

    /// Roll every point for one agent. Returns whether the agent moved.
    pub fn inject(&self, index: usize, agent: &mut Agent) -> bool {
        let mut rnd = hash(hash(index as u32) ^ self.seed);
        let mut moved = false;
        for point in self.points {
            rnd = hash(rnd);
            if unit_fraction(rnd) > TELEPORT_PROBABILITY {
                continue;
            }
            let jitter = unit_disk_sample(&mut rnd);
            let position = point.position + Vec2::new(jitter.x, jitter.y) * TELEPORT_JITTER;
            agent.position = position.clamp(Vec2::ZERO, self.bounds - BOUNDARY_EPSILON);
            agent.heading = point.heading();
            moved = true;
        }
        moved
    }
}

/// Run the injection pass over all agents.
pub fn inject_interactions<D: Dispatch>(
    dispatch: &D,
    agents: &mut [Agent],
    points: &[InteractionPoint],
    seed: u32,
    bounds: Vec2,
) {
    if points.is_empty() {
        return;
    }
    let ctx = InjectionContext::new(points, seed, bounds);
    dispatch.for_each(agents, |i, agent| {
        ctx.inject(i, agent);
    });
}
