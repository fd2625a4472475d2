//! The per-frame agent update: sense, steer, move, deposit.
//!
//! Each agent probes the field at three sensors (forward, left, right),
//! turns with a noisy rule, advances, and leaves trail in the cell it lands
//! on. The steering rule is deliberately not gradient ascent:
//!
//! | Readings | Turn |
//! |----------|------|
//! | forward is the largest (ties included) | none |
//! | forward is the smallest | random, either side |
//! | right > left | right by a random fraction |
//! | left > right | left by a random fraction |
//!
//! The checks run in that order.
//!
//! Sensing sees the field as it was at the start of the pass. Deposits are
//! collected per agent and scattered afterwards in agent order, so two agents
//! landing on the same cell resolve to the higher index.

use glam::{Vec2, Vec4};

use crate::config::SimulationConfig;
use crate::dispatch::Dispatch;
use crate::field::TrailField;
use crate::population::Agent;
use crate::random::{hash, unit_angle, unit_fraction};

/// Keeps boundary-clamped agents strictly inside the field.
pub const BOUNDARY_EPSILON: f32 = 0.01;

/// Sensor readings of one agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Readings {
    pub forward: f32,
    pub left: f32,
    pub right: f32,
}

/// Heading change for the given readings.
///
/// `fraction` is a random value in `[0, 1]`, `max_turn` is `turn_speed * dt`.
pub fn steer(readings: Readings, fraction: f32, max_turn: f32) -> f32 {
    let Readings { forward, left, right } = readings;
    if forward >= left && forward >= right {
        0.0
    } else if forward < left && forward < right {
        (fraction - 0.5) * 2.0 * max_turn
    } else if right > left {
        -fraction * max_turn
    } else if left > right {
        fraction * max_turn
    } else {
        0.0
    }
}

/// Read-only inputs shared by every agent in the pass.
pub struct AgentStepContext<'a> {
    cells: &'a [Vec4],
    width: u32,
    height: u32,
    config: SimulationConfig,
    dt: f32,
}

impl<'a> AgentStepContext<'a> {
    pub fn new(field: &'a TrailField, config: SimulationConfig, dt: f32) -> Self {
        Self {
            cells: field.cells(),
            width: field.width(),
            height: field.height(),
            config,
            dt,
        }
    }

    /// Weighted sum of the square neighborhood around one sensor.
    ///
    /// Cells outside the field contribute nothing.
    pub fn sense(&self, agent: &Agent, angle_offset: f32) -> f32 {
        let direction = Vec2::from_angle(agent.heading + angle_offset);
        let sensor = agent.position + direction * self.config.sensor_offset;
        let weights = agent.affinity();

        let bound = self.config.sensor_size.max(1) as i64 - 1;
        let (w, h) = (self.width as i64, self.height as i64);
        // Any center past these limits sees an empty window.
        let cx = (sensor.x.floor() as i64).clamp(-bound - 1, w + bound);
        let cy = (sensor.y.floor() as i64).clamp(-bound - 1, h + bound);

        let mut sum = 0.0;
        for y in (cy - bound).max(0)..=(cy + bound).min(h - 1) {
            for x in (cx - bound).max(0)..=(cx + bound).min(w - 1) {
                sum += self.cells[(y * w + x) as usize].dot(weights);
            }
        }
        sum
    }

    /// Forward, left and right readings.
    pub fn read_sensors(&self, agent: &Agent) -> Readings {
        let spacing = self.config.sensor_angle_spacing;
        Readings {
            forward: self.sense(agent, 0.0),
            left: self.sense(agent, spacing),
            right: self.sense(agent, -spacing),
        }
    }

    /// Per-agent seed from the current cell and the agent index.
    #[inline]
    pub fn seed(&self, index: usize, agent: &Agent) -> u32 {
        let x = agent.position.x.max(0.0) as u32;
        let y = agent.position.y.max(0.0) as u32;
        let cell = y.wrapping_mul(self.width).wrapping_add(x);
        hash(cell.wrapping_add(hash(index as u32)))
    }

    /// Update one agent; returns the cell index it deposits into.
    pub fn update(&self, index: usize, agent: &mut Agent) -> u32 {
        let seed = self.seed(index, agent);

        let readings = self.read_sensors(agent);
        let max_turn = self.config.turn_speed * self.dt;
        agent.heading += steer(readings, unit_fraction(hash(seed)), max_turn);

        let step = Vec2::from_angle(agent.heading) * self.config.move_speed * self.dt;
        let mut position = agent.position + step;
        let size = Vec2::new(self.width as f32, self.height as f32);
        if position.x < 0.0 || position.y < 0.0 || position.x >= size.x || position.y >= size.y {
            position = position.clamp(Vec2::ZERO, size - BOUNDARY_EPSILON);
            agent.heading = unit_angle(seed);
        }
        agent.position = position;

        let x = (position.x as u32).min(self.width - 1);
        let y = (position.y as u32).min(self.height - 1);
        y * self.width + x
    }
}

/// Trail value an agent leaves behind.
#[inline]
pub fn deposit_value(agent: &Agent, trail_weight: f32) -> Vec4 {
    (agent.species.as_vec4() * trail_weight).min(Vec4::ONE)
}

/// Run the agent pass: update every agent against the current field, then
/// write deposits in agent order.
///
/// `deposits` is scratch space of the same length as `agents`.
pub fn update_agents<D: Dispatch>(
    dispatch: &D,
    agents: &mut [Agent],
    deposits: &mut [u32],
    field: &mut TrailField,
    config: SimulationConfig,
    dt: f32,
) {
    {
        let ctx = AgentStepContext::new(field, config, dt);
        dispatch.for_each_with(agents, deposits, |i, agent, cell| {
            *cell = ctx.update(i, agent);
        });
    }

    let front = field.front_mut();
    for (agent, &cell) in agents.iter().zip(deposits.iter()) {
        front[cell as usize] = deposit_value(agent, config.trail_weight);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Serial;
    use crate::species::SpeciesMode;
    use glam::IVec4;
    use std::f32::consts::{FRAC_PI_2, PI};

    const MONO: IVec4 = IVec4::new(0, 1, 1, 1);

    fn readings(forward: f32, left: f32, right: f32) -> Readings {
        Readings { forward, left, right }
    }

    // ========== Steering Tests ==========

    #[test]
    fn test_steer_forward_max_keeps_heading() {
        assert_eq!(steer(readings(3.0, 1.0, 2.0), 0.9, 1.0), 0.0);
        // Ties with forward count as forward-dominant.
        assert_eq!(steer(readings(2.0, 2.0, 2.0), 0.9, 1.0), 0.0);
    }

    #[test]
    fn test_steer_forward_min_is_symmetric_random() {
        assert_eq!(steer(readings(0.0, 1.0, 1.0), 1.0, 2.0), 2.0);
        assert_eq!(steer(readings(0.0, 1.0, 1.0), 0.0, 2.0), -2.0);
        assert_eq!(steer(readings(0.0, 1.0, 1.0), 0.5, 2.0), 0.0);
    }

    #[test]
    fn test_steer_toward_stronger_side() {
        assert_eq!(steer(readings(1.0, 0.0, 2.0), 0.5, 2.0), -1.0);
        assert_eq!(steer(readings(1.0, 2.0, 0.0), 0.5, 2.0), 1.0);
    }

    // ========== Sensing Tests ==========

    fn field_with(width: u32, height: u32, cells: &[(i32, i32, Vec4)]) -> TrailField {
        let mut field = TrailField::new(width, height).unwrap();
        for &(x, y, v) in cells {
            field.set(x, y, v);
        }
        field
    }

    #[test]
    fn test_sense_single_cell() {
        let field = field_with(32, 32, &[(15, 10, Vec4::new(0.0, 0.5, 0.5, 1.0))]);
        let config = SimulationConfig::default().with_sensor_offset(5.0);
        let ctx = AgentStepContext::new(&field, config, 1.0 / 60.0);
        let agent = Agent::new(Vec2::new(10.5, 10.5), 0.0, MONO);
        // dot((0, .5, .5, 1), (-1, 1, 1, 1)) = 2
        assert!((ctx.sense(&agent, 0.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_sense_opposite_species_is_negative() {
        let field = field_with(32, 32, &[(15, 10, Vec4::new(1.0, 0.0, 0.0, 0.0))]);
        let config = SimulationConfig::default().with_sensor_offset(5.0);
        let ctx = AgentStepContext::new(&field, config, 1.0 / 60.0);
        let agent = Agent::new(Vec2::new(10.5, 10.5), 0.0, MONO);
        assert!(ctx.sense(&agent, 0.0) < 0.0);
    }

    #[test]
    fn test_sense_neighborhood_clipped_at_border() {
        let field = TrailField::new(16, 16).unwrap();
        let config = SimulationConfig::default()
            .with_sensor_offset(0.0)
            .with_sensor_size(2);
        let ctx = AgentStepContext::new(&field, config, 1.0 / 60.0);
        // Alpha is 1 everywhere, so the sum counts in-bounds cells.
        let corner = Agent::new(Vec2::new(0.5, 0.5), 0.0, MONO);
        assert!((ctx.sense(&corner, 0.0) - 4.0).abs() < 1e-6);
        let inner = Agent::new(Vec2::new(5.5, 5.5), 0.0, MONO);
        assert!((ctx.sense(&inner, 0.0) - 9.0).abs() < 1e-6);
        let outside = Agent::new(Vec2::new(-10.0, -10.0), 0.0, MONO);
        assert_eq!(ctx.sense(&outside, 0.0), 0.0);
    }

    #[test]
    fn test_sense_far_sensor_is_empty() {
        let field = TrailField::new(16, 16).unwrap();
        let config = SimulationConfig {
            sensor_offset: 1.0e30,
            sensor_size: 3,
            ..Default::default()
        };
        let ctx = AgentStepContext::new(&field, config, 1.0 / 60.0);
        let agent = Agent::new(Vec2::new(8.0, 8.0), 0.0, MONO);
        for offset in [0.0, FRAC_PI_2, PI, -FRAC_PI_2] {
            assert_eq!(ctx.sense(&agent, offset), 0.0);
        }

        // Same for a sensor that lands at a non-finite position.
        let config = SimulationConfig {
            sensor_offset: f32::INFINITY,
            ..config
        };
        let ctx = AgentStepContext::new(&field, config, 1.0 / 60.0);
        let r = ctx.read_sensors(&agent);
        assert!(r.forward.is_finite() && r.left.is_finite() && r.right.is_finite());
    }

    #[test]
    fn test_sense_window_overlapping_edge() {
        // Center one cell past the right edge: the left column of the
        // 5x5 window still reaches into the field.
        let field = TrailField::new(16, 16).unwrap();
        let config = SimulationConfig::default()
            .with_sensor_offset(0.0)
            .with_sensor_size(3);
        let ctx = AgentStepContext::new(&field, config, 1.0 / 60.0);
        let agent = Agent::new(Vec2::new(17.5, 8.5), 0.0, MONO);
        assert!((ctx.sense(&agent, 0.0) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_read_sensors_left_is_positive_angle() {
        // Heading +x, left sensor rotated +spacing (toward +y).
        let field = field_with(64, 64, &[(20, 30, Vec4::new(0.0, 1.0, 1.0, 1.0))]);
        let config = SimulationConfig::default()
            .with_sensor_offset(10.0)
            .with_sensor_angle_spacing(FRAC_PI_2);
        let ctx = AgentStepContext::new(&field, config, 1.0 / 60.0);
        let agent = Agent::new(Vec2::new(20.5, 20.5), 0.0, MONO);
        let r = ctx.read_sensors(&agent);
        assert!(r.left > r.forward);
        assert!(r.left > r.right);
    }

    // ========== Movement Tests ==========

    #[test]
    fn test_update_moves_forward_on_flat_field() {
        let field = TrailField::new(100, 100).unwrap();
        let ctx = AgentStepContext::new(&field, SimulationConfig::default(), 0.5);
        let mut agent = Agent::new(Vec2::new(50.0, 50.0), 0.0, MONO);
        let cell = ctx.update(0, &mut agent);
        // Flat field: forward ties, no turn. 60 * 0.5 = 30 cells.
        assert_eq!(agent.heading, 0.0);
        assert!((agent.position - Vec2::new(80.0, 50.0)).length() < 1e-4);
        assert_eq!(cell, 50 * 100 + 80);
    }

    #[test]
    fn test_boundary_redirects() {
        let field = TrailField::new(64, 32).unwrap();
        let ctx = AgentStepContext::new(&field, SimulationConfig::default(), 0.05);
        let mut agent = Agent::new(Vec2::new(63.5, 10.0), 0.0, MONO);
        ctx.update(3, &mut agent);
        assert!(agent.position.x < 64.0 && agent.position.x >= 63.98);
        assert_ne!(agent.heading, 0.0);

        let mut agent = Agent::new(Vec2::new(1.0, 0.5), -FRAC_PI_2, MONO);
        ctx.update(4, &mut agent);
        assert_eq!(agent.position.y, 0.0);
        assert_ne!(agent.heading, -FRAC_PI_2);
    }

    #[test]
    fn test_update_is_deterministic() {
        let field = field_with(64, 64, &[(40, 32, Vec4::new(0.0, 1.0, 1.0, 1.0))]);
        let ctx = AgentStepContext::new(&field, SimulationConfig::default(), 1.0 / 60.0);
        let start = Agent::new(Vec2::new(30.0, 30.0), 0.3, MONO);
        let (mut a, mut b) = (start, start);
        assert_eq!(ctx.update(9, &mut a), ctx.update(9, &mut b));
        assert_eq!(a, b);
    }

    // ========== Deposit Tests ==========

    #[test]
    fn test_deposit_value_clamped() {
        let agent = Agent::new(Vec2::ZERO, 0.0, SpeciesMode::Ternary.mask(2));
        assert_eq!(deposit_value(&agent, 0.4), Vec4::new(0.4, 0.0, 0.0, 0.4));
        assert_eq!(deposit_value(&agent, 1.0), Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_pass_scatters_last_write_wins() {
        let mut field = TrailField::new(32, 32).unwrap();
        let mut agents = vec![
            Agent::new(Vec2::new(10.2, 10.2), PI, SpeciesMode::Ternary.mask(0)),
            Agent::new(Vec2::new(10.7, 10.7), PI, SpeciesMode::Ternary.mask(2)),
        ];
        let mut deposits = vec![0u32; 2];
        let config = SimulationConfig::default().with_move_speed(0.0);
        update_agents(&Serial::default(), &mut agents, &mut deposits, &mut field, config, 0.1);
        assert_eq!(deposits[0], deposits[1]);
        // Agent 1 (red) wrote last.
        assert_eq!(field.get(10, 10), Some(Vec4::new(1.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_pass_senses_pre_deposit_field() {
        // Two agents in a row: the follower must not see the leader's
        // deposit from this same pass.
        let mut field = TrailField::new(64, 64).unwrap();
        let config = SimulationConfig::default().with_sensor_offset(1.0);
        let mut agents = vec![
            Agent::new(Vec2::new(20.5, 20.5), 0.0, MONO),
            Agent::new(Vec2::new(19.5, 20.5), 0.0, MONO),
        ];
        let mut deposits = vec![0u32; 2];
        update_agents(&Serial::default(), &mut agents, &mut deposits, &mut field, config, 0.0);
        // dt = 0: nobody turns or moves; both deposit in place.
        assert_eq!(agents[1].heading, 0.0);
        assert_eq!(field.get(19, 20), Some(Vec4::new(0.0, 1.0, 1.0, 1.0)));
        assert_eq!(field.get(20, 20), Some(Vec4::new(0.0, 1.0, 1.0, 1.0)));
    }
}
