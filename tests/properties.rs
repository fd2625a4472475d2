//! Randomized property checks.
//!
//! Inputs come from a seeded `StdRng` so failures reproduce.

use physarum::population::{AgentCount, MAX_AGENTS, MIN_AGENTS, WORKGROUP_SIZE};
use physarum::prelude::*;
use physarum::Serial;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5EED_1234)
}

// ============================================================================
// Agent Count
// ============================================================================

#[test]
fn test_round_is_multiple_of_group_size() {
    let mut rng = rng();
    for _ in 0..10_000 {
        let requested = rng.gen_range(0..=MAX_AGENTS * 2);
        let count = AgentCount::round(requested);
        assert_eq!(count % WORKGROUP_SIZE, 0, "requested {}", requested);
        assert!((MIN_AGENTS..=MAX_AGENTS).contains(&count));
    }
}

#[test]
fn test_round_is_idempotent() {
    let mut rng = rng();
    for _ in 0..10_000 {
        let count = AgentCount::round(rng.gen_range(0..=MAX_AGENTS));
        assert_eq!(AgentCount::round(count), count);
    }
}

#[test]
fn test_round_never_shrinks_in_range_requests() {
    let mut rng = rng();
    for _ in 0..10_000 {
        let requested = rng.gen_range(MIN_AGENTS..=MAX_AGENTS);
        let count = AgentCount::round(requested);
        assert!(count >= requested);
        assert!(count - requested < WORKGROUP_SIZE);
    }
}

#[test]
fn test_round_edges() {
    assert_eq!(AgentCount::round(0), MIN_AGENTS);
    assert_eq!(AgentCount::round(MIN_AGENTS + 1), MIN_AGENTS + WORKGROUP_SIZE);
    assert_eq!(AgentCount::round(usize::MAX), MAX_AGENTS);
}

// ============================================================================
// Random Configurations
// ============================================================================

fn random_config(rng: &mut StdRng) -> SimulationConfig {
    let species = match rng.gen_range(1..=3) {
        1 => SpeciesMode::Mono,
        2 => SpeciesMode::Binary,
        _ => SpeciesMode::Ternary,
    };
    SimulationConfig::default()
        .with_sensor_offset(rng.gen_range(0.0..40.0))
        .with_sensor_size(rng.gen_range(1..=4))
        .with_sensor_angle_spacing(rng.gen_range(0.0..std::f32::consts::PI))
        .with_turn_speed(rng.gen_range(0.0..50.0))
        .with_evaporation_speed(rng.gen_range(0.01..0.99))
        .with_move_speed(rng.gen_range(0.0..200.0))
        .with_trail_weight(rng.gen_range(0.05..=1.0))
        .with_species(species)
}

#[test]
fn test_random_runs_keep_invariants() {
    let mut rng = rng();
    for _ in 0..12 {
        let config = random_config(&mut rng);
        let width = rng.gen_range(1..80);
        let height = rng.gen_range(1..80);

        let mut sim = Simulation::with_dispatch(config, Serial::default()).unwrap();
        sim.initialize(width, height).unwrap();

        let marker = Vec2::new(
            rng.gen_range(-10.0..width as f32 + 10.0),
            rng.gen_range(-10.0..height as f32 + 10.0),
        );
        let sources = [if rng.gen_bool(0.5) {
            SourceMarker::attract(marker)
        } else {
            SourceMarker::repel(marker)
        }];
        let points = [InteractionPoint::new(marker, Vec2::new(1.0, -1.0))];

        for _ in 0..8 {
            let delta = rng.gen_range(0.0..0.2);
            let input = FrameInput::new()
                .with_delta(delta)
                .with_sources(&sources)
                .with_interactions(&points);
            sim.step(&input).unwrap();

            for agent in sim.agents() {
                let p = agent.position;
                assert!(p.x >= 0.0 && p.x < width as f32, "{:?} in {}x{}", p, width, height);
                assert!(p.y >= 0.0 && p.y < height as f32, "{:?} in {}x{}", p, width, height);
                assert!(agent.heading.is_finite());
            }
            for cell in sim.field().unwrap().cells() {
                assert!(cell.cmpge(Vec4::ZERO).all() && cell.cmple(Vec4::ONE).all());
                assert_eq!(cell.w, 1.0);
            }
        }
    }
}

// ============================================================================
// Decay
// ============================================================================

#[test]
fn test_frozen_agents_saturate_monotonically() {
    // Frozen agents overwrite the same cells every frame; from an empty
    // field the total only rises toward its fixed point.
    let mut rng = rng();
    for _ in 0..6 {
        let config = SimulationConfig::default()
            .with_move_speed(0.0)
            .with_evaporation_speed(rng.gen_range(0.05..0.95));
        let mut sim = Simulation::with_dispatch(config, Serial::default()).unwrap();
        sim.initialize(48, 48).unwrap();

        let mut previous = 0.0;
        for _ in 0..40 {
            sim.step(&FrameInput::new()).unwrap();
            let field = sim.field().unwrap();
            let total = field.total_intensity();
            assert!(total >= previous, "{} < {}", total, previous);
            assert!(total <= 3.0 * field.len() as f64);
            previous = total;
        }
    }
}
