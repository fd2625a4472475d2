//! GPU backend smoke tests.
//!
//! These need a real adapter, so they are ignored by default:
//!
//! ```text
//! cargo test --test gpu_smoke -- --ignored
//! ```

use physarum::prelude::*;
use physarum::spawn::SpawnContext;

fn context() -> GpuContext {
    GpuContext::new().expect("no GPU adapter available")
}

#[test]
#[ignore]
fn test_gpu_spawn_matches_cpu() {
    let config = SimulationConfig::default().with_species(SpeciesMode::Ternary);
    let mut sim = GpuSimulation::new(context(), config, 4096).unwrap();
    sim.initialize(200, 120).unwrap();
    // dt = 0: agents are spawned and neither turn nor move.
    sim.step(&FrameInput::new().with_delta(0.0)).unwrap();

    let spawn = SpawnContext::new(200, 120, SpeciesMode::Ternary);
    let agents = sim.read_agents().unwrap();
    assert_eq!(agents.len(), 4096);
    for (i, agent) in agents.iter().enumerate() {
        let expected = spawn.spawn(i);
        assert_eq!(agent.species, expected.species, "agent {}", i);
        assert!(
            agent.position.distance(expected.position) < 1e-2,
            "agent {}: {:?} vs {:?}",
            i,
            agent.position,
            expected.position
        );
    }
}

#[test]
#[ignore]
fn test_gpu_run_keeps_invariants() {
    let mut sim = GpuSimulation::new(context(), SimulationConfig::default(), 65_536).unwrap();
    sim.initialize(256, 256).unwrap();

    let sources = [SourceMarker::attract(Vec2::new(128.0, 128.0))];
    let points: Vec<InteractionPoint> = (0..300)
        .map(|i| InteractionPoint::new(Vec2::new(i as f32, 40.0), Vec2::Y))
        .collect();
    let input = FrameInput::new()
        .with_delta(1.0 / 60.0)
        .with_sources(&sources)
        .with_interactions(&points);

    for _ in 0..30 {
        let report = sim.step(&input).unwrap();
        assert_eq!(report.interactions, 256);
    }
    assert_eq!(sim.frame(), 30);

    let field = sim.read_field().unwrap();
    assert_eq!((field.width(), field.height()), (256, 256));
    assert!(field.coverage(0.01) > 0.0);
    assert!(field.max_intensity() <= 1.0);
    assert!(field.cells().iter().all(|c| c.w == 1.0 && c.x == 0.0));

    for agent in sim.read_agents().unwrap() {
        let p = agent.position;
        assert!(p.x >= 0.0 && p.x < 256.0 && p.y >= 0.0 && p.y < 256.0);
    }
}

#[test]
#[ignore]
fn test_gpu_species_change() {
    let mut sim = GpuSimulation::new(context(), SimulationConfig::default(), 3072).unwrap();
    sim.initialize(128, 128).unwrap();
    sim.step(&FrameInput::new()).unwrap();

    sim.set_species_count(3).unwrap();
    assert!(sim.step(&FrameInput::new()).unwrap().species_reassigned);
    assert!(!sim.step(&FrameInput::new()).unwrap().species_reassigned);
    assert_eq!(sim.applied_species(), SpeciesMode::Ternary);

    let agents = sim.read_agents().unwrap();
    for channel in 0..3 {
        let n = agents
            .iter()
            .filter(|a| a.species.to_array()[channel] == 1)
            .count();
        assert_eq!(n, 1024);
    }
}

#[test]
#[ignore]
fn test_gpu_step_before_initialize_fails() {
    let mut sim = GpuSimulation::new(context(), SimulationConfig::default(), 1024).unwrap();
    assert!(sim.step(&FrameInput::new()).is_err());
    assert!(sim.read_field().is_err());
}
