//! Headless runner: step a simulation for a fixed number of frames and save
//! the trail field as a PNG.
//!
//! ```text
//! physarum --width 1024 --height 1024 --agents 500000 --species 3 --steps 1200 -o out.png
//! RUST_LOG=debug physarum --backend gpu --config params.json
//! ```

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use physarum::time::NOMINAL_DELTA;
use physarum::{
    FrameClock, FrameInput, GpuContext, GpuSimulation, Simulation, SimulationConfig,
    SimulationError, SourceMarker, SpeciesMode, TrailField, Vec2,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    Cpu,
    Gpu,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value_t = 512)]
    width: u32,

    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Agent count (rounded up to a multiple of 256).
    #[arg(long, default_value_t = 65_536)]
    agents: usize,

    /// Number of species, 1 to 3. Overrides the config file.
    #[arg(long)]
    species: Option<u32>,

    #[arg(long, default_value_t = 600)]
    steps: u32,

    #[arg(long, value_enum, default_value_t = Backend::Cpu)]
    backend: Backend,

    /// JSON file with simulation parameters; missing keys use defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "physarum.png")]
    output: PathBuf,

    /// Hold attracting source markers at the center and the four quadrant
    /// centers for the whole run.
    #[arg(long)]
    seed_sources: bool,
}

fn load_config(args: &Args) -> Result<SimulationConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => SimulationConfig::default(),
    };
    if let Some(count) = args.species {
        config = config.with_species(SpeciesMode::try_from(count)?);
    }
    config.validate()?;
    Ok(config)
}

fn seed_sources(width: u32, height: u32) -> Vec<SourceMarker> {
    let size = Vec2::new(width as f32, height as f32);
    [(0.5, 0.5), (0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)]
        .iter()
        .map(|&(x, y)| SourceMarker::attract(size * Vec2::new(x, y)))
        .collect()
}

fn run_cpu(args: &Args, config: SimulationConfig, input: &FrameInput) -> Result<TrailField, Box<dyn Error>> {
    let mut sim = Simulation::new(config)?;
    let count = sim.set_agent_count(args.agents)?;
    sim.initialize(args.width, args.height)?;
    log::info!("CPU backend: {} agents on {}x{}", count, args.width, args.height);

    let mut clock = FrameClock::new();
    for _ in 0..args.steps {
        sim.step(input)?;
        clock.tick();
    }
    log::info!("{} frames in {:.2}s", clock.frame(), clock.elapsed());

    Ok(sim.field().cloned().ok_or(SimulationError::NotInitialized)?)
}

fn run_gpu(args: &Args, config: SimulationConfig, input: &FrameInput) -> Result<TrailField, Box<dyn Error>> {
    let context = GpuContext::new()?;
    log::info!("GPU backend: {}", context.adapter_info.name);
    let mut sim = GpuSimulation::new(context, config, args.agents)?;
    sim.initialize(args.width, args.height)?;

    let mut clock = FrameClock::new();
    for _ in 0..args.steps {
        sim.step(input)?;
        clock.tick();
    }
    let field = sim.read_field()?;
    log::info!("{} frames in {:.2}s", clock.frame(), clock.elapsed());
    Ok(field)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let sources = if args.seed_sources {
        seed_sources(args.width, args.height)
    } else {
        Vec::new()
    };
    let input = FrameInput::new()
        .with_sources(&sources)
        .with_delta(NOMINAL_DELTA);

    let field = match args.backend {
        Backend::Cpu => run_cpu(&args, config, &input)?,
        Backend::Gpu => run_gpu(&args, config, &input)?,
    };

    field.to_rgba8().save(&args.output)?;
    println!(
        "Wrote {} ({}x{}, coverage {:.1}%)",
        args.output.display(),
        field.width(),
        field.height(),
        field.coverage(0.01) * 100.0
    );
    Ok(())
}
