// Import the clap derive macros for CLI argument parsing
use clap::{Args, Parser, Subcommand};

use anyhow::{Context, Result};

// Import our library types
use solar_collector::checkpoint::restore_population;
use solar_collector::run::run_generations;
use solar_collector::{calibrate, Population, RunConfig, RunSettings, TriangleMesh};

// Import indicatif for the progress spinner
use indicatif::{ProgressBar, ProgressStyle};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Solar collector optimizer - evolve a panel that reflects light onto a target
///
/// A population of height-field panels is scored by how many of their
/// triangles reflect the configured rays onto the obstacle mesh, and bred
/// generation after generation. The progress table goes to stdout, logs
/// (filtered by `RUST_LOG`) go to stderr.
#[derive(Parser)]
#[command(name = "solar-collector")]
#[command(about = "Evolve solar collector panels with a genetic algorithm", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Number of threads for parallel processing
    ///
    /// Limits Rayon's thread pool size. By default, uses all available CPU cores.
    #[arg(short = 't', long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the genetic algorithm until stopped
    Run(RunArgs),

    /// Print the fitness of random panels over a range of height scales
    Calibrate(CalibrateArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to the `key = value` run configuration
    config: PathBuf,

    /// Obstacle mesh (binary or ASCII STL)
    #[arg(long, default_value = "./obstacleBin.stl")]
    obstacle: PathBuf,

    /// Directory for the population checkpoint
    #[arg(long, default_value = "./checkpoint")]
    checkpoint_dir: PathBuf,

    /// Directory for the exported best-of-generation meshes
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Seed for the random number generator (random when omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many generations instead of running forever
    #[arg(short, long)]
    generations: Option<u64>,
}

#[derive(Args)]
struct CalibrateArgs {
    /// Path to the `key = value` run configuration
    config: PathBuf,

    /// Obstacle mesh (binary or ASCII STL)
    #[arg(long, default_value = "./obstacleBin.stl")]
    obstacle: PathBuf,

    /// Seed for the random number generator (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    // Configure Rayon thread pool if thread limit is specified
    if let Some(num_threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads = num_threads, "using a fixed thread pool");
    }

    match cli.command {
        Command::Run(args) => run_optimizer(args),
        Command::Calibrate(args) => run_calibration(args),
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn load_config(path: &Path) -> Result<RunConfig> {
    let config = RunConfig::load(path)
        .with_context(|| format!("could not load configuration {}", path.display()))?;

    info!(
        xsize = config.xsize,
        ysize = config.ysize,
        hmax = config.hmax,
        popsize = config.popsize,
        crossover_bias = config.crossover_bias,
        mutation_probability = config.mutation_probability,
        mutation_range = config.mutation_range,
        termination_ratio = config.termination_ratio,
        checkpoint_every = config.checkpoint_every,
        export_every = config.export_every,
        start_from_checkpoint = config.start_from_checkpoint,
        rays = config.rays.len(),
        "configuration loaded"
    );
    Ok(config)
}

/// Load the obstacle and move it over the panel
fn load_obstacle(path: &Path, config: &RunConfig) -> Result<TriangleMesh> {
    let mut obstacle = TriangleMesh::load_stl(path)
        .with_context(|| format!("could not load obstacle {}", path.display()))?;
    obstacle.compute_all();

    let (dx, dy) = config.obstacle_offset();
    obstacle.translate_xy(dx, dy);

    info!(
        path = %path.display(),
        triangles = obstacle.triangle_count(),
        dx,
        dy,
        "obstacle loaded"
    );
    Ok(obstacle)
}

fn run_optimizer(args: RunArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let obstacle = load_obstacle(&args.obstacle, &config)?;
    let rng = make_rng(args.seed);

    let (width, height, max_height) = (config.grid_width(), config.grid_height(), config.max_height());
    let mut population = if config.start_from_checkpoint {
        let (population, _) = restore_population(
            config.popsize,
            width,
            height,
            max_height,
            &obstacle,
            &args.checkpoint_dir,
            rng,
        );
        population
    } else {
        Population::random(config.popsize, width, height, max_height, &obstacle, rng)
    };

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("could not create {}", args.output_dir.display()))?;
    let settings = RunSettings::from_config(&config, &args.output_dir, &args.checkpoint_dir);
    let params = config.evolution_params();

    // The loop has no natural end, so a spinner rather than a bar
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner} {msg}")
            .context("invalid progress template")?,
    );
    pb.enable_steady_tick(Duration::from_millis(200));

    let stdout = io::stdout();
    let mut report = stdout.lock();
    run_generations(
        &mut population,
        &config.rays,
        &params,
        &settings,
        &mut report,
        args.generations,
        |outcome| {
            pb.set_message(format!(
                "generation {} | best {} | replaced {}",
                outcome.generation,
                outcome.best_fitness(),
                outcome.replaced
            ));
        },
    )?;

    pb.finish_with_message(format!("stopped after generation {}", population.generation));
    Ok(())
}

fn run_calibration(args: CalibrateArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let obstacle = load_obstacle(&args.obstacle, &config)?;
    let mut rng = make_rng(args.seed);

    let stdout = io::stdout();
    calibrate::calibrate(
        config.grid_width(),
        config.grid_height(),
        config.max_height(),
        &obstacle,
        &mut rng,
        &mut stdout.lock(),
    )
    .context("could not write calibration table")?;
    Ok(())
}
