//! Command-line entry point.

use clap::{Parser, Subcommand};
use std::error::Error;
use std::time::Instant;

use microcosm::{Config, World, WorldSnapshot, VERSION};

#[derive(Parser)]
#[command(name = "microcosm", version = VERSION, about = "Microbial ecosystem simulation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run {
        /// Configuration file (YAML); defaults are used if absent
        #[arg(short, long)]
        config: Option<String>,

        /// Number of ticks to simulate
        #[arg(short, long, default_value_t = 10_000)]
        ticks: u64,

        /// Random seed (random if omitted)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Write the stats history to this JSON file at the end
        #[arg(long)]
        stats_out: Option<String>,

        /// Write a final world snapshot to this JSON file
        #[arg(long)]
        snapshot_out: Option<String>,

        /// Only log warnings
        #[arg(short, long)]
        quiet: bool,
    },

    /// Write a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "microcosm.yaml")]
        output: String,
    },

    /// Time the engine over a ladder of population caps
    Benchmark {
        /// Ticks per measurement
        #[arg(short, long, default_value_t = 200)]
        ticks: u64,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            ticks,
            seed,
            stats_out,
            snapshot_out,
            quiet,
        } => {
            let config = match config {
                Some(path) => Config::from_file(&path)?,
                None => Config::default(),
            };
            let level = if quiet {
                "warn".to_string()
            } else {
                config.logging.log_level.clone()
            };
            env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or(&level),
            )
            .init();

            let mut world = match seed {
                Some(seed) => World::new_with_seed(config, seed),
                None => World::new(config),
            };
            log::info!(
                "starting: {} agents, cap {}, seed {}",
                world.population(),
                world.config.population.max_organisms,
                world.seed()
            );

            let start = Instant::now();
            world.run(ticks);
            let elapsed = start.elapsed();

            println!("{}", world.stats.summary());
            println!(
                "{} ticks in {:.2}s ({:.0} ticks/s)",
                world.time,
                elapsed.as_secs_f64(),
                world.time as f64 / elapsed.as_secs_f64().max(1e-9)
            );

            if let Some(path) = stats_out {
                world.stats_history.save_json(&path)?;
                println!("stats history written to {}", path);
            }
            if let Some(path) = snapshot_out {
                let snapshot = WorldSnapshot::capture(&world);
                std::fs::write(&path, serde_json::to_string_pretty(&snapshot)?)?;
                println!("snapshot written to {}", path);
            }
        }

        Commands::Init { output } => {
            Config::default().save(&output)?;
            println!("default configuration written to {}", output);
        }

        Commands::Benchmark { ticks } => {
            env_logger::Builder::from_env(
                env_logger::Env::default().default_filter_or("warn"),
            )
            .init();
            for cap in [100, 400, 800] {
                let mut config = Config::default();
                config.population.max_organisms = cap;
                config.population.initial_bacteria = cap / 8;
                config.population.initial_viruses = cap / 16;
                config.population.initial_immune_cells = cap / 16;
                config.population.initial_body_cells = cap / 4;
                let mut world = World::new_with_seed(config, 42);
                let start = Instant::now();
                world.run(ticks);
                let elapsed = start.elapsed();
                println!(
                    "cap {:4}: {} ticks in {:.2}s ({:.0} ticks/s, final pop {})",
                    cap,
                    world.time,
                    elapsed.as_secs_f64(),
                    world.time as f64 / elapsed.as_secs_f64().max(1e-9),
                    world.population()
                );
            }
        }
    }

    Ok(())
}
