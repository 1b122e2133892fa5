use std::path::PathBuf;

use cache_simulator::models::{CacheMode, SimulationConfig};
use cache_simulator::runner::SimulationRunner;
use cache_simulator::stats::SimulationStats;
use clap::Parser;
use lecar_cache::config::{DEFAULT_DISCOUNT_RATE, DEFAULT_LEARNING_RATE};

/// Replays request traces through a LeCaR cache
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Trace file, or directory of .tr/.log/.csv/.txt trace files
    #[arg(short, long, value_name = "PATH")]
    input: PathBuf,

    /// Cache capacity in bytes
    #[arg(short, long, default_value_t = 1000)]
    capacity: usize,

    /// Step size of the weight update
    #[arg(long, default_value_t = DEFAULT_LEARNING_RATE)]
    learning_rate: f64,

    /// Decay of old regret per capacity of evictions, in (0, 1)
    #[arg(long, default_value_t = DEFAULT_DISCOUNT_RATE)]
    discount_rate: f64,

    /// Evictions an eviction record stays usable (default: capacity)
    #[arg(long)]
    history_window: Option<u64>,

    /// Seed of the policy draw, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Export results to CSV file
    #[arg(long, value_name = "PATH")]
    output_csv: Option<PathBuf>,

    /// Replay through the thread-safe cache
    #[arg(long)]
    concurrent: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = SimulationConfig {
        input: args.input,
        capacity: args.capacity,
        learning_rate: args.learning_rate,
        discount_rate: args.discount_rate,
        history_window: args.history_window,
        seed: args.seed,
        mode: if args.concurrent {
            CacheMode::Concurrent
        } else {
            CacheMode::Sequential
        },
    };

    let runner = SimulationRunner::new(config.clone());
    let result = match runner.run() {
        Ok(result) => result,
        Err(e) => {
            log::error!("replay failed: {e}");
            return Err(e.into());
        }
    };

    let stats = SimulationStats::new(&config, &result);
    stats.print_summary();

    if let Some(csv_path) = args.output_csv {
        match stats.export_csv(&csv_path) {
            Ok(()) => println!("\nResults exported to: {}", csv_path.display()),
            Err(e) => log::error!("failed to export CSV: {e}"),
        }
    }

    Ok(())
}
