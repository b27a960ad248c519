use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use sf_config::{load_layered_yaml, report_unused_keys, ShelterFlowConfig, UnusedKeyPolicy};
use sf_forecast::{parse_series_csv_file, resample_daily, summarize, ZeroActualPolicy};
use sf_replenish::{plan_replenishment, StockPosition};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "sf")]
#[command(about = "ShelterFlow operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> local ...)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Score a forecast CSV (timestamp, predicted, actual) and print the summary
    Analyze {
        #[arg(long)]
        series: PathBuf,

        /// exclude | score-exact. Overrides the config value.
        #[arg(long)]
        policy: Option<ZeroActualPolicy>,

        /// Resample to one point per day before scoring
        #[arg(long, default_value_t = false)]
        daily: bool,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<PathBuf>,
    },

    /// Run the replenishment planner on a forecast CSV's predicted values
    Plan {
        #[arg(long)]
        series: PathBuf,

        #[arg(long)]
        shelter: String,

        #[arg(long)]
        item: String,

        /// Stock on hand
        #[arg(long)]
        inventory: f64,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Analyze {
            series,
            policy,
            daily,
            config_paths,
        } => {
            let settings = settings_from(&config_paths)?;
            let policy = policy.unwrap_or(settings.analytics.zero_actual_policy);

            let mut points = parse_series_csv_file(&series)
                .with_context(|| format!("load series {}", series.display()))?;
            if daily {
                points = resample_daily(&points);
            }

            let summary = summarize(&points, policy);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }

        Commands::Plan {
            series,
            shelter,
            item,
            inventory,
            config_paths,
        } => {
            let settings = settings_from(&config_paths)?;
            let points = parse_series_csv_file(&series)
                .with_context(|| format!("load series {}", series.display()))?;

            let position = StockPosition::new(shelter.as_str(), item.as_str(), inventory);
            let order = plan_replenishment(
                &position,
                &points.predictions(),
                &settings.replenishment,
                Utc::now(),
            )
            .context("replenishment planning failed")?;

            println!("{}", serde_json::to_string_pretty(&order)?);
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn settings_from(paths: &[PathBuf]) -> Result<ShelterFlowConfig> {
    if paths.is_empty() {
        return Ok(ShelterFlowConfig::default());
    }
    let loaded = load_layered_yaml(paths)?;
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for leaf in &report.unused_leaf_pointers {
        warn!(leaf = %leaf, "config key not used");
    }
    info!(config_hash = %loaded.config_hash, "config loaded");
    loaded.settings()
}
