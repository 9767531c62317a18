use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use spillmap::config::load_config;
use spillmap::join::run_join;
use spillmap::logging::init_tracing;

/// Joins spill incidents from the COGCC CSV export onto well locations.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Spill CSV with a Facility_ID column
    #[arg(long, env = "SPILLS_CSV")]
    csv: Option<PathBuf>,

    /// Well locations as a GeoJSON FeatureCollection
    #[arg(long, env = "WELLS_JSON")]
    wells: Option<PathBuf>,

    /// Where the joined GeoJSON is written
    #[arg(long, env = "SPILLED_WELLS_JSON")]
    output: Option<PathBuf>,

    /// RON configuration file
    #[arg(long, env = "SPILLMAP_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref()).context("Failed to load config")?;

    if let Some(csv) = args.csv {
        config.join.csv_path = csv;
    }
    if let Some(wells) = args.wells {
        config.join.wells_path = wells;
    }
    if let Some(output) = args.output {
        config.join.output_path = output;
    }

    let report = run_join(&config.join).with_context(|| {
        format!(
            "Failed to join {} onto {}",
            config.join.csv_path.display(),
            config.join.wells_path.display()
        )
    })?;

    if report.written {
        info!(
            "Joined {} of {} spill rows into {}",
            report.matched,
            report.rows,
            config.join.output_path.display()
        );
    } else {
        error!("Joined GeoJSON was invalid, nothing written");
    }

    Ok(())
}
