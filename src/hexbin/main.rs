use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use spillmap::config::load_config;
use spillmap::hexgrid::run_hexbin;
use spillmap::logging::init_tracing;

/// Counts wells and spill locations per hexagonal cell over Colorado.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// All well locations (the `count` property)
    #[arg(long, env = "WELLS_JSON")]
    wells: Option<PathBuf>,

    /// Wells joined with spills (the `wellCount` property)
    #[arg(long, env = "SPILLED_WELLS_JSON")]
    spilled: Option<PathBuf>,

    /// Where the annotated hex grid is written
    #[arg(long, env = "HEXGRID_JSON")]
    output: Option<PathBuf>,

    /// Hexagon side length, in the configured units
    #[arg(long)]
    cell_side: Option<f64>,

    /// RON configuration file
    #[arg(long, env = "SPILLMAP_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref()).context("Failed to load config")?;

    if let Some(wells) = args.wells {
        config.hexgrid.wells_path = wells;
    }
    if let Some(spilled) = args.spilled {
        config.hexgrid.spilled_wells_path = spilled;
    }
    if let Some(output) = args.output {
        config.hexgrid.output_path = output;
    }
    if let Some(cell_side) = args.cell_side {
        config.hexgrid.cell_side = cell_side;
    }

    let report = run_hexbin(&config.hexgrid).context("Failed to build hex grid")?;

    info!(
        "Wrote {} cells ({} occupied) to {}",
        report.cells,
        report.occupied_cells,
        config.hexgrid.output_path.display()
    );
    info!(
        "{} wells and {} spill locations fell inside a cell",
        report.counted, report.well_counted
    );

    Ok(())
}
