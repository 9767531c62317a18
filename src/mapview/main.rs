use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use spillmap::config::{SpillmapConfig, load_config};
use spillmap::geo_io::read_feature_collection;
use spillmap::logging::init_tracing;
use spillmap::map::{LeafletPage, MapSession};

mod server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// RON configuration file
    #[arg(long, env = "SPILLMAP_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Elevation samples as a GeoJSON FeatureCollection of points
    #[arg(
        long,
        env = "ELEVATION_JSON",
        default_value = "data/elevation.json",
        global = true
    )]
    input: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Write the elevation map as a standalone HTML page
    Render {
        #[arg(short, long, default_value = "elevation-map.html")]
        output: PathBuf,
    },
    /// Serve the elevation map via HTTP
    Serve {
        #[arg(short, long, default_value = "127.0.0.1")]
        address: String,
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
}

/// Drives one map session through mount and the first update, then tears it
/// down once the page has been captured.
fn render_session(config: &SpillmapConfig, input: &Path) -> Result<server::RenderedMap> {
    let elevation = read_feature_collection(input)?;

    let mut session = MapSession::new(config);
    session.mount(LeafletPage::new(&config.map), elevation)?;
    session.on_update().context("Failed to draw elevation overlay")?;

    let page = session
        .widget()
        .ok_or_else(|| anyhow!("map widget missing after mount"))?
        .to_html()
        .context("Failed to render map page")?;
    let overlay = session
        .overlay()
        .ok_or_else(|| anyhow!("elevation overlay missing after update"))?;

    let rendered = server::RenderedMap {
        page,
        overlay: serde_json::to_string(&overlay.isolines)?,
        legend: serde_json::to_string(&overlay.legend)?,
    };

    session.unmount();
    Ok(rendered)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = load_config(args.config.as_deref()).context("Failed to load config")?;

    let rendered = render_session(&config, &args.input)
        .with_context(|| format!("Failed to build map from {}", args.input.display()))?;

    match args.cmd {
        Command::Render { output } => {
            if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(&output, &rendered.page)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote elevation map to {}", output.display());
            Ok(())
        }
        Command::Serve { address, port } => {
            info!("Serving elevation map on http://{}:{}", address, port);
            server::serve(rendered, &address, port)
                .await
                .context("HTTP server failed")
        }
    }
}
