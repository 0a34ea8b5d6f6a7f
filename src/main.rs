//! Storm Globe - interactive orthographic globe of storm observations
//!
//! CLI commands:
//! - view: Open the native viewer
//! - render: Write one frame as SVG or PNG
//! - stats: Load both datasets and print what was kept

mod circle;
mod config;
mod data;
mod gui;
mod input;
mod logging;
mod path;
mod projection;
mod raster;
mod render;
mod scale;
mod sphere;
mod view;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use crate::config::{Environment, GlobeConfig};
use crate::projection::Rotation;

#[derive(Parser)]
#[command(name = "storm_globe")]
#[command(about = "Storm observations on a draggable orthographic globe")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to globe.yaml config
    #[arg(short, long, default_value = "globe.yaml", global = true)]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch native globe viewer
    View,

    /// Render one frame to a file
    Render {
        /// Output file, .svg or .png
        #[arg(short, long)]
        output: PathBuf,

        /// Rotation as lambda,phi,gamma in degrees
        #[arg(short, long, value_parser = parse_rotation, allow_hyphen_values = true)]
        rotate: Option<Rotation>,
    },

    /// Load both datasets and print counts and scale endpoints
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = Environment::load();

    // Initialize logging first; file output stops when the guard drops
    let _log_guard = logging::init_logging(&env.log_dir)?;
    tracing::info!("Storm Globe starting up");

    let cli = Cli::parse();
    tracing::debug!("CLI args parsed: config={:?}", cli.config);

    let config = GlobeConfig::load_or_default(&cli.config)?;
    tracing::info!(
        "Config loaded: canvas {}px, max_points {}, window {:?}",
        config.canvas.size(),
        config.data.max_points,
        config.data.window
    );

    match cli.command {
        Commands::View => {
            tracing::info!("Launching native globe viewer");
            gui::run_viewer(config, env, tokio::runtime::Handle::current())?;
        }

        Commands::Render { output, rotate } => {
            render_frame(&config, &env, &output, rotate).await?;
        }

        Commands::Stats => {
            print_stats(&config, &env).await?;
        }
    }

    Ok(())
}

fn parse_rotation(s: &str) -> Result<Rotation, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("'{}': {}", p.trim(), e)))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [lambda, phi] => Ok(Rotation::new(*lambda, *phi, 0.0)),
        [lambda, phi, gamma] => Ok(Rotation::new(*lambda, *phi, *gamma)),
        _ => Err(format!("expected lambda,phi[,gamma], got '{}'", s)),
    }
}

/// Load both datasets, bind them and write one frame
async fn render_frame(
    config: &GlobeConfig,
    env: &Environment,
    output: &Path,
    rotate: Option<Rotation>,
) -> anyhow::Result<()> {
    let dataset = config.pipeline().load(&config.dataset_paths(env)).await;

    let mut view = config.view();
    view.bind(&dataset);
    if let Some(rotation) = rotate {
        view.rotate_to(rotation);
    }

    let svg = view.svg();
    let extension = output
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("svg") => raster::write_svg(&svg, output)?,
        Some("png") => {
            let pixmap = raster::rasterize(&svg)?;
            raster::write_png(&pixmap, output)?;
        }
        _ => bail!("Unsupported output {:?}: use .svg or .png", output),
    }

    let renderer = view.renderer();
    println!(
        "Wrote {} ({} countries, {} storm markers visible at rotation {:?})",
        output.display(),
        renderer.visible_countries(),
        renderer.visible_storms(),
        <[f64; 3]>::from(view.rotation())
    );
    Ok(())
}

/// Print dataset counts and scale endpoints
async fn print_stats(config: &GlobeConfig, env: &Environment) -> anyhow::Result<()> {
    let paths = config.dataset_paths(env);
    let pipeline = config.pipeline();

    let (countries, table) = tokio::join!(
        pipeline.load_countries(&paths.countries),
        pipeline.load_storm_table(&paths.storms)
    );
    let countries = countries.with_context(|| format!("Loading {}", paths.countries.display()))?;
    let table = table.with_context(|| format!("Loading {}", paths.storms.display()))?;

    let summary = table.summary();
    let set = pipeline.prepare(table.rows);
    let scales = set.scales;

    println!("Countries: {}", countries.len());
    println!();
    println!("Observations ({}):", paths.storms.display());
    println!("  rows read:         {}", summary.rows);
    println!("  malformed records: {}", summary.malformed);
    println!("  invalid wind:      {}", summary.invalid_wind);
    println!("  wind <= 0:         {}", summary.non_positive_wind);
    println!("  rejected total:    {}", set.rejected);
    println!("  outside window:    {} ({:?}, max {})", set.windowed_out, pipeline.window(), pipeline.max_points());
    println!("  kept:              {}", set.storms.len());
    println!();
    println!("Scales over [0, {}]:", set.max_wind_speed);
    println!("  radius: {} -> {}", scales.radius(0.0), scales.radius(set.max_wind_speed));
    println!(
        "  color:  {} -> {}",
        scales.color(0.0).to_css(),
        scales.color(set.max_wind_speed).to_css()
    );
    Ok(())
}
