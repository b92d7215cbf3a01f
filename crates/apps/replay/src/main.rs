use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::Parser;
use foundation::math::{LonLat, Vec2};
use layers::MapLayer;
use layers::engine::SoftwareEngine;
use layers::instagram::InstagramLayer;
use layers::params::{LayerConfig, MapParams};
use replay::{ReplayError, parse_script, run_script};
use runtime::activity::ActivityRecorder;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay scripted pointer events against the post layer")]
struct Args {
    /// Point table JSON: {"columns": {...}, "data": [[...], ...]}
    #[arg(long)]
    table: PathBuf,

    /// Event script: a JSON array of events
    #[arg(long)]
    script: PathBuf,

    /// Initial map parameters (JSON object)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Layer configuration (JSON object)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 1024.0)]
    width: f64,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 768.0)]
    height: f64,

    /// Initial view center: lon,lat
    #[arg(long, default_value = "0,0")]
    center: String,

    /// Projection scale
    #[arg(long, default_value_t = 4.0)]
    px_per_degree: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let center = parse_center(&args.center)?;
    let config = match &args.config {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => LayerConfig::default(),
    };
    let params = match &args.params {
        Some(path) => MapParams::from_json(&fs::read_to_string(path)?)?,
        None => MapParams::default(),
    };

    let engine = SoftwareEngine::new(Vec2::new(args.width, args.height), center, args.px_per_degree);
    let mut layer = InstagramLayer::new(1, engine, ActivityRecorder::new(), config);
    layer
        .load_table_json(&fs::read_to_string(&args.table)?)
        .map_err(ReplayError::from)?;
    layer.update_map_params(&params);

    let events = parse_script(&fs::read_to_string(&args.script)?)?;
    info!(events = events.len(), "replaying script");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_script(&mut layer, &events, &mut out)?;
    serde_json::to_writer_pretty(&mut out, &layer.internal_state())?;
    out.write_all(b"\n")?;
    Ok(())
}

fn parse_center(raw: &str) -> Result<LonLat, String> {
    let mut parts = raw.split(',').map(str::trim).map(str::parse::<f64>);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Ok(lon)), Some(Ok(lat)), None) => Ok(LonLat::new(lon, lat)),
        _ => Err(format!("invalid center {raw:?}, expected lon,lat")),
    }
}
