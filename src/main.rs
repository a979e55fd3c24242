// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use lane_detection::error::LaneError;
use lane_detection::frame_source::open_source;
use lane_detection::output::FrameSink;
use lane_detection::pipeline::{DetectorKind, LaneDetector, Pipeline};
use lane_detection::roi::{ConsoleInput, PolygonSelector};
use lane_detection::types::Config;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

const PREVIEW_FILE: &str = "roi_preview.png";

#[derive(Parser, Debug)]
#[command(name = "lane-detection", version, about = "Detect and draw road lane boundaries")]
struct Args {
    /// Lane detector to run
    #[arg(long, value_enum, default_value_t = DetectorKind::A)]
    detector: DetectorKind,

    /// Video file, image file or directory of images
    #[arg(long)]
    input: PathBuf,

    /// Directory for the processed frames (`<index>.png`)
    #[arg(long)]
    save_path: Option<PathBuf>,

    /// Do not show processed frames in a window
    #[arg(long)]
    not_display: bool,

    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pre-selected region of interest as `x,y;x,y;...`
    #[arg(long)]
    polygon: Option<String>,

    /// Color categories to gate edges by, e.g. `yellow,white`
    #[arg(long, value_delimiter = ',')]
    colors: Option<Vec<String>>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    apply_overrides(&mut config, &args)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lane_detection={}", config.logging.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚗 Lane Detection Starting");
    match &args.config {
        Some(path) => info!("✓ Configuration loaded from {}", path.display()),
        None => info!("✓ Using default configuration"),
    }

    let detector = LaneDetector::from_config(args.detector, &config)?;
    info!("✓ Detector {} ready", detector.kind().as_str());
    if !config.lane_colors.is_empty() {
        info!("Color gate: {}", config.lane_colors.join(", "));
    }

    let roi = PolygonSelector::from_config(&config.roi)?;

    let source = open_source(&args.input)
        .with_context(|| format!("Failed to open input {}", args.input.display()))?;
    info!("Processing {}", args.input.display());

    let preview_path = args
        .save_path
        .as_ref()
        .map(|dir| dir.join(PREVIEW_FILE))
        .unwrap_or_else(|| PathBuf::from(PREVIEW_FILE));
    if let Some(dir) = &args.save_path {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }
    let mut operator = ConsoleInput::new(io::stdin().lock(), io::stdout(), preview_path);

    let mut sink = FrameSink::new(args.save_path.clone(), !args.not_display);
    let mut pipeline = Pipeline::new(detector, roi);

    let summary = pipeline.run(source, &mut sink, &mut operator)?;
    summary.log();

    Ok(())
}

/// CLI values win over the config file.
fn apply_overrides(config: &mut Config, args: &Args) -> Result<(), LaneError> {
    if let Some(polygon) = &args.polygon {
        config.roi.polygon = parse_polygon(polygon)?;
    }
    if let Some(colors) = &args.colors {
        config.lane_colors = colors
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
    }
    config.validate()
}

/// Parse `x,y;x,y;...` into vertices.
fn parse_polygon(text: &str) -> Result<Vec<[i32; 2]>, LaneError> {
    text.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let coords: Vec<&str> = pair.split(',').map(str::trim).collect();
            match coords.as_slice() {
                [x, y] => match (x.parse::<i32>(), y.parse::<i32>()) {
                    (Ok(x), Ok(y)) => Ok([x, y]),
                    _ => Err(LaneError::InvalidConfig(format!("bad polygon vertex '{}'", pair))),
                },
                _ => Err(LaneError::InvalidConfig(format!("bad polygon vertex '{}'", pair))),
            }
        })
        .collect()
}
