mod annotate;
mod chart;
mod config;
mod export;
mod report;
mod source;
mod text;

use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use export::OutputPaths;
use faceratio_core::{FaceMeshDetector, LandmarkSource, Landmarks};
use source::LandmarkFile;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "faceratio", about = "Facial proportion analysis from a portrait photo")]
struct Cli {
    /// Portrait photo to analyse
    #[arg(short, long)]
    image: PathBuf,

    /// Annotated image path (default: <image>_annotated.jpg)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Read normalized landmarks from a JSON file instead of running the model
    #[arg(long)]
    landmarks: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "FACERATIO_CONFIG")]
    config: Option<PathBuf>,

    /// Also print the metrics JSON to stdout
    #[arg(long)]
    json: bool,

    /// Skip the annotated image
    #[arg(long)]
    no_annotate: bool,

    /// Skip the bar chart
    #[arg(long)]
    no_chart: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    let table = config.ideal_table()?;
    let scheme = config.scheme();

    let image = image::open(&cli.image)
        .with_context(|| format!("cannot open image {}", cli.image.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    tracing::info!(path = %cli.image.display(), width, height, "image loaded");

    let mut source: Box<dyn LandmarkSource> = match &cli.landmarks {
        Some(path) => Box::new(LandmarkFile::open(path)?),
        None => {
            let detector = FaceMeshDetector::load(
                &config.face_model_path(),
                &config.model_path(),
                config.detector.intra_threads,
            )
            .context("failed to load face detection and landmark models")?
                .with_min_confidence(config.detector.min_confidence);
            Box::new(detector)
        }
    };

    let Some(set) = source.detect(&image).context("landmark detection failed")? else {
        tracing::warn!(path = %cli.image.display(), "no face detected");
        println!("⚠ No face detected in the image.");
        return Ok(());
    };

    let landmarks = Landmarks::new(&set, &scheme, width, height)?;

    let roll = faceratio_core::roll_deg(&landmarks)?;
    if roll > config.render.max_roll_deg {
        tracing::warn!(
            roll_deg = roll,
            limit = config.render.max_roll_deg,
            "head is tilted, fifths and asymmetry may be skewed"
        );
    }

    let metrics = faceratio_core::extract_metrics(&landmarks)?;
    let evaluations = faceratio_core::evaluate(&metrics, &table);
    print!("{}", report::render(&metrics, &evaluations));

    let paths = OutputPaths::for_image(&cli.image, cli.output.as_deref());
    let json = export::write_metrics_json(&metrics, &paths.metrics)?;
    if cli.json {
        println!("{json}");
    }
    println!("  Metrics saved to: {}", paths.metrics.display());

    let font = if cli.no_annotate && cli.no_chart {
        None
    } else {
        text::load_font(config.render.font_path.as_deref())
    };

    if !cli.no_annotate {
        let annotated = annotate::annotate(&image, &landmarks, font.as_ref())?;
        annotated
            .save(&paths.annotated)
            .with_context(|| format!("failed to write {}", paths.annotated.display()))?;
        println!("  Annotated image saved to: {}", paths.annotated.display());
    }

    if !cli.no_chart {
        chart::render(&metrics, font.as_ref())
            .save(&paths.chart)
            .with_context(|| format!("failed to write {}", paths.chart.display()))?;
        println!("  Chart saved to: {}", paths.chart.display());
    }

    Ok(())
}
