use clap::Parser;
use image::ImageReader;
use std::path::PathBuf;
use tracing::Level;

use stockpile_scan::detection::{OcrsRecognizer, RtenModelLoader};
use stockpile_scan::{ScanConfig, ScanOptions, StockpileScanner};

#[derive(Parser)]
#[command(name = "stockpile-scan")]
#[command(about = "Find the stockpile in a screenshot and read its items")]
struct Cli {
    /// Path to the screenshot
    #[arg(value_name = "IMAGE")]
    image_path: PathBuf,

    /// Icon classification model (.rten)
    #[arg(long, value_name = "MODEL")]
    model: PathBuf,

    /// JSON array of class names, in model output order
    #[arg(long, value_name = "FILE")]
    classes: PathBuf,

    /// JSON file overriding detection thresholds
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum concurrent quantity recognitions
    #[arg(long, value_name = "N")]
    ocr_concurrency: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Save debug crops to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let img = ImageReader::open(&args.image_path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
    tracing::debug!("Image loaded: {}x{}", img.width(), img.height());

    let class_labels: Vec<String> = serde_json::from_str(&std::fs::read_to_string(&args.classes)?)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", args.classes.display(), e))?;

    let config = match &args.config {
        Some(path) => ScanConfig::from_json_file(path)?,
        None => ScanConfig::default(),
    };
    let loader = RtenModelLoader {
        input_size: config.content.icon_input_size,
    };

    let mut scanner = StockpileScanner::new(OcrsRecognizer::from_default_cache()?, loader)
        .with_config(config);
    if let Some(dir) = args.debug_out {
        scanner = scanner.with_debug(dir)?;
    }

    let model_id = args.model.to_string_lossy();
    let stockpile = scanner
        .process(
            &img,
            &model_id,
            &class_labels,
            ScanOptions {
                ocr_concurrency: args.ocr_concurrency,
            },
        )
        .await?;

    println!("{}", serde_json::to_string_pretty(&stockpile)?);
    Ok(())
}
