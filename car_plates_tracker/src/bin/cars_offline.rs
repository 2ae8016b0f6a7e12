//! Reads a video file, matches plates to tracked vehicles and writes one CSV
//! row per frame and vehicle with a legible plate.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use car_plates_tracker::config::TrackerAppConfig;
use car_plates_tracker::metrics;
use car_plates_tracker::plate_detection::dnn_ocr::DnnOcrReader;
use car_plates_tracker::plate_detection::object_detector::ObjectDetector;
use car_plates_tracker::plate_detection::plate_text::PlateFormat;
use car_plates_tracker::plate_detection::serializer::create_output;
use car_plates_tracker::plate_detection::tracker::IouTracker;
use car_plates_tracker::plate_detection::video_reader::VideoReader;
use car_plates_tracker::PlatePipeline;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML config file.
    #[arg(long, env = "PLATES_CONFIG")]
    config: Option<PathBuf>,
    /// Input video, overrides the config.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Output CSV, overrides the config.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Run inference on CUDA.
    #[arg(long)]
    use_gpu: bool,
    /// Only keep plates shaped like UK registrations.
    #[arg(long)]
    uk_plates: bool,
    /// Resize frames to WIDTHxHEIGHT before detection.
    #[arg(long, value_parser = parse_size)]
    resize: Option<(i32, i32)>,
    /// Trim the plate frame off each crop before OCR.
    #[arg(long)]
    trim_plate_border: bool,
    /// Write Prometheus counters here once the run ends.
    #[arg(long)]
    metrics_out: Option<PathBuf>,
}

fn parse_size(value: &str) -> std::result::Result<(i32, i32), String> {
    let (w, h) = value
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value}"))?;
    let w = w.parse().map_err(|_| format!("bad width in {value}"))?;
    let h = h.parse().map_err(|_| format!("bad height in {value}"))?;
    Ok((w, h))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = TrackerAppConfig::load_from(args.config.as_deref())?;
    if let Some(input) = args.input {
        cfg.input = input;
    }
    if let Some(output) = args.output {
        cfg.output = output;
    }
    if args.use_gpu {
        cfg.models.use_gpu = true;
    }
    if args.uk_plates {
        cfg.pipeline.text_policy.format = PlateFormat::Uk;
    }
    if let Some(path) = args.metrics_out {
        cfg.metrics_path = Some(path);
    }
    cfg.validate()?;

    let mut source = VideoReader::open(&cfg.input)?;
    if let Some((width, height)) = args.resize {
        source = source.with_resize(width, height);
    }

    let vehicle_detector = ObjectDetector::car_detector(
        &cfg.models.vehicle_cfg,
        &cfg.models.vehicle_weights,
        cfg.models.use_gpu,
    )
    .context("loading vehicle detector")?;
    let plate_detector = ObjectDetector::plate_detector(&cfg.models.plate_model, cfg.models.use_gpu)
        .context("loading plate detector")?;
    let reader = DnnOcrReader::new(&cfg.models.ocr_data_path, &cfg.models.ocr_language)
        .context("loading plate reader")?
        .with_border_trim(args.trim_plate_border);

    let tracker = IouTracker::new(vehicle_detector, cfg.tracker.clone());
    let mut pipeline = PlatePipeline::new(tracker, plate_detector, reader, cfg.pipeline.clone());

    let sink = create_output(&cfg.output)
        .with_context(|| format!("creating {}", cfg.output.display()))?;
    let store = pipeline.run(&mut source, sink)?;
    log::info!(
        "{} records over {} frames written to {}",
        store.record_count(),
        store.frame_count(),
        cfg.output.display()
    );

    if let Some(path) = &cfg.metrics_path {
        std::fs::write(path, metrics::render()?)
            .with_context(|| format!("writing metrics to {}", path.display()))?;
    }
    Ok(())
}
