//! Detection replay
//!
//! Feeds per-frame detections from a JSON-lines file through the SORT
//! tracker and writes the identified boxes for every frame as JSON lines.
//!
//! Usage:
//!   cargo run --release -p sort-replay -- --input replay/data/sample.jsonl --config replay/data/config.json
mod frames;

use anyhow::Context;
use clap::Parser;
use frames::{write_frame, FrameReader, TrackFrame};
use sorttrack::{EstimatorConfig, KalmanConfig, SortConfig, SortTracker};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(version, about = "Replay detections through the SORT tracker")]
struct Args {
    /// JSON-lines file, one `{"detections": [[x1, y1, x2, y2], ...]}` per frame
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON tracker config; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_age: Option<u32>,

    #[arg(long)]
    min_hits: Option<u32>,

    #[arg(long)]
    iou_threshold: Option<f32>,

    /// Use the constant-velocity Kalman estimator
    #[arg(long)]
    kalman: bool,
}

impl Args {
    fn tracker_config(&self) -> anyhow::Result<SortConfig> {
        let mut config: SortConfig = match &self.config {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("opening config {}", path.display()))?;
                serde_json::from_reader(BufReader::new(file))
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => SortConfig::default(),
        };

        if let Some(max_age) = self.max_age {
            config.max_age = max_age;
        }
        if let Some(min_hits) = self.min_hits {
            config.min_hits = min_hits;
        }
        if let Some(iou_threshold) = self.iou_threshold {
            config.iou_threshold = iou_threshold;
        }
        if self.kalman {
            config.estimator = EstimatorConfig::Kalman(KalmanConfig::default());
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.tracker_config()?;
    log::info!(
        "Tracker config: max_age={}, min_hits={}, iou_threshold={}, estimator={:?}",
        config.max_age,
        config.min_hits,
        config.iou_threshold,
        config.estimator
    );
    let mut tracker = SortTracker::new(config)?;

    let input = File::open(&args.input)
        .with_context(|| format!("opening input {}", args.input.display()))?;
    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating output {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let start = Instant::now();
    let mut rejected_total = 0;

    for frame in FrameReader::new(BufReader::new(input)) {
        let (detections, parse_error) = frame.context("reading input")?;

        let result = tracker.update_rows(&detections.detections);
        rejected_total += result.rejected.len();

        let mut record = TrackFrame::from(&result);
        if let Some(e) = parse_error {
            log::warn!("Frame {}: {}", result.frame, e);
            record.errors.insert(0, e);
        }
        write_frame(&mut output, &record)?;
    }
    output.flush()?;

    log::info!(
        "Processed {} frames in {:?}: {} tracks created, {} live, {} detections rejected",
        tracker.frame_count(),
        start.elapsed(),
        tracker.tracks_created(),
        tracker.num_tracks(),
        rejected_total
    );
    Ok(())
}
