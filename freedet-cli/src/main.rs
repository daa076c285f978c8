use clap::Parser;
use freedet::{DecodeConfig, DecodeOutput, Decoder, Detection, LevelView, RawOutput};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "FreeDet decoder CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DecodeConfigJson {
    num_classes: usize,
    conf_thresh: f32,
    iou_thresh: f32,
    topk: usize,
    no_decode: bool,
    parallel: bool,
}

impl Default for DecodeConfigJson {
    fn default() -> Self {
        let cfg = DecodeConfig::default();
        Self {
            num_classes: cfg.num_classes,
            conf_thresh: cfg.conf_thresh,
            iou_thresh: cfg.iou_thresh,
            topk: cfg.topk,
            no_decode: cfg.no_decode,
            parallel: cfg.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LevelJson {
    height: usize,
    width: usize,
    objectness: Vec<f32>,
    class_scores: Vec<f32>,
    box_regression: Vec<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    image_height: usize,
    image_width: usize,
    strides: Vec<usize>,
    levels: Vec<LevelJson>,
    output_path: Option<String>,
    decode: DecodeConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_height: 0,
            image_width: 0,
            strides: Vec::new(),
            levels: Vec::new(),
            output_path: None,
            decode: DecodeConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    class_id: usize,
}

impl From<Detection> for DetectionRecord {
    fn from(value: Detection) -> Self {
        Self {
            x1: value.bbox.x1,
            y1: value.bbox.y1,
            x2: value.bbox.x2,
            y2: value.bbox.y2,
            score: value.score,
            class_id: value.class_id,
        }
    }
}

#[derive(Debug, Serialize)]
struct RawRecord {
    rows: usize,
    row_len: usize,
    data: Vec<f32>,
}

impl From<RawOutput> for RawRecord {
    fn from(value: RawOutput) -> Self {
        Self {
            rows: value.rows(),
            row_len: value.row_len(),
            data: value.data().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    detections: Option<Vec<DetectionRecord>>,
    raw: Option<RawRecord>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("freedet=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.levels.is_empty() {
        return Err("levels must contain at least one prediction level".into());
    }

    let views: Result<Vec<LevelView<'_>>, _> = config
        .levels
        .iter()
        .map(|level| {
            LevelView::new(
                &level.objectness,
                &level.class_scores,
                &level.box_regression,
                level.height,
                level.width,
                config.decode.num_classes,
            )
        })
        .collect();
    let views = views?;

    let decoder = Decoder::new(config.strides.clone()).with_config(DecodeConfig {
        num_classes: config.decode.num_classes,
        conf_thresh: config.decode.conf_thresh,
        iou_thresh: config.decode.iou_thresh,
        topk: config.decode.topk,
        no_decode: config.decode.no_decode,
        parallel: config.decode.parallel,
    });

    let output = match decoder.run(&views, config.image_height, config.image_width)? {
        DecodeOutput::Detections(detections) => Output {
            detections: Some(detections.into_iter().map(DetectionRecord::from).collect()),
            raw: None,
        },
        DecodeOutput::Raw(raw) => Output {
            detections: None,
            raw: Some(raw.into()),
        },
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
