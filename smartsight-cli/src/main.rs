use clap::Parser;
use serde::{Deserialize, Serialize};
use smartsight::io::frame_dimensions;
use smartsight::{
    zone_counts, AnnouncementState, ClassThresholds, CoordinateSpace, Detection,
    DetectionPipeline, DetectorConfig, LabelTable, RawOutput, Zone,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "SmartSight CLI: replay recorded detector outputs through the post-processing pipeline"
)]
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
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum CoordinateSpaceConfig {
    InputPixels,
    Normalized,
}

impl From<CoordinateSpaceConfig> for CoordinateSpace {
    fn from(value: CoordinateSpaceConfig) -> Self {
        match value {
            CoordinateSpaceConfig::InputPixels => CoordinateSpace::InputPixels,
            CoordinateSpaceConfig::Normalized => CoordinateSpace::Normalized,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum TensorFormat {
    /// A JSON array of numbers.
    Json,
    /// Raw little-endian `f32` values.
    F32le,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct DetectorConfigJson {
    input_size: usize,
    coordinates: CoordinateSpaceConfig,
    default_threshold: f32,
    class_thresholds: BTreeMap<String, f32>,
    iou_threshold: f32,
    parallel: bool,
}

impl Default for DetectorConfigJson {
    fn default() -> Self {
        let cfg = DetectorConfig::default();
        Self {
            input_size: cfg.input_size,
            coordinates: CoordinateSpaceConfig::InputPixels,
            default_threshold: cfg.thresholds.default,
            class_thresholds: cfg
                .thresholds
                .overrides
                .into_iter()
                .map(|o| (o.class_name, o.threshold))
                .collect(),
            iou_threshold: cfg.iou_threshold,
            parallel: cfg.parallel,
        }
    }
}

impl From<DetectorConfigJson> for DetectorConfig {
    fn from(value: DetectorConfigJson) -> Self {
        let thresholds = value
            .class_thresholds
            .iter()
            .fold(ClassThresholds::uniform(value.default_threshold), |t, (name, thr)| {
                t.with_override(name, *thr)
            });
        DetectorConfig {
            input_size: value.input_size,
            coordinates: value.coordinates.into(),
            thresholds,
            iou_threshold: value.iou_threshold,
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FrameConfig {
    /// Recorded output tensor.
    tensor_path: String,
    num_slots: usize,
    num_classes: usize,
    /// Source frame; its size is used when `image_width`/`image_height` are absent.
    image_path: Option<String>,
    image_width: Option<usize>,
    image_height: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Config {
    labels_path: String,
    tensor_format: TensorFormat,
    frames: Vec<FrameConfig>,
    output_path: Option<String>,
    detector: DetectorConfigJson,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            labels_path: String::new(),
            tensor_format: TensorFormat::Json,
            frames: Vec::new(),
            output_path: None,
            detector: DetectorConfigJson::default(),
        }
    }
}

#[derive(Debug, Serialize)]
struct DetectionRecord {
    class_id: usize,
    class_name: String,
    confidence: f32,
    zone: &'static str,
    bbox: [f32; 4],
}

impl From<&Detection> for DetectionRecord {
    fn from(value: &Detection) -> Self {
        Self {
            class_id: value.class_id,
            class_name: value.class_name.to_string(),
            confidence: value.confidence,
            zone: zone_name(value.zone),
            bbox: [value.bbox.x1, value.bbox.y1, value.bbox.x2, value.bbox.y2],
        }
    }
}

#[derive(Debug, Serialize)]
struct FrameRecord {
    tensor_path: String,
    image_width: usize,
    image_height: usize,
    error: Option<String>,
    detections: Vec<DetectionRecord>,
    zones: BTreeMap<&'static str, usize>,
    announcements: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Output {
    frames: Vec<FrameRecord>,
}

fn zone_name(zone: Zone) -> &'static str {
    match zone {
        Zone::Left => "left",
        Zone::Front => "front",
        Zone::Right => "right",
    }
}

fn read_tensor(path: &str, format: &TensorFormat) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
    match format {
        TensorFormat::Json => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        TensorFormat::F32le => {
            let bytes = fs::read(path)?;
            if bytes.len() % 4 != 0 {
                return Err(format!("{path}: length {} is not a multiple of 4", bytes.len()).into());
            }
            Ok(bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect())
        }
    }
}

fn frame_size(frame: &FrameConfig) -> Result<(usize, usize), Box<dyn std::error::Error>> {
    match (frame.image_width, frame.image_height, frame.image_path.as_deref()) {
        (Some(w), Some(h), _) => Ok((w, h)),
        (_, _, Some(path)) => Ok(frame_dimensions(path)?),
        _ => Err(format!(
            "{}: set image_width/image_height or image_path",
            frame.tensor_path
        )
        .into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("smartsight=info".parse()?))
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
    if config.labels_path.is_empty() {
        return Err("labels_path must be set in the config".into());
    }
    if config.frames.is_empty() {
        return Err("frames must list at least one recorded tensor".into());
    }

    let labels = LabelTable::load(&config.labels_path)?;
    if labels.is_empty() {
        tracing::warn!(path = %config.labels_path, "label file is empty; no detections will be produced");
    }
    let pipeline = DetectionPipeline::without_engine(labels, config.detector.into())?;
    let mut announcements = AnnouncementState::new();

    let mut frames = Vec::with_capacity(config.frames.len());
    for frame in &config.frames {
        let (image_width, image_height) = frame_size(frame)?;
        let output = RawOutput {
            data: read_tensor(&frame.tensor_path, &config.tensor_format)?,
            num_slots: frame.num_slots,
            num_classes: frame.num_classes,
        };

        let (detections, error) =
            match pipeline.process_output(&output, image_width, image_height) {
                Ok(detections) => (detections, None),
                Err(err) => {
                    tracing::warn!(tensor = %frame.tensor_path, error = %err, "frame failed");
                    (Vec::new(), Some(err.to_string()))
                }
            };
        let spoken = announcements.announce(&detections);
        tracing::info!(
            tensor = %frame.tensor_path,
            detections = detections.len(),
            announced = spoken.len(),
            "frame processed"
        );

        frames.push(FrameRecord {
            tensor_path: frame.tensor_path.clone(),
            image_width,
            image_height,
            error,
            zones: zone_counts(&detections)
                .into_iter()
                .map(|(zone, count)| (zone_name(zone), count))
                .collect(),
            detections: detections.iter().map(DetectionRecord::from).collect(),
            announcements: spoken,
        });
    }

    let json = serde_json::to_string_pretty(&Output { frames })?;
    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
