use serde::Deserialize;
use smartsight::{ClassThresholds, DetectorConfig};
use std::collections::BTreeMap;

const EXAMPLE_JSON: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/smartsight-cli/config.example.json"
));
const SCHEMA_JSON: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/smartsight-cli/config.schema.json"
));

#[derive(Debug, Deserialize)]
struct DetectorBlock {
    input_size: usize,
    coordinates: String,
    default_threshold: f32,
    class_thresholds: BTreeMap<String, f32>,
    iou_threshold: f32,
    parallel: bool,
}

#[derive(Debug, Deserialize)]
struct FrameBlock {
    tensor_path: String,
    num_slots: usize,
    num_classes: usize,
}

#[derive(Debug, Deserialize)]
struct ExampleConfig {
    labels_path: String,
    tensor_format: String,
    frames: Vec<FrameBlock>,
    detector: DetectorBlock,
}

#[test]
fn example_config_matches_library_defaults() {
    let cfg: ExampleConfig = serde_json::from_str(EXAMPLE_JSON).unwrap();
    let defaults = DetectorConfig::default();

    assert!(!cfg.labels_path.is_empty());
    assert_eq!(cfg.tensor_format, "json");
    assert!(!cfg.frames.is_empty());
    for frame in &cfg.frames {
        assert!(frame.tensor_path.ends_with(".json"));
        assert_eq!((frame.num_slots, frame.num_classes), (8400, 80));
    }

    let det = &cfg.detector;
    assert_eq!(det.input_size, defaults.input_size);
    assert_eq!(det.coordinates, "input_pixels");
    assert_eq!(det.iou_threshold, defaults.iou_threshold);
    assert_eq!(det.parallel, defaults.parallel);

    let thresholds = det
        .class_thresholds
        .iter()
        .fold(ClassThresholds::uniform(det.default_threshold), |t, (name, thr)| {
            t.with_override(name, *thr)
        });
    assert_eq!(thresholds, defaults.thresholds);
}

#[test]
fn schema_lists_every_top_level_key() {
    let schema: serde_json::Value = serde_json::from_str(SCHEMA_JSON).unwrap();
    let example: serde_json::Value = serde_json::from_str(EXAMPLE_JSON).unwrap();
    let props = schema["properties"].as_object().unwrap();
    for key in example.as_object().unwrap().keys() {
        assert!(props.contains_key(key), "schema is missing `{key}`");
    }
}
