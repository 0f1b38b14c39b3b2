use smartsight::{
    AnnouncementState, DetectionPipeline, DetectorConfig, FrameView, InferenceEngine, LabelTable,
    OwnedFrame, RawOutput, SmartSightError, SmartSightResult, Zone,
};

/// Engine that ignores the frame and replays a fixed output tensor.
struct ReplayEngine {
    output: RawOutput,
}

impl ReplayEngine {
    fn new(output: RawOutput) -> Self {
        Self { output }
    }
}

impl InferenceEngine for ReplayEngine {
    fn infer(&mut self, _frame: FrameView<'_>) -> SmartSightResult<RawOutput> {
        Ok(self.output.clone())
    }
}

/// Builds a channel-major output from `(cx, cy, w, h, scores)` in 640px input space.
fn output<const C: usize>(slots: &[([f32; 4], [f32; C])]) -> RawOutput {
    let n = slots.len();
    let c = C;
    let mut data = vec![0.0; (4 + c) * n];
    for (i, (geom, scores)) in slots.iter().enumerate() {
        for (k, v) in geom.iter().chain(scores.iter()).enumerate() {
            data[k * n + i] = *v;
        }
    }
    RawOutput {
        data,
        num_slots: n,
        num_classes: c,
    }
}

fn labels() -> LabelTable {
    LabelTable::new(["Chair", "Person", "Door"])
}

fn scene() -> RawOutput {
    output(&[
        // Chair on the left, detected twice.
        ([100.0, 320.0, 120.0, 200.0], [0.80, 0.05, 0.0]),
        ([104.0, 322.0, 118.0, 196.0], [0.60, 0.10, 0.0]),
        // Weak chair below the chair threshold.
        ([320.0, 100.0, 60.0, 60.0], [0.30, 0.0, 0.0]),
        // Person on the right.
        ([560.0, 300.0, 80.0, 300.0], [0.0, 0.70, 0.1]),
        // Door in front, barely above the default threshold.
        ([320.0, 400.0, 100.0, 200.0], [0.0, 0.0, 0.16]),
        // Background slot.
        ([10.0, 10.0, 5.0, 5.0], [0.01, 0.02, 0.03]),
    ])
}

#[test]
fn pipeline_detects_scene_on_non_square_frame() {
    let mut pipeline =
        DetectionPipeline::new(ReplayEngine::new(scene()), labels(), DetectorConfig::default())
            .unwrap();
    let frame = OwnedFrame::filled(1280, 720, [30, 30, 30]).unwrap();
    let dets = pipeline.detect(frame.view());

    let summary: Vec<(&str, Zone)> = dets.iter().map(|d| (d.class_name.as_ref(), d.zone)).collect();
    assert_eq!(
        summary,
        vec![
            ("Chair", Zone::Left),
            ("Person", Zone::Right),
            ("Door", Zone::Front),
        ]
    );
    assert!(dets.windows(2).all(|w| w[0].confidence >= w[1].confidence));

    // Horizontal and vertical scale factors are independent: 1280/640 and 720/640.
    let chair = &dets[0];
    assert!((chair.bbox.x1 - 80.0).abs() < 1e-3);
    assert!((chair.bbox.x2 - 320.0).abs() < 1e-3);
    assert!((chair.bbox.y1 - 247.5).abs() < 1e-3);
    assert!((chair.bbox.y2 - 472.5).abs() < 1e-3);
    assert_eq!(chair.raw.cx, 100.0);
}

#[test]
fn empty_label_table_never_detects() {
    let mut pipeline = DetectionPipeline::new(
        ReplayEngine::new(scene()),
        LabelTable::default(),
        DetectorConfig::default(),
    )
    .unwrap();
    let frame = OwnedFrame::filled(64, 64, [0, 0, 0]).unwrap();
    for _ in 0..3 {
        assert!(pipeline.detect(frame.view()).is_empty());
    }
    assert_eq!(
        pipeline.try_detect(frame.view()).err(),
        Some(SmartSightError::EmptyLabels)
    );
}

#[test]
fn malformed_output_fails_only_that_frame() {
    let good = scene();
    let mut bad = scene();
    bad.num_slots = 150;

    let mut outputs = vec![good.clone(), bad, good].into_iter();
    let engine = move |_frame: FrameView<'_>| -> SmartSightResult<RawOutput> {
        outputs.next().ok_or(SmartSightError::ModelUnavailable {
            reason: "replay exhausted".to_owned(),
        })
    };
    let mut pipeline = DetectionPipeline::new(engine, labels(), DetectorConfig::default()).unwrap();
    let frame = OwnedFrame::filled(640, 640, [0, 0, 0]).unwrap();

    assert_eq!(pipeline.detect(frame.view()).len(), 3);
    assert!(matches!(
        pipeline.try_detect(frame.view()),
        Err(SmartSightError::OutOfRange {
            context: "buffer",
            ..
        })
    ));
    assert_eq!(pipeline.detect(frame.view()).len(), 3);
    assert!(pipeline.detect(frame.view()).is_empty());
}

#[test]
fn engine_errors_degrade_to_empty_detections() {
    let engine = |_frame: FrameView<'_>| -> SmartSightResult<RawOutput> {
        Err(SmartSightError::ModelUnavailable {
            reason: "interpreter closed".to_owned(),
        })
    };
    let mut pipeline = DetectionPipeline::new(engine, labels(), DetectorConfig::default()).unwrap();
    let frame = OwnedFrame::filled(32, 32, [0, 0, 0]).unwrap();
    assert!(pipeline.detect(frame.view()).is_empty());
}

#[test]
fn installing_an_engine_recovers_the_pipeline() {
    let mut pipeline = DetectionPipeline::without_engine(labels(), DetectorConfig::default()).unwrap();
    let frame = OwnedFrame::filled(640, 640, [0, 0, 0]).unwrap();
    assert!(pipeline.detect(frame.view()).is_empty());

    pipeline.set_engine(ReplayEngine::new(scene()));
    assert!(pipeline.is_ready());
    assert_eq!(pipeline.detect(frame.view()).len(), 3);
}

#[test]
fn announcements_follow_detections_across_frames() {
    let mut pipeline =
        DetectionPipeline::new(ReplayEngine::new(scene()), labels(), DetectorConfig::default())
            .unwrap();
    let frame = OwnedFrame::filled(640, 480, [0, 0, 0]).unwrap();
    let mut state = AnnouncementState::new();

    let first = state.announce(&pipeline.detect(frame.view()));
    assert_eq!(
        first,
        vec![
            "Chair detected in left side".to_owned(),
            "Person detected in right side".to_owned(),
            "Door detected in front".to_owned(),
        ]
    );
    let second = state.announce(&pipeline.detect(frame.view()));
    assert!(second.is_empty());
}

#[test]
fn process_output_runs_without_an_engine() {
    let pipeline = DetectionPipeline::without_engine(labels(), DetectorConfig::default()).unwrap();
    let dets = pipeline.process_output(&scene(), 640, 640).unwrap();
    assert_eq!(dets.len(), 3);
    let mut short = scene();
    short.data.pop();
    assert!(pipeline.process_output(&short, 640, 640).is_err());
}
