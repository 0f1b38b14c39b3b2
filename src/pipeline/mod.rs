//! Per-frame detection pipeline.
//!
//! `DetectionPipeline` runs inference through an [`InferenceEngine`], decodes
//! the output tensor, filters candidates and suppresses duplicates. Failures
//! never escape a frame: [`DetectionPipeline::detect`] degrades to an empty
//! list and reports the cause through tracing, while
//! [`DetectionPipeline::try_detect`] returns it to callers that want it.

use crate::detection::Detection;
use crate::filter::{CandidateFilter, ClassThresholds, CoordinateSpace};
use crate::image::FrameView;
use crate::labels::LabelTable;
use crate::nms::{Suppressor, DEFAULT_IOU_THRESHOLD};
use crate::tensor::RawOutput;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{SmartSightError, SmartSightResult};

pub mod worker;

/// Default side of the square model input.
pub const DEFAULT_INPUT_SIZE: usize = 640;

/// Inference backend producing the raw output tensor for a frame.
///
/// The engine owns resizing/normalizing the frame into its square input.
/// Calls are synchronous and must be bounded in time.
pub trait InferenceEngine: Send {
    fn infer(&mut self, frame: FrameView<'_>) -> SmartSightResult<RawOutput>;
}

impl<F> InferenceEngine for F
where
    F: FnMut(FrameView<'_>) -> SmartSightResult<RawOutput> + Send,
{
    fn infer(&mut self, frame: FrameView<'_>) -> SmartSightResult<RawOutput> {
        self(frame)
    }
}

/// Configuration for the detection pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    /// Side of the square model input in pixels.
    pub input_size: usize,
    /// Units of the box channels.
    pub coordinates: CoordinateSpace,
    /// Per-class confidence thresholds.
    pub thresholds: ClassThresholds,
    /// NMS IoU threshold.
    pub iou_threshold: f32,
    /// Score slots in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            coordinates: CoordinateSpace::InputPixels,
            thresholds: ClassThresholds::default(),
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            parallel: false,
        }
    }
}

impl DetectorConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> SmartSightResult<()> {
        if self.input_size == 0 {
            return Err(SmartSightError::InvalidConfig("input_size must be positive"));
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(SmartSightError::InvalidConfig("iou_threshold must be in [0, 1]"));
        }
        self.thresholds.validate()
    }
}

/// Single-frame detection pipeline.
///
/// Not reentrant: `try_detect` takes `&mut self`. Run it from one worker, see
/// [`worker::DetectionWorker`].
pub struct DetectionPipeline {
    engine: Option<Box<dyn InferenceEngine>>,
    labels: LabelTable,
    filter: CandidateFilter,
    suppressor: Suppressor,
    config: DetectorConfig,
}

impl DetectionPipeline {
    /// Creates a pipeline around a loaded engine.
    pub fn new<E>(engine: E, labels: LabelTable, config: DetectorConfig) -> SmartSightResult<Self>
    where
        E: InferenceEngine + 'static,
    {
        let mut pipeline = Self::without_engine(labels, config)?;
        pipeline.engine = Some(Box::new(engine));
        Ok(pipeline)
    }

    /// Creates a pipeline whose model failed to load.
    ///
    /// Every frame reports [`SmartSightError::ModelUnavailable`] until an
    /// engine is installed with [`DetectionPipeline::set_engine`].
    pub fn without_engine(labels: LabelTable, config: DetectorConfig) -> SmartSightResult<Self> {
        config.validate()?;
        let filter = CandidateFilter::new(config.thresholds.clone(), config.input_size, config.coordinates)
            .with_parallel(config.parallel);
        Ok(Self {
            engine: None,
            labels,
            filter,
            suppressor: Suppressor::new(config.iou_threshold),
            config,
        })
    }

    /// Installs (or replaces) the inference engine.
    pub fn set_engine<E>(&mut self, engine: E)
    where
        E: InferenceEngine + 'static,
    {
        self.engine = Some(Box::new(engine));
    }

    /// Returns `true` when an engine is installed and labels are loaded.
    pub fn is_ready(&self) -> bool {
        self.engine.is_some() && !self.labels.is_empty()
    }

    /// Label table shared with every detection.
    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Configuration the pipeline was built with.
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Post-processes an output tensor for a frame of the given size.
    pub fn process_output(
        &self,
        output: &RawOutput,
        image_width: usize,
        image_height: usize,
    ) -> SmartSightResult<Vec<Detection>> {
        if self.labels.is_empty() {
            return Err(SmartSightError::EmptyLabels);
        }
        let tensor = output.tensor()?;
        let candidates = self.filter.filter(tensor, &self.labels, image_width, image_height)?;
        let raw_count = candidates.len();
        let kept = self.suppressor.suppress(candidates);
        trace_event!(
            "detections",
            slots = output.num_slots,
            candidates = raw_count,
            kept = kept.len()
        );
        Ok(kept)
    }

    /// Runs inference and post-processing for one frame.
    pub fn try_detect(&mut self, frame: FrameView<'_>) -> SmartSightResult<Vec<Detection>> {
        let _span = trace_span!("detect", width = frame.width(), height = frame.height()).entered();
        if self.labels.is_empty() {
            return Err(SmartSightError::EmptyLabels);
        }
        let engine = self
            .engine
            .as_mut()
            .ok_or_else(|| SmartSightError::ModelUnavailable {
                reason: "inference engine not loaded".to_owned(),
            })?;
        let output = engine.infer(frame)?;
        self.process_output(&output, frame.width(), frame.height())
    }

    /// Like [`DetectionPipeline::try_detect`], but a failed frame yields no
    /// detections.
    pub fn detect(&mut self, frame: FrameView<'_>) -> Vec<Detection> {
        match self.try_detect(frame) {
            Ok(detections) => detections,
            Err(err) => {
                trace_warn!("frame_failed", error = err.to_string().as_str());
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for DetectionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionPipeline")
            .field("engine_loaded", &self.engine.is_some())
            .field("labels", &self.labels.len())
            .field("config", &self.config)
            .finish()
    }
}
