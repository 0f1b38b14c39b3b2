//! Candidate selection: best class, class-dependent threshold, pixel mapping.
//!
//! Each slot's winning class is the first maximum over its scores. The slot
//! survives when that score strictly exceeds the threshold configured for the
//! class name. Survivors are mapped from model input space to pixels of the
//! original frame, clamped to it and tagged with a horizontal [`Zone`].

use crate::detection::Detection;
use crate::geometry::{BBox, Zone};
use crate::labels::LabelTable;
use crate::tensor::{OutputTensor, RawGeometry};
use crate::util::{SmartSightError, SmartSightResult};

#[cfg(feature = "rayon")]
pub(crate) mod rayon;
#[cfg(feature = "simd")]
pub(crate) mod simd;

/// Threshold for a single named class.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassThreshold {
    pub class_name: String,
    pub threshold: f32,
}

/// Confidence thresholds keyed by class name.
///
/// Names match ASCII case-insensitively; classes without an override use
/// `default`.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassThresholds {
    pub default: f32,
    pub overrides: Vec<ClassThreshold>,
}

impl Default for ClassThresholds {
    fn default() -> Self {
        Self {
            default: 0.15,
            overrides: vec![ClassThreshold {
                class_name: "Chair".to_owned(),
                threshold: 0.35,
            }],
        }
    }
}

impl ClassThresholds {
    /// A single threshold for every class.
    pub fn uniform(threshold: f32) -> Self {
        Self {
            default: threshold,
            overrides: Vec::new(),
        }
    }

    /// Sets (or replaces) the threshold for `class_name`.
    pub fn with_override(mut self, class_name: &str, threshold: f32) -> Self {
        match self
            .overrides
            .iter_mut()
            .find(|o| o.class_name.eq_ignore_ascii_case(class_name))
        {
            Some(existing) => existing.threshold = threshold,
            None => self.overrides.push(ClassThreshold {
                class_name: class_name.to_owned(),
                threshold,
            }),
        }
        self
    }

    /// Threshold a score of `class_name` must exceed.
    pub fn threshold_for(&self, class_name: &str) -> f32 {
        self.overrides
            .iter()
            .find(|o| o.class_name.eq_ignore_ascii_case(class_name))
            .map_or(self.default, |o| o.threshold)
    }

    pub(crate) fn validate(&self) -> SmartSightResult<()> {
        let all_finite = self.default.is_finite()
            && self.overrides.iter().all(|o| o.threshold.is_finite());
        if !all_finite {
            return Err(SmartSightError::InvalidConfig("thresholds must be finite"));
        }
        Ok(())
    }
}

/// Units of the box channels emitted by the model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoordinateSpace {
    /// Pixels of the square model input (`0..input_size`).
    #[default]
    InputPixels,
    /// Fractions of the model input (`0..1`).
    Normalized,
}

/// Maps model-space geometry to pixels of the original frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PixelMapping {
    sx: f32,
    sy: f32,
    width: f32,
    height: f32,
}

impl PixelMapping {
    fn new(coordinates: CoordinateSpace, input_size: usize, width: usize, height: usize) -> Self {
        let width = width as f32;
        let height = height as f32;
        let (sx, sy) = match coordinates {
            CoordinateSpace::InputPixels => {
                let side = input_size as f32;
                (width / side, height / side)
            }
            CoordinateSpace::Normalized => (width, height),
        };
        Self {
            sx,
            sy,
            width,
            height,
        }
    }

    /// Returns the clamped box and the unclamped horizontal center.
    fn map(&self, raw: RawGeometry) -> (BBox, f32) {
        let cx = raw.cx * self.sx;
        let unclamped = BBox::from_center(cx, raw.cy * self.sy, raw.w * self.sx, raw.h * self.sy);
        (unclamped.clamped(self.width, self.height), cx)
    }
}

/// Turns decoded slots into thresholded, pixel-space detections.
#[derive(Clone, Debug)]
pub struct CandidateFilter {
    thresholds: ClassThresholds,
    input_size: usize,
    coordinates: CoordinateSpace,
    parallel: bool,
}

impl CandidateFilter {
    /// Creates a filter for a model with a square input of `input_size`.
    pub fn new(thresholds: ClassThresholds, input_size: usize, coordinates: CoordinateSpace) -> Self {
        Self {
            thresholds,
            input_size,
            coordinates,
            parallel: false,
        }
    }

    /// Scores slots on the rayon pool when the `rayon` feature is enabled.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Per-class confidence thresholds in use.
    pub fn thresholds(&self) -> &ClassThresholds {
        &self.thresholds
    }

    /// Whether parallel slot scoring was requested.
    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Returns the surviving candidates of `tensor` in slot order.
    ///
    /// Only the first `min(C, labels.len())` classes are considered so every
    /// detection names a valid label. Boxes that clamp to zero width or
    /// height are dropped.
    pub fn filter(
        &self,
        tensor: OutputTensor<'_>,
        labels: &LabelTable,
        image_width: usize,
        image_height: usize,
    ) -> SmartSightResult<Vec<Detection>> {
        if labels.is_empty() {
            return Err(SmartSightError::EmptyLabels);
        }
        if image_width == 0 || image_height == 0 {
            return Err(SmartSightError::InvalidDimensions {
                width: image_width,
                height: image_height,
            });
        }
        if self.input_size == 0 {
            return Err(SmartSightError::InvalidConfig("input_size must be positive"));
        }
        let limit = tensor.num_classes().min(labels.len());
        if limit == 0 || tensor.num_slots() == 0 {
            return Ok(Vec::new());
        }
        let mapping = PixelMapping::new(self.coordinates, self.input_size, image_width, image_height);

        #[cfg(feature = "rayon")]
        if self.parallel {
            return self::rayon::filter_par(self, tensor, labels, &mapping, limit);
        }

        self.filter_seq(tensor, labels, &mapping, limit)
    }

    #[cfg(not(feature = "simd"))]
    fn filter_seq(
        &self,
        tensor: OutputTensor<'_>,
        labels: &LabelTable,
        mapping: &PixelMapping,
        limit: usize,
    ) -> SmartSightResult<Vec<Detection>> {
        let mut out = Vec::new();
        for idx in 0..tensor.num_slots() {
            let slot = tensor.slot(idx)?;
            if let Some((class_id, score)) = slot.best_class(limit) {
                if let Some(det) = self.admit(slot.geometry(), class_id, score, labels, mapping) {
                    out.push(det);
                }
            }
        }
        Ok(out)
    }

    #[cfg(feature = "simd")]
    fn filter_seq(
        &self,
        tensor: OutputTensor<'_>,
        labels: &LabelTable,
        mapping: &PixelMapping,
        limit: usize,
    ) -> SmartSightResult<Vec<Detection>> {
        let mut out = Vec::new();
        self::simd::for_each_best_class(tensor, limit, |raw, class_id, score| {
            if let Some(det) = self.admit(raw, class_id, score, labels, mapping) {
                out.push(det);
            }
        })?;
        Ok(out)
    }

    /// Applies the class threshold and maps a winning slot to a detection.
    pub(crate) fn admit(
        &self,
        raw: RawGeometry,
        class_id: usize,
        score: f32,
        labels: &LabelTable,
        mapping: &PixelMapping,
    ) -> Option<Detection> {
        let class_name = labels.get(class_id)?;
        let admitted = score > self.thresholds.threshold_for(class_name);
        if !admitted {
            return None;
        }

        let (bbox, center_x) = mapping.map(raw);
        if !bbox.has_area() {
            return None;
        }

        Some(Detection {
            bbox,
            raw,
            confidence: score,
            class_id,
            class_name: class_name.clone(),
            zone: Zone::classify(center_x, mapping.width),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{CandidateFilter, ClassThresholds, CoordinateSpace};
    use crate::geometry::Zone;
    use crate::labels::LabelTable;
    use crate::tensor::OutputTensor;

    /// Builds a channel-major buffer from `(cx, cy, w, h, scores)` rows.
    fn tensor_data(slots: &[([f32; 4], Vec<f32>)]) -> Vec<f32> {
        let n = slots.len();
        let c = slots[0].1.len();
        let mut data = vec![0.0; (4 + c) * n];
        for (i, (geom, scores)) in slots.iter().enumerate() {
            for (k, v) in geom.iter().chain(scores.iter()).enumerate() {
                data[k * n + i] = *v;
            }
        }
        data
    }

    #[test]
    fn thresholds_default_to_chair_override() {
        let t = ClassThresholds::default();
        assert_eq!(t.threshold_for("Chair"), 0.35);
        assert_eq!(t.threshold_for("chair"), 0.35);
        assert_eq!(t.threshold_for("Person"), 0.15);
        let t = t.with_override("CHAIR", 0.5).with_override("Door", 0.2);
        assert_eq!(t.overrides.len(), 2);
        assert_eq!(t.threshold_for("chair"), 0.5);
        assert_eq!(t.threshold_for("door"), 0.2);
    }

    #[test]
    fn maps_input_pixels_to_original_frame() {
        let data = tensor_data(&[([320.0, 320.0, 64.0, 128.0], vec![0.9])]);
        let tensor = OutputTensor::new(&data, 1, 1).unwrap();
        let labels = LabelTable::new(["Person"]);
        let filter = CandidateFilter::new(ClassThresholds::default(), 640, CoordinateSpace::InputPixels);
        let dets = filter.filter(tensor, &labels, 1280, 320).unwrap();
        assert_eq!(dets.len(), 1);
        let b = dets[0].bbox;
        assert!((b.x1 - 576.0).abs() < 1e-3);
        assert!((b.x2 - 704.0).abs() < 1e-3);
        assert!((b.y1 - 128.0).abs() < 1e-3);
        assert!((b.y2 - 192.0).abs() < 1e-3);
        assert_eq!(dets[0].zone, Zone::Front);
        assert_eq!(dets[0].raw.w, 64.0);
    }

    #[test]
    fn normalized_coordinates_scale_by_frame_size() {
        let data = tensor_data(&[([0.1, 0.5, 0.1, 0.2], vec![0.2, 0.8])]);
        let tensor = OutputTensor::new(&data, 1, 2).unwrap();
        let labels = LabelTable::new(["Person", "Door"]);
        let filter = CandidateFilter::new(ClassThresholds::default(), 640, CoordinateSpace::Normalized);
        let dets = filter.filter(tensor, &labels, 300, 100).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 1);
        assert_eq!(dets[0].class_name.as_ref(), "Door");
        assert_eq!(dets[0].zone, Zone::Left);
        assert!((dets[0].bbox.x1 - 15.0).abs() < 1e-3);
        assert!((dets[0].bbox.y2 - 60.0).abs() < 1e-3);
    }

    #[test]
    fn boxes_clamped_to_zero_width_are_dropped() {
        // Entirely left of the frame.
        let data = tensor_data(&[([-100.0, 50.0, 20.0, 20.0], vec![0.9])]);
        let tensor = OutputTensor::new(&data, 1, 1).unwrap();
        let labels = LabelTable::new(["Person"]);
        let filter = CandidateFilter::new(ClassThresholds::default(), 100, CoordinateSpace::InputPixels);
        assert!(filter.filter(tensor, &labels, 100, 100).unwrap().is_empty());
    }

    #[test]
    fn zone_uses_center_before_clamping() {
        // Spans -110..290 on a 300-wide frame: clamped center 145 would be
        // Front, the model's center 90 is Left.
        let data = tensor_data(&[([90.0, 50.0, 400.0, 40.0], vec![0.9])]);
        let tensor = OutputTensor::new(&data, 1, 1).unwrap();
        let labels = LabelTable::new(["Person"]);
        let filter = CandidateFilter::new(ClassThresholds::default(), 300, CoordinateSpace::InputPixels);
        let dets = filter.filter(tensor, &labels, 300, 100).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].bbox.x1, 0.0);
        assert!((dets[0].bbox.center_x() - 145.0).abs() < 1e-3);
        assert_eq!(dets[0].zone, Zone::Left);
    }

    #[test]
    fn classes_without_labels_are_ignored() {
        // Class 1 wins on score but has no label; class 0 is the best labelled class.
        let data = tensor_data(&[([50.0, 50.0, 20.0, 20.0], vec![0.4, 0.9])]);
        let tensor = OutputTensor::new(&data, 1, 2).unwrap();
        let labels = LabelTable::new(["Person"]);
        let filter = CandidateFilter::new(ClassThresholds::default(), 100, CoordinateSpace::InputPixels);
        let dets = filter.filter(tensor, &labels, 100, 100).unwrap();
        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class_id, 0);
        assert_eq!(dets[0].confidence, 0.4);
    }
}
