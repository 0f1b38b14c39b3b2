//! Class-agnostic non-maximum suppression over detections.

use crate::detection::Detection;
use crate::geometry::iou;

/// IoU above which two boxes are treated as the same object.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

/// Greedy IoU suppressor.
///
/// Suppression ignores the predicted class: two overlapping boxes suppress
/// each other even when their labels differ.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Suppressor {
    iou_threshold: f32,
}

impl Default for Suppressor {
    fn default() -> Self {
        Self::new(DEFAULT_IOU_THRESHOLD)
    }
}

impl Suppressor {
    /// Creates a suppressor that drops boxes overlapping a kept one by more
    /// than `iou_threshold`.
    pub fn new(iou_threshold: f32) -> Self {
        Self { iou_threshold }
    }

    /// IoU above which a lower-confidence box is suppressed.
    pub fn iou_threshold(&self) -> f32 {
        self.iou_threshold
    }

    /// Keeps the highest-confidence box of every overlapping cluster.
    ///
    /// Candidates are stably sorted by descending confidence; a candidate is
    /// kept unless its IoU with an already kept box exceeds the threshold.
    /// The result is in descending-confidence order.
    pub fn suppress(&self, mut candidates: Vec<Detection>) -> Vec<Detection> {
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());

        'outer: for candidate in candidates {
            for accepted in kept.iter() {
                if iou(&accepted.bbox, &candidate.bbox) > self.iou_threshold {
                    continue 'outer;
                }
            }
            kept.push(candidate);
        }

        kept
    }
}
