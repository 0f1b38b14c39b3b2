//! SmartSight turns raw object-detector output into spoken-guidance-ready
//! detections.
//!
//! The crate decodes a channel-major YOLO-style output tensor, picks the best
//! class per candidate slot, applies class-dependent confidence thresholds,
//! maps boxes to the original frame, tags each with a left/front/right zone
//! and removes duplicates with class-agnostic NMS. A single-flight worker
//! keeps detection off the capture thread and drops frames that arrive while
//! a detection is running. Optional features add rayon-parallel and SIMD
//! slot scoring, `image`-based frame loading, and tracing output.

pub mod announce;
pub mod detection;
pub mod filter;
pub mod geometry;
pub mod image;
pub mod labels;
pub mod nms;
pub mod pipeline;
pub mod tensor;
mod trace;
pub mod util;

#[cfg(feature = "image-io")]
pub use crate::image::io;

pub use announce::{zone_counts, AnnouncementState};
pub use detection::Detection;
pub use filter::{CandidateFilter, ClassThreshold, ClassThresholds, CoordinateSpace};
pub use geometry::{iou, BBox, Zone};
pub use crate::image::{FrameView, OwnedFrame};
pub use labels::LabelTable;
pub use nms::{Suppressor, DEFAULT_IOU_THRESHOLD};
pub use pipeline::worker::{DetectionWorker, FrameJob, FrameReport, Submission, WorkerStats};
pub use pipeline::{DetectionPipeline, DetectorConfig, InferenceEngine, DEFAULT_INPUT_SIZE};
pub use tensor::{OutputTensor, RawGeometry, RawOutput, Slot};
pub use util::{SmartSightError, SmartSightResult};
