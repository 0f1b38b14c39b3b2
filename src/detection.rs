//! The per-frame detection value.

use crate::geometry::{BBox, Zone};
use crate::tensor::RawGeometry;
use std::sync::Arc;

/// One detected object, created fresh for every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Box in pixels of the original frame, clamped to its bounds.
    pub bbox: BBox,
    /// Center and size exactly as emitted by the model.
    pub raw: RawGeometry,
    /// Score of the winning class.
    pub confidence: f32,
    /// Index into the label table.
    pub class_id: usize,
    /// Label of `class_id`, shared with the label table.
    pub class_name: Arc<str>,
    /// Horizontal zone of the box center.
    pub zone: Zone,
}

impl Detection {
    /// Key used to decide whether an object/zone pair is new between frames.
    pub fn announcement_key(&self) -> (Arc<str>, Zone) {
        (Arc::clone(&self.class_name), self.zone)
    }
}
