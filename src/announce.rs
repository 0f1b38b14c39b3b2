//! Spoken announcements of newly appeared objects.
//!
//! The detection core is stateless across frames; the memory of what was
//! announced last lives here, in an explicit state object owned by the
//! caller.

use crate::detection::Detection;
use crate::geometry::Zone;
use std::collections::HashSet;
use std::sync::Arc;

/// Remembers the `(class, zone)` pairs present in the previous frame.
#[derive(Clone, Debug, Default)]
pub struct AnnouncementState {
    last: HashSet<(Arc<str>, Zone)>,
}

impl AnnouncementState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns messages for pairs absent from the previous frame.
    ///
    /// Messages follow detection order, one per distinct pair, e.g.
    /// `"Chair detected in left side"`. The current frame's pairs replace
    /// the remembered set, so an object that leaves and comes back is
    /// announced again.
    pub fn announce(&mut self, detections: &[Detection]) -> Vec<String> {
        let mut current = HashSet::with_capacity(detections.len());
        let mut messages = Vec::new();
        for det in detections {
            let key = det.announcement_key();
            if current.insert(key.clone()) && !self.last.contains(&key) {
                messages.push(format!("{} detected in {}", key.0, key.1.phrase()));
            }
        }
        self.last = current;
        messages
    }

    /// Forgets everything, so the next frame is announced in full.
    pub fn reset(&mut self) {
        self.last.clear();
    }

    /// Number of pairs remembered from the last frame.
    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

/// Detections per zone, ordered left, front, right.
pub fn zone_counts(detections: &[Detection]) -> [(Zone, usize); 3] {
    Zone::ALL.map(|zone| (zone, detections.iter().filter(|d| d.zone == zone).count()))
}
