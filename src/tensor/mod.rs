//! Decoding of the raw detector output tensor.
//!
//! The detector emits `4 + C` channels (center x, center y, width, height,
//! then one score per class) for each of `N` candidate slots. The buffer is
//! channel-major: channel `k` of slot `i` lives at flat offset `k * N + i`.
//! `OutputTensor` is a zero-copy view over that buffer with bounds-checked
//! random access by slot, so the candidate filter can walk slots without
//! materializing one object per slot.

use crate::util::{SmartSightError, SmartSightResult};

/// Number of geometry channels preceding the class scores.
pub const GEOMETRY_CHANNELS: usize = 4;

/// Output buffer and its declared shape, as returned by an inference engine.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawOutput {
    /// Channel-major values, `(4 + num_classes) * num_slots` long.
    pub data: Vec<f32>,
    /// Number of candidate slots `N`.
    pub num_slots: usize,
    /// Number of class score channels `C`.
    pub num_classes: usize,
}

impl RawOutput {
    /// Borrows the buffer as a decoder view.
    pub fn tensor(&self) -> SmartSightResult<OutputTensor<'_>> {
        OutputTensor::new(&self.data, self.num_slots, self.num_classes)
    }
}

/// Box center and size in model input space, as emitted by the detector.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawGeometry {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

/// Borrowed channel-major view of a detector output buffer.
#[derive(Clone, Copy, Debug)]
pub struct OutputTensor<'a> {
    data: &'a [f32],
    num_slots: usize,
    num_classes: usize,
}

impl<'a> OutputTensor<'a> {
    /// Wraps `data` declared as `num_slots` slots with `num_classes` scores.
    ///
    /// The buffer must hold exactly `(4 + num_classes) * num_slots` values.
    /// A buffer shorter than declared would be read past its end and fails
    /// with [`SmartSightError::OutOfRange`] at the first missing offset; a
    /// longer one is a [`SmartSightError::ShapeMismatch`].
    pub fn new(data: &'a [f32], num_slots: usize, num_classes: usize) -> SmartSightResult<Self> {
        let expected = (GEOMETRY_CHANNELS + num_classes)
            .checked_mul(num_slots)
            .ok_or(SmartSightError::OutOfRange {
                index: usize::MAX,
                len: data.len(),
                context: "buffer",
            })?;
        if data.len() < expected {
            return Err(SmartSightError::OutOfRange {
                index: data.len(),
                len: data.len(),
                context: "buffer",
            });
        }
        if data.len() > expected {
            return Err(SmartSightError::ShapeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            num_slots,
            num_classes,
        })
    }

    /// Number of candidate slots `N`.
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    /// Number of class scores `C`.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Total channels, `4 + C`.
    pub fn num_channels(&self) -> usize {
        GEOMETRY_CHANNELS + self.num_classes
    }

    /// Reads channel `channel` of slot `slot`.
    pub fn value(&self, channel: usize, slot: usize) -> SmartSightResult<f32> {
        let row = self.channel(channel)?;
        row.get(slot).copied().ok_or(SmartSightError::OutOfRange {
            index: slot,
            len: self.num_slots,
            context: "slot",
        })
    }

    /// Returns all `N` values of one channel as a contiguous slice.
    pub fn channel(&self, channel: usize) -> SmartSightResult<&'a [f32]> {
        if channel >= self.num_channels() {
            return Err(SmartSightError::OutOfRange {
                index: channel,
                len: self.num_channels(),
                context: "channel",
            });
        }
        let start = channel * self.num_slots;
        Ok(&self.data[start..start + self.num_slots])
    }

    /// Returns the contiguous scores of class `class_id` across all slots.
    pub fn class_channel(&self, class_id: usize) -> SmartSightResult<&'a [f32]> {
        if class_id >= self.num_classes {
            return Err(SmartSightError::OutOfRange {
                index: class_id,
                len: self.num_classes,
                context: "class",
            });
        }
        self.channel(GEOMETRY_CHANNELS + class_id)
    }

    /// Returns a view of candidate slot `slot`.
    pub fn slot(&self, slot: usize) -> SmartSightResult<Slot<'a>> {
        if slot >= self.num_slots {
            return Err(SmartSightError::OutOfRange {
                index: slot,
                len: self.num_slots,
                context: "slot",
            });
        }
        Ok(Slot {
            tensor: *self,
            index: slot,
        })
    }
}

/// One candidate slot of an [`OutputTensor`].
#[derive(Clone, Copy, Debug)]
pub struct Slot<'a> {
    tensor: OutputTensor<'a>,
    index: usize,
}

impl<'a> Slot<'a> {
    /// Slot index within the tensor.
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    fn at(&self, channel: usize) -> f32 {
        // `index < num_slots` and `channel < num_channels` hold by construction.
        self.tensor.data[channel * self.tensor.num_slots + self.index]
    }

    /// Center and size of the candidate box.
    pub fn geometry(&self) -> RawGeometry {
        RawGeometry {
            cx: self.at(0),
            cy: self.at(1),
            w: self.at(2),
            h: self.at(3),
        }
    }

    /// Score of class `class_id`.
    pub fn class_score(&self, class_id: usize) -> SmartSightResult<f32> {
        if class_id >= self.tensor.num_classes {
            return Err(SmartSightError::OutOfRange {
                index: class_id,
                len: self.tensor.num_classes,
                context: "class",
            });
        }
        Ok(self.at(GEOMETRY_CHANNELS + class_id))
    }

    /// Lazily iterates the `C` class scores in class-index order.
    pub fn scores(&self) -> impl Iterator<Item = f32> + 'a {
        let slot = *self;
        (0..slot.tensor.num_classes).map(move |k| slot.at(GEOMETRY_CHANNELS + k))
    }

    /// Best class among the first `limit` classes.
    ///
    /// Returns `(class_id, score)`; ties keep the lowest class index. `None`
    /// when there are no classes to consider.
    pub fn best_class(&self, limit: usize) -> Option<(usize, f32)> {
        argmax(self.scores().take(limit))
    }
}

/// Index and value of the first maximum. A NaN leader is replaced by any
/// later score; NaN never replaces a number.
pub(crate) fn argmax<I: IntoIterator<Item = f32>>(scores: I) -> Option<(usize, f32)> {
    let mut iter = scores.into_iter();
    let mut best = (0usize, iter.next()?);
    for (idx, score) in iter.enumerate() {
        if score > best.1 || (best.1.is_nan() && !score.is_nan()) {
            best = (idx + 1, score);
        }
    }
    Some(best)
}
