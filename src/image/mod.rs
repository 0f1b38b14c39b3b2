//! Camera frame views.
//!
//! `FrameView` is a borrowed interleaved RGB frame over a 1D byte buffer with
//! an explicit stride. The stride counts bytes between the starts of
//! consecutive rows, so a stride larger than `3 * width` represents padded
//! rows (common for camera buffers). `OwnedFrame` is the heap-backed variant
//! handed to the detection worker.

use crate::util::{SmartSightError, SmartSightResult};

#[cfg(feature = "image-io")]
pub mod io;

/// Bytes per RGB pixel.
pub const CHANNELS: usize = 3;

/// Borrowed RGB frame with an explicit row stride in bytes.
#[derive(Copy, Clone, Debug)]
pub struct FrameView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a> FrameView<'a> {
    /// Creates a tightly packed view with `stride == 3 * width`.
    pub fn from_slice(data: &'a [u8], width: usize, height: usize) -> SmartSightResult<Self> {
        let stride = width
            .checked_mul(CHANNELS)
            .ok_or(SmartSightError::InvalidDimensions { width, height })?;
        Self::new(data, width, height, stride)
    }

    /// Creates a view with an explicit stride in bytes.
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize) -> SmartSightResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(SmartSightError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the frame width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the frame height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in bytes between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Returns the `[r, g, b]` triple at `(x, y)` if it is within bounds.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        let row = self.row(y)?;
        let start = x.checked_mul(CHANNELS)?;
        let px = row.get(start..start + CHANNELS)?;
        Some([px[0], px[1], px[2]])
    }

    /// Returns the packed RGB bytes of row `y` (length `3 * width`).
    pub fn row(&self, y: usize) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width * CHANNELS)?;
        self.data.get(start..end)
    }

    /// Copies the frame into a tightly packed owned buffer.
    pub fn to_owned_frame(&self) -> OwnedFrame {
        let mut data = Vec::with_capacity(self.width * self.height * CHANNELS);
        for y in 0..self.height {
            if let Some(row) = self.row(y) {
                data.extend_from_slice(row);
            }
        }
        OwnedFrame {
            data,
            width: self.width,
            height: self.height,
        }
    }
}

/// Owned, tightly packed RGB frame.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedFrame {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedFrame {
    /// Wraps a packed RGB buffer, validating its length.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> SmartSightResult<Self> {
        FrameView::from_slice(&data, width, height)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Creates a frame filled with a single color.
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> SmartSightResult<Self> {
        let len = required_len(width, height, width.saturating_mul(CHANNELS))?;
        let data = rgb.iter().copied().cycle().take(len).collect();
        Self::new(data, width, height)
    }

    /// Returns the frame width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the frame height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the packed RGB bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Borrows the frame as a view.
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width * CHANNELS,
        }
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> SmartSightResult<usize> {
    if width == 0 || height == 0 {
        return Err(SmartSightError::InvalidDimensions { width, height });
    }
    let row_bytes = width
        .checked_mul(CHANNELS)
        .ok_or(SmartSightError::InvalidDimensions { width, height })?;
    if stride < row_bytes {
        return Err(SmartSightError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(row_bytes))
        .ok_or(SmartSightError::InvalidDimensions { width, height })
}
