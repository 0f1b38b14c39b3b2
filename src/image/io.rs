//! Helpers for loading frames and building model input via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{FrameView, OwnedFrame};
use crate::util::{SmartSightError, SmartSightResult};
use image::imageops::FilterType;
use image::RgbImage;
use std::path::Path;

fn image_error(err: image::ImageError) -> SmartSightError {
    SmartSightError::ImageIo {
        reason: err.to_string(),
    }
}

/// Reads the `(width, height)` of an image file from its header.
pub fn frame_dimensions<P: AsRef<Path>>(path: P) -> SmartSightResult<(usize, usize)> {
    let (width, height) = image::image_dimensions(path).map_err(image_error)?;
    Ok((width as usize, height as usize))
}

/// Loads an image from disk and converts it to an owned RGB frame.
pub fn load_rgb_frame<P: AsRef<Path>>(path: P) -> SmartSightResult<OwnedFrame> {
    let img = image::open(path).map_err(image_error)?;
    let rgb = img.to_rgb8();
    OwnedFrame::new(rgb.as_raw().clone(), rgb.width() as usize, rgb.height() as usize)
}

/// Builds the square model input for `frame`.
///
/// The frame is resized (bilinear, aspect ratio not preserved) to
/// `input_size x input_size` and laid out row-major as `[H, W, 3]` floats in
/// `[0, 1]`.
pub fn input_tensor(frame: FrameView<'_>, input_size: usize) -> SmartSightResult<Vec<f32>> {
    if input_size == 0 {
        return Err(SmartSightError::InvalidConfig("input_size must be positive"));
    }
    let packed = frame.to_owned_frame();
    let width = u32::try_from(packed.width()).map_err(|_| SmartSightError::InvalidDimensions {
        width: packed.width(),
        height: packed.height(),
    })?;
    let height = u32::try_from(packed.height()).map_err(|_| SmartSightError::InvalidDimensions {
        width: packed.width(),
        height: packed.height(),
    })?;
    let side = u32::try_from(input_size)
        .map_err(|_| SmartSightError::InvalidConfig("input_size does not fit in u32"))?;

    let rgb = RgbImage::from_raw(width, height, packed.data().to_vec()).ok_or(
        SmartSightError::BufferTooSmall {
            needed: packed.width() * packed.height() * 3,
            got: packed.data().len(),
        },
    )?;
    let resized = image::imageops::resize(&rgb, side, side, FilterType::Triangle);

    Ok(resized
        .as_raw()
        .iter()
        .map(|&v| f32::from(v) / 255.0)
        .collect())
}
