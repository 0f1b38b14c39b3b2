//! Boxes, overlap and horizontal zones.

use std::fmt;

/// Axis-aligned box in image-pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    /// Creates a box from its corners.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Creates a box from a center point and size.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    /// Clamps every coordinate into `[0, width] x [0, height]`.
    pub fn clamped(self, width: f32, height: f32) -> Self {
        Self {
            x1: self.x1.clamp(0.0, width),
            y1: self.y1.clamp(0.0, height),
            x2: self.x2.clamp(0.0, width),
            y2: self.y2.clamp(0.0, height),
        }
    }

    /// Horizontal extent; negative for an inverted box.
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    /// Vertical extent; negative for an inverted box.
    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// `width * height`, without clamping negative extents.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Horizontal center.
    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }

    /// `true` when width and height are both strictly positive (NaN fails).
    pub fn has_area(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }
}

/// Intersection-over-union of two boxes.
///
/// The intersection is clamped to zero on each axis. A non-positive union
/// yields 0 rather than dividing by zero.
pub fn iou(a: &BBox, b: &BBox) -> f32 {
    let ix = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let iy = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = ix * iy;
    let union = a.area() + b.area() - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Coarse horizontal region of the frame used for spoken guidance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Zone {
    Left,
    Front,
    Right,
}

impl Zone {
    /// All zones, left to right.
    pub const ALL: [Zone; 3] = [Zone::Left, Zone::Front, Zone::Right];

    /// Classifies a horizontal center against thirds of `image_width`.
    ///
    /// Centers at or left of `width / 3` are `Left`, centers strictly right of
    /// `2 * width / 3` are `Right`, everything else is `Front`.
    pub fn classify(center_x: f32, image_width: f32) -> Zone {
        let left_boundary = image_width / 3.0;
        let right_boundary = image_width * 2.0 / 3.0;
        if center_x <= left_boundary {
            Zone::Left
        } else if center_x > right_boundary {
            Zone::Right
        } else {
            Zone::Front
        }
    }

    /// Location phrase used in announcements.
    pub fn phrase(self) -> &'static str {
        match self {
            Zone::Left => "left side",
            Zone::Front => "front",
            Zone::Right => "right side",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.phrase())
    }
}
