// THEORY:
// The `Segmenter` is the first stage of every cycle. It turns a color frame into a
// binary mask of "marker-colored" pixels.
//
// Key architectural principles:
// 1.  **Blur First**: The frame is always smoothed before thresholding. The blurred
//     copy is handed back too, since it is the frame the overlays are drawn on.
// 2.  **Inclusive Box Test**: A pixel is "in" when every channel lies within
//     `[lower, upper]`. Nothing else (no color-space conversion, no morphology).
// 3.  **Total Function**: A range whose lower bound exceeds its upper bound on any
//     channel cannot contain anything, so it yields an all-"out" mask. There are no
//     error conditions.

use crate::core_modules::blur::GaussianKernel;
use crate::core_modules::frame::{ColorFrame, MASK_IN, MASK_OUT, Mask};
use image::ImageBuffer;
use serde::{Deserialize, Serialize};

/// Inclusive per-channel bounds, in the frame's channel order (RGB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl Default for ColorRange {
    /// The marker color the rig was tuned for: red 0–255, green 64–241, blue 0–38.
    fn default() -> Self {
        Self {
            lower: [0, 64, 0],
            upper: [255, 241, 38],
        }
    }
}

impl ColorRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// The full range; every pixel passes.
    pub const fn everything() -> Self {
        Self::new([0; 3], [255; 3])
    }

    #[inline]
    pub fn contains(&self, pixel: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= pixel[c] && pixel[c] <= self.upper[c])
    }

    /// True when some channel's lower bound exceeds its upper bound.
    pub fn is_inverted(&self) -> bool {
        (0..3).any(|c| self.lower[c] > self.upper[c])
    }
}

/// Output of one segmentation pass.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// The smoothed frame the mask was computed from.
    pub blurred: ColorFrame,
    /// `MASK_IN` where the blurred pixel is inside the range, `MASK_OUT` elsewhere.
    pub mask: Mask,
}

/// Blur + inclusive range threshold.
#[derive(Debug, Clone)]
pub struct Segmenter {
    kernel: GaussianKernel,
}

impl Segmenter {
    pub fn new(blur_kernel_size: usize) -> Self {
        Self {
            kernel: GaussianKernel::new(blur_kernel_size, 0.0),
        }
    }

    pub fn kernel(&self) -> &GaussianKernel {
        &self.kernel
    }

    pub fn segment(&self, frame: &ColorFrame, range: &ColorRange) -> Segmentation {
        let blurred = self.kernel.apply(frame);
        let mask = in_range(&blurred, range);
        Segmentation { blurred, mask }
    }
}

/// Thresholds `frame` against `range` without blurring.
pub fn in_range(frame: &ColorFrame, range: &ColorRange) -> Mask {
    if range.is_inverted() {
        return Mask::new(frame.width(), frame.height());
    }
    ImageBuffer::from_fn(frame.width(), frame.height(), |x, y| {
        let value = if range.contains(frame.get_pixel(x, y).0) {
            MASK_IN
        } else {
            MASK_OUT
        };
        image::Luma([value])
    })
}
