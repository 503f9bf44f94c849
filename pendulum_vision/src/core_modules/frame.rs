// THEORY:
// The `frame` module defines the raw material the whole engine works on. A frame is
// one captured image at the session's fixed resolution, either 3-channel 8-bit color
// or 1-channel 16-bit depth. Frames are plain `image` buffers so every later stage
// (blur, threshold, drawing, PNG snapshots) can use the same storage without copies
// between representations.
//
// The resolution is fixed for a session. Driver buffers are validated against it at
// the callback boundary, so nothing downstream ever sees a frame of the wrong size.

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use serde::{Deserialize, Serialize};

/// A color frame in the channel order the driver delivers (RGB).
pub type ColorFrame = RgbImage;

/// A raw depth frame. Values are the sensor's 11-bit readings stored in 16 bits.
pub type DepthFrame = ImageBuffer<Luma<u16>, Vec<u16>>;

/// A binary image marking pixels that passed a range test.
pub type Mask = GrayImage;

/// Mask value for a pixel inside the range.
pub const MASK_IN: u8 = 255;
/// Mask value for a pixel outside the range.
pub const MASK_OUT: u8 = 0;

/// The fixed frame geometry of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels in one frame.
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Copies an interleaved RGB driver buffer into an owned frame.
    /// Returns `None` when the buffer length does not match this resolution.
    pub fn color_from_raw(&self, rgb: &[u8]) -> Option<ColorFrame> {
        if rgb.len() != self.pixel_count() * 3 {
            return None;
        }
        ImageBuffer::from_raw(self.width, self.height, rgb.to_vec())
    }

    /// Copies a depth driver buffer into an owned frame.
    pub fn depth_from_raw(&self, depth: &[u16]) -> Option<DepthFrame> {
        if depth.len() != self.pixel_count() {
            return None;
        }
        ImageBuffer::from_raw(self.width, self.height, depth.to_vec())
    }

    /// Whether `image` has exactly the session width and height.
    pub fn matches<P: image::Pixel>(&self, image: &ImageBuffer<P, Vec<P::Subpixel>>) -> bool {
        image.width() == self.width && image.height() == self.height
    }
}
