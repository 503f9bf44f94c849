// Depth is acquired alongside color but never feeds a tracking decision. Calibration
// shows it as an 8-bit band-pass image so the operator can see what range the markers
// sit in.

use crate::core_modules::frame::{DepthFrame, MASK_IN, MASK_OUT, Mask};
use image::{ImageBuffer, Luma};

/// Largest raw reading of the 11-bit depth sensor, plus one.
pub const DEPTH_RAW_SPAN: f64 = 2048.0;

/// Scales raw depth to 0–255 (255/2048 per step, saturating).
pub fn depth_to_gray(depth: &DepthFrame) -> Mask {
    ImageBuffer::from_fn(depth.width(), depth.height(), |x, y| {
        let raw = depth.get_pixel(x, y).0[0] as f64;
        Luma([(raw * 255.0 / DEPTH_RAW_SPAN).round().min(255.0) as u8])
    })
}

/// Scaled depth kept only where it lies within `[low, high]`.
pub fn depth_preview(depth: &DepthFrame, low: u8, high: u8) -> Mask {
    let mut gray = depth_to_gray(depth);
    for pixel in gray.pixels_mut() {
        let v = pixel.0[0];
        pixel.0[0] = if low <= v && v <= high { MASK_IN } else { MASK_OUT };
    }
    gray
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_depth_scales_into_a_byte() {
        let mut depth = DepthFrame::new(3, 1);
        depth.put_pixel(0, 0, Luma([0]));
        depth.put_pixel(1, 0, Luma([1024]));
        depth.put_pixel(2, 0, Luma([4000]));
        let gray = depth_to_gray(&depth);
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        assert_eq!(gray.get_pixel(1, 0).0[0], 128);
        assert_eq!(gray.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn preview_keeps_only_the_band() {
        let mut depth = DepthFrame::new(3, 1);
        depth.put_pixel(0, 0, Luma([100]));
        depth.put_pixel(1, 0, Luma([800]));
        depth.put_pixel(2, 0, Luma([2000]));
        let preview = depth_preview(&depth, 50, 150);
        assert_eq!(preview.get_pixel(0, 0).0[0], MASK_OUT);
        assert_eq!(preview.get_pixel(1, 0).0[0], MASK_IN);
        assert_eq!(preview.get_pixel(2, 0).0[0], MASK_OUT);
    }
}
