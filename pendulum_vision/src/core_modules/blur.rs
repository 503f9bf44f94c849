// THEORY:
// Sensor noise turns a smooth marker edge into a ragged one and sprinkles isolated
// pixels across the threshold. A small Gaussian blur before the range test removes
// both, so it runs on every cycle, not only while calibrating.
//
// The rig is tuned for a fixed tap count (9), not a sigma, so the kernel is built from
// the size: a non-positive sigma is derived with the usual 0.3·((k−1)/2 − 1) + 0.8
// rule. The convolution itself is `imageproc`'s separable filter, which runs one
// horizontal and one vertical pass and replicates the edge pixels at the border.

use crate::core_modules::frame::ColorFrame;
use imageproc::filter::separable_filter_equal;

/// A normalized 1D Gaussian kernel applied along both image axes.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    weights: Vec<f32>,
}

impl GaussianKernel {
    /// Builds a kernel of `size` taps. `size` is rounded up to the next odd number;
    /// `sigma <= 0` derives sigma from the size.
    pub fn new(size: usize, sigma: f64) -> Self {
        let size = size.max(1) | 1;
        let sigma = if sigma > 0.0 {
            sigma
        } else {
            0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
        };
        let half = (size / 2) as f64;
        let raw: Vec<f64> = (0..size)
            .map(|i| {
                let x = i as f64 - half;
                (-(x * x) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        let total: f64 = raw.iter().sum();
        Self {
            weights: raw.iter().map(|w| (w / total) as f32).collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Returns a blurred copy of `frame`.
    pub fn apply(&self, frame: &ColorFrame) -> ColorFrame {
        if frame.width() == 0 || frame.height() == 0 || self.weights.len() == 1 {
            return frame.clone();
        }
        separable_filter_equal(frame, self.weights.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn within_one(a: [u8; 3], b: [u8; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 1)
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = GaussianKernel::new(9, 0.0);
        assert_eq!(kernel.size(), 9);
        let sum: f32 = kernel.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..4 {
            assert!((kernel.weights()[i] - kernel.weights()[8 - i]).abs() < 1e-7);
        }
        assert!(kernel.weights()[4] > kernel.weights()[3]);
    }

    #[test]
    fn even_sizes_round_up_to_odd() {
        assert_eq!(GaussianKernel::new(4, 0.0).size(), 5);
        assert_eq!(GaussianKernel::new(0, 0.0).size(), 1);
    }

    #[test]
    fn single_tap_kernel_is_the_identity() {
        let mut frame = ColorFrame::new(5, 5);
        frame.put_pixel(2, 2, Rgb([255, 0, 0]));
        assert_eq!(GaussianKernel::new(1, 0.0).apply(&frame), frame);
    }

    #[test]
    fn uniform_frames_are_unchanged() {
        let frame = ColorFrame::from_pixel(20, 15, Rgb([40, 128, 250]));
        let blurred = GaussianKernel::new(9, 0.0).apply(&frame);
        assert_eq!(blurred.dimensions(), frame.dimensions());
        assert!(blurred.pixels().all(|p| within_one(p.0, [40, 128, 250])));
    }

    #[test]
    fn edges_replicate_instead_of_darkening() {
        // A bright frame stays bright at its corners: no black border leaks in.
        let frame = ColorFrame::from_pixel(12, 12, Rgb([200, 200, 200]));
        let blurred = GaussianKernel::new(9, 0.0).apply(&frame);
        assert!(within_one(blurred.get_pixel(0, 0).0, [200; 3]));
        assert!(within_one(blurred.get_pixel(11, 11).0, [200; 3]));
    }

    #[test]
    fn isolated_noise_is_suppressed() {
        let mut frame = ColorFrame::new(21, 21);
        frame.put_pixel(10, 10, Rgb([255, 255, 255]));
        let blurred = GaussianKernel::new(9, 0.0).apply(&frame);
        assert!(blurred.get_pixel(10, 10).0[0] < 128);
        assert!(blurred.get_pixel(11, 10).0[0] > 0);
    }
}
