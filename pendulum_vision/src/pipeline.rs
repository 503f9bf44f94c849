// THEORY:
// The `pipeline` module is the per-frame API of the engine. It chains the three
// stateless stages (Segmenter → Blob Extractor → Role Disambiguator) into one call
// and returns everything a caller might want to show or publish.
//
// It holds configuration, never per-frame state: running the same frame twice gives
// the same `FrameAnalysis` twice. The `CycleDriver` owns timing, frame hand-off and
// the collaborators; this module only does the vision.

use crate::config::TrackerConfig;
use crate::core_modules::blob_extractor::blob_extractor;
use crate::core_modules::frame::{ColorFrame, Mask};
use crate::core_modules::geometry::Point2;
use crate::core_modules::role_disambiguator::{TrackedPair, TrackingFailure, disambiguate};
use crate::core_modules::segmenter::{ColorRange, Segmenter};

// Re-export key data structures for the public API.
pub use crate::core_modules::blob_extractor::Blob;
pub use crate::core_modules::role_disambiguator::RelativePosition;

/// What segmentation and blob extraction found in one frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// The smoothed frame; overlays are drawn on a copy of it.
    pub blurred: ColorFrame,
    pub mask: Mask,
    /// Area-filtered blobs in discovery order.
    pub blobs: Vec<Blob>,
}

/// Role assignment for a frame, or why there is none.
pub type TrackingOutcome = Result<TrackedPair, TrackingFailure>;

/// The stateless vision chain, parameterized by a `TrackerConfig`.
#[derive(Debug, Clone)]
pub struct TrackingPipeline {
    segmenter: Segmenter,
    min_blob_area: f64,
    reference_point: Point2,
    role_radius: f64,
}

impl TrackingPipeline {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            segmenter: Segmenter::new(config.blur_kernel_size),
            min_blob_area: config.min_blob_area,
            reference_point: config.reference_point,
            role_radius: config.role_radius,
        }
    }

    pub fn reference_point(&self) -> Point2 {
        self.reference_point
    }

    pub fn role_radius(&self) -> f64 {
        self.role_radius
    }

    /// Segment and extract blobs without labelling them (calibration).
    pub fn detect(&self, frame: &ColorFrame, range: &ColorRange) -> FrameAnalysis {
        // Stage 1: Segmentation
        let segmentation = self.segmenter.segment(frame, range);
        // Stage 2: Blob extraction
        let blobs = blob_extractor::extract_blobs(&segmentation.mask, self.min_blob_area);
        FrameAnalysis {
            blurred: segmentation.blurred,
            mask: segmentation.mask,
            blobs,
        }
    }

    /// Full chain, including role disambiguation.
    pub fn track(&self, frame: &ColorFrame, range: &ColorRange) -> (FrameAnalysis, TrackingOutcome) {
        let analysis = self.detect(frame, range);
        // Stage 3: Role disambiguation
        let outcome = disambiguate(&analysis.blobs, self.reference_point, self.role_radius);
        (analysis, outcome)
    }
}
