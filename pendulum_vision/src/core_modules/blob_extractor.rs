// THEORY:
// The `BlobExtractor` is the spatial grouping stage. It takes the binary mask from the
// `Segmenter` and reduces it to a short list of `Blob`s, each one a candidate marker.
//
// Key architectural principles:
// 1.  **External Regions Only**: Regions come from `contour::find_external_regions`, so
//     a marker with a specular hole or a speck inside it is still one blob.
// 2.  **Size Filtering**: A region's zeroth moment must be strictly greater than the
//     configured minimum area. Small noise regions never reach role disambiguation.
// 3.  **Circle Summary**: Each surviving region is summarized by the minimal enclosing
//     circle of its boundary. The circle's center is the blob's position and its radius
//     the blob's size on screen.
// 4.  **Stateless Utility**: Like the rest of the per-cycle pipeline it has no memory of
//     earlier frames. Blob order is discovery order and means nothing.

use crate::core_modules::geometry::Point2;

/// A filtered region reduced to position, size and area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    /// Center of the minimal enclosing circle.
    pub center: Point2,
    /// Radius of the minimal enclosing circle, in pixels.
    pub radius: f64,
    /// Zeroth moment of the region, in pixels.
    pub area: f64,
}

pub mod blob_extractor {
    use super::*;
    use crate::core_modules::contour::find_external_regions;
    use crate::core_modules::frame::Mask;
    use crate::core_modules::geometry::min_enclosing_circle;
    use tracing::trace;

    /// Finds every external region of `mask` whose area exceeds `min_area`.
    pub fn extract_blobs(mask: &Mask, min_area: f64) -> Vec<Blob> {
        find_external_regions(mask)
            .into_iter()
            .filter(|region| region.area > min_area)
            .filter_map(|region| {
                let circle = min_enclosing_circle(&region.boundary)?;
                trace!(
                    area = region.area,
                    x = circle.center.x,
                    y = circle.center.y,
                    radius = circle.radius,
                    "blob"
                );
                Some(Blob {
                    center: circle.center,
                    radius: circle.radius,
                    area: region.area,
                })
            })
            .collect()
    }
}
