// THEORY:
// The `contour` module finds the external regions of a binary mask: every maximal
// 8-connected patch of "in" pixels together with whatever it encloses. Holes and
// anything nested inside a hole belong to the surrounding region and are never
// reported on their own; only outer boundaries matter.
//
// Algorithm:
// 1.  **Outside Flood**: Starting from every "out" pixel on the image border, flood the
//     background with 4-connectivity. Whatever the flood cannot reach is enclosed by
//     some outer boundary. (4-connected background is the dual of 8-connected
//     foreground, so diagonal foreground touches correctly seal a region.)
// 2.  **Region Labelling**: Scan the enclosed pixels in raster order and grow each
//     unvisited one into an 8-connected region with a breadth-first search.
// 3.  **Boundary & Area**: A region's area (its zeroth moment) is its pixel count,
//     holes included. Its boundary is the set of region pixels that touch the
//     outside, or the image edge, through a 4-neighbor.
//
// Regions are returned in discovery order. That order is an artifact of the scan and
// carries no meaning for callers.

use crate::core_modules::frame::{MASK_OUT, Mask};
use std::collections::VecDeque;

/// One external region of a mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Pixel coordinates of the outer boundary.
    pub boundary: Vec<(i32, i32)>,
    /// Zeroth moment: the number of pixels enclosed by the outer boundary.
    pub area: f64,
}

const NEIGHBORS_4: [(i64, i64); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const NEIGHBORS_8: [(i64, i64); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Finds every external region of `mask`. Any non-zero mask value counts as "in".
pub fn find_external_regions(mask: &Mask) -> Vec<Region> {
    let (width, height) = (mask.width() as usize, mask.height() as usize);
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let data = mask.as_raw();
    let is_in = |i: usize| data[i] != MASK_OUT;
    let neighbor = |i: usize, (dx, dy): (i64, i64)| -> Option<usize> {
        let x = (i % width) as i64 + dx;
        let y = (i / width) as i64 + dy;
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            None
        } else {
            Some(y as usize * width + x as usize)
        }
    };

    // --- 1. Outside Flood ---
    let mut outside = vec![false; width * height];
    let mut queue = VecDeque::new();
    let border = (0..width)
        .flat_map(|x| [x, (height - 1) * width + x])
        .chain((0..height).flat_map(|y| [y * width, y * width + width - 1]));
    for i in border {
        if !is_in(i) && !outside[i] {
            outside[i] = true;
            queue.push_back(i);
        }
    }
    while let Some(i) = queue.pop_front() {
        for step in NEIGHBORS_4 {
            if let Some(n) = neighbor(i, step) {
                if !outside[n] && !is_in(n) {
                    outside[n] = true;
                    queue.push_back(n);
                }
            }
        }
    }

    // --- 2. Region Labelling & 3. Boundary / Area ---
    let mut visited = outside.clone();
    let mut regions = Vec::new();
    for start in 0..width * height {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);

        let mut area = 0usize;
        let mut boundary = Vec::new();
        while let Some(i) = queue.pop_front() {
            area += 1;
            let on_edge = NEIGHBORS_4
                .iter()
                .any(|&step| neighbor(i, step).is_none_or(|n| outside[n]));
            if on_edge {
                boundary.push(((i % width) as i32, (i / width) as i32));
            }
            for step in NEIGHBORS_8 {
                if let Some(n) = neighbor(i, step) {
                    if !visited[n] {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        regions.push(Region {
            boundary,
            area: area as f64,
        });
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::MASK_IN;
    use image::Luma;

    fn mask_from(rows: &[&str]) -> Mask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        Mask::from_fn(width, height, |x, y| {
            let c = rows[y as usize].as_bytes()[x as usize];
            Luma([if c == b'#' { MASK_IN } else { MASK_OUT }])
        })
    }

    #[test]
    fn empty_mask_has_no_regions() {
        assert!(find_external_regions(&Mask::new(10, 10)).is_empty());
        assert!(find_external_regions(&Mask::new(0, 0)).is_empty());
    }

    #[test]
    fn separate_patches_are_separate_regions() {
        let mask = mask_from(&[
            "##....",
            "##....",
            "......",
            "...###",
        ]);
        let regions = find_external_regions(&mask);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].area, 4.0);
        assert_eq!(regions[1].area, 3.0);
    }

    #[test]
    fn diagonal_touch_joins_regions() {
        let mask = mask_from(&[
            "#...",
            ".#..",
            "..#.",
            "....",
        ]);
        let regions = find_external_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 3.0);
    }

    #[test]
    fn holes_and_nested_patches_belong_to_the_outer_region() {
        let mask = mask_from(&[
            ".......",
            ".#####.",
            ".#...#.",
            ".#.#.#.",
            ".#...#.",
            ".#####.",
            ".......",
        ]);
        let regions = find_external_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 25.0);
        // Only the outer ring touches the outside.
        assert_eq!(regions[0].boundary.len(), 16);
        assert!(!regions[0].boundary.contains(&(3, 3)));
    }

    #[test]
    fn regions_touching_the_image_edge_keep_their_edge_pixels_on_the_boundary() {
        let mask = mask_from(&[
            "###",
            "###",
            "###",
        ]);
        let regions = find_external_regions(&mask);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 9.0);
        assert_eq!(regions[0].boundary.len(), 8);
    }
}
