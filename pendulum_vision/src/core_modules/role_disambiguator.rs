// THEORY:
// Two markers look alike, so the only thing that tells the end effector from the
// pendulum is where they are. The end effector rests near a known image-plane point;
// the pendulum swings around it. Each cycle the two blobs are labelled from scratch
// by their distance to that reference point, with no identity carried across frames.
//
// Exactly one blob must be inside the role radius. Zero or two inside is reported as
// `AmbiguousRoles` rather than resolved by list order, and any count other than two
// blobs is `WrongBlobCount`. Both are ordinary, frequent outcomes; neither publishes.

use crate::core_modules::blob_extractor::Blob;
use crate::core_modules::geometry::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pendulum position relative to the end effector, with y pointing up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativePosition {
    pub dx: f64,
    pub dy: f64,
}

/// Two blobs with their roles resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPair {
    pub end_effector: Blob,
    pub pendulum: Blob,
}

impl TrackedPair {
    /// `pendulum − end_effector`, with the image's downward y flipped to upward.
    pub fn relative_position(&self) -> RelativePosition {
        RelativePosition {
            dx: self.pendulum.center.x - self.end_effector.center.x,
            dy: -(self.pendulum.center.y - self.end_effector.center.y),
        }
    }
}

/// Why a cycle produced no tracked pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingFailure {
    /// The blob stage did not find exactly two objects.
    WrongBlobCount(usize),
    /// Both blobs (`near == 2`) or neither (`near == 0`) were within the role radius.
    AmbiguousRoles { near: usize },
}

impl fmt::Display for TrackingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongBlobCount(n) => write!(f, "expected exactly two objects, found {n}"),
            Self::AmbiguousRoles { near } => write!(
                f,
                "cannot tell end effector from pendulum: {near} of 2 objects near the reference point"
            ),
        }
    }
}

/// Labels exactly two blobs as end effector and pendulum.
pub fn disambiguate(
    blobs: &[Blob],
    reference: Point2,
    radius_threshold: f64,
) -> Result<TrackedPair, TrackingFailure> {
    let [a, b] = blobs else {
        return Err(TrackingFailure::WrongBlobCount(blobs.len()));
    };
    let a_near = a.center.distance_to(reference) < radius_threshold;
    let b_near = b.center.distance_to(reference) < radius_threshold;
    match (a_near, b_near) {
        (true, false) => Ok(TrackedPair {
            end_effector: *a,
            pendulum: *b,
        }),
        (false, true) => Ok(TrackedPair {
            end_effector: *b,
            pendulum: *a,
        }),
        (near_a, near_b) => Err(TrackingFailure::AmbiguousRoles {
            near: near_a as usize + near_b as usize,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REFERENCE: Point2 = Point2::new(290.0, 180.0);
    const THRESHOLD: f64 = 50.0;

    fn blob(x: f64, y: f64) -> Blob {
        Blob {
            center: Point2::new(x, y),
            radius: 10.0,
            area: 300.0,
        }
    }

    #[test]
    fn near_blob_is_the_end_effector() {
        let near = blob(300.0, 190.0);
        let far = blob(400.0, 300.0);
        let pair = disambiguate(&[far, near], REFERENCE, THRESHOLD).unwrap();
        assert_eq!(pair.end_effector, near);
        assert_eq!(pair.pendulum, far);
        assert_eq!(pair.relative_position(), RelativePosition { dx: 100.0, dy: -110.0 });
    }

    #[test]
    fn list_order_does_not_matter() {
        let near = blob(280.0, 170.0);
        let far = blob(200.0, 100.0);
        assert_eq!(
            disambiguate(&[near, far], REFERENCE, THRESHOLD),
            disambiguate(&[far, near], REFERENCE, THRESHOLD)
        );
    }

    #[test]
    fn swapping_the_close_blob_swaps_labels_and_negates_the_offset() {
        let p = blob(290.0, 180.0);
        let q = blob(250.0, 150.0);
        let base = disambiguate(&[p, q], REFERENCE, THRESHOLD).unwrap();

        // Move the reference so `q` is the close one and `p` is far.
        let moved = Point2::new(220.0, 120.0);
        let swapped = disambiguate(&[p, q], moved, THRESHOLD).unwrap();

        assert_eq!(base.end_effector, p);
        assert_eq!(swapped.end_effector, q);
        let (r1, r2) = (base.relative_position(), swapped.relative_position());
        assert_eq!(r1.dx, -r2.dx);
        assert_eq!(r1.dy, -r2.dy);
    }

    #[test]
    fn distance_equal_to_the_threshold_is_not_near() {
        let on_edge = blob(340.0, 180.0);
        let far = blob(500.0, 400.0);
        assert_eq!(
            disambiguate(&[on_edge, far], REFERENCE, THRESHOLD),
            Err(TrackingFailure::AmbiguousRoles { near: 0 })
        );
    }

    #[test]
    fn wrong_counts_are_reported() {
        assert_eq!(
            disambiguate(&[], REFERENCE, THRESHOLD),
            Err(TrackingFailure::WrongBlobCount(0))
        );
        let b = blob(290.0, 180.0);
        assert_eq!(
            disambiguate(&[b], REFERENCE, THRESHOLD),
            Err(TrackingFailure::WrongBlobCount(1))
        );
        assert_eq!(
            disambiguate(&[b, b, b], REFERENCE, THRESHOLD),
            Err(TrackingFailure::WrongBlobCount(3))
        );
    }

    #[test]
    fn both_near_is_ambiguous() {
        let pair = [blob(285.0, 175.0), blob(300.0, 190.0)];
        assert_eq!(
            disambiguate(&pair, REFERENCE, THRESHOLD),
            Err(TrackingFailure::AmbiguousRoles { near: 2 })
        );
    }

    #[test]
    fn failures_describe_themselves() {
        let count = TrackingFailure::WrongBlobCount(3).to_string();
        assert!(count.contains("exactly two"));
        let roles = TrackingFailure::AmbiguousRoles { near: 2 }.to_string();
        assert!(roles.contains("2 of 2"));
    }
}
