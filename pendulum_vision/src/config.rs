// THEORY:
// Every tunable of the engine lives in one `TrackerConfig` value that is built once at
// startup and handed to the `CycleDriver`. Nothing reads globals. The only thing that
// changes while running is the color range, and only in calibration mode, where the
// driver re-reads it from its `RangeSource` every cycle.
//
// A config file is optional JSON. Missing fields fall back to the values the rig was
// originally tuned with, so a file only has to mention what differs.

use crate::core_modules::frame::Resolution;
use crate::core_modules::geometry::Point2;
use crate::core_modules::segmenter::ColorRange;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var naming the config file when no path is passed on the command line.
pub const CONFIG_PATH_ENV: &str = "PV_CONFIG";
/// Env var overriding `publisher.address`.
pub const PUBLISH_ADDR_ENV: &str = "PV_PUBLISH_ADDR";

/// Where the runner gets its frames from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// The built-in simulated rig.
    Synthetic { fps: f64 },
    /// Images from a directory, looped in file-name order.
    Replay { directory: PathBuf, fps: f64 },
    /// An OpenCV capture device (requires the `highgui` feature).
    Opencv { device: i32 },
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Synthetic { fps: 30.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// UDP destination of relative-position datagrams. Empty logs positions instead.
    pub address: String,
    /// Local bind address of the sending socket.
    pub bind: String,
    /// Topic name carried in each message.
    pub topic: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:9870".to_string(),
            bind: "0.0.0.0:0".to_string(),
            topic: "ball_tracker".to_string(),
        }
    }
}

/// Configuration of the tracking engine and its runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Session frame geometry; driver buffers of any other size are rejected.
    pub resolution: Resolution,
    /// Target cycle frequency in Hz.
    pub cycle_rate_hz: f64,
    /// Blobs must have an area strictly greater than this (pixels).
    pub min_blob_area: f64,
    /// Gaussian kernel size used before thresholding. Odd, and no larger than the frame.
    pub blur_kernel_size: usize,
    /// Rest position of the end effector in image coordinates.
    pub reference_point: Point2,
    /// A blob closer than this to `reference_point` is the end effector.
    pub role_radius: f64,
    /// Marker color thresholds (initial slider values in calibration mode).
    pub color_range: ColorRange,
    /// Outline thickness of blob circles in the debug overlay.
    pub overlay_thickness: u32,
    pub source: SourceConfig,
    pub publisher: PublisherConfig,
    /// Where calibration snapshots and headless window dumps are written.
    pub snapshot_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            cycle_rate_hz: 100.0,
            min_blob_area: 120.0,
            blur_kernel_size: 9,
            reference_point: Point2::new(290.0, 180.0),
            role_radius: 50.0,
            color_range: ColorRange::default(),
            overlay_thickness: 2,
            source: SourceConfig::default(),
            publisher: PublisherConfig::default(),
            snapshot_dir: PathBuf::from("."),
        }
    }
}

impl TrackerConfig {
    /// Parses a JSON config and validates it.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("invalid tracker config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("loading {}", path.display()))
    }

    /// Loads from `explicit` if given, else from `$PV_CONFIG`, else defaults.
    /// `$PV_PUBLISH_ADDR` then overrides the publisher address.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self> {
        let path = explicit.or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Ok(address) = std::env::var(PUBLISH_ADDR_ENV) {
            if !address.is_empty() {
                config.publisher.address = address;
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolution.width == 0 || self.resolution.height == 0 {
            bail!(
                "resolution must be non-zero, got {}x{}",
                self.resolution.width,
                self.resolution.height
            );
        }
        if !(self.cycle_rate_hz.is_finite() && self.cycle_rate_hz > 0.0) {
            bail!("cycle_rate_hz must be positive, got {}", self.cycle_rate_hz);
        }
        let (width, height) = (self.resolution.width as f64, self.resolution.height as f64);
        let shorter = self.resolution.width.min(self.resolution.height) as usize;
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 || self.blur_kernel_size > shorter {
            bail!(
                "blur_kernel_size must be odd and at most {shorter}, got {}",
                self.blur_kernel_size
            );
        }
        if !(self.min_blob_area.is_finite() && self.min_blob_area >= 0.0) {
            bail!("min_blob_area must be finite and >= 0, got {}", self.min_blob_area);
        }
        let diagonal = width.hypot(height);
        if !(self.role_radius > 0.0 && self.role_radius <= diagonal) {
            bail!(
                "role_radius must be in (0, {diagonal:.1}] for a {}x{} frame, got {}",
                self.resolution.width,
                self.resolution.height,
                self.role_radius
            );
        }
        let Point2 { x, y } = self.reference_point;
        if !((0.0..=width).contains(&x) && (0.0..=height).contains(&y)) {
            bail!("reference_point ({x}, {y}) is outside the frame");
        }
        Ok(())
    }

    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.cycle_rate_hz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_tuned_rig() {
        let config = TrackerConfig::default();
        assert_eq!(config.resolution, Resolution::new(640, 480));
        assert_eq!(config.min_blob_area, 120.0);
        assert_eq!(config.reference_point, Point2::new(290.0, 180.0));
        assert_eq!(config.role_radius, 50.0);
        assert_eq!(config.cycle_period(), Duration::from_millis(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = TrackerConfig::from_json(
            r#"{
                "role_radius": 35.0,
                "color_range": { "lower": [200, 200, 200], "upper": [255, 255, 255] },
                "source": { "kind": "replay", "directory": "frames", "fps": 15.0 },
                "publisher": { "address": "10.0.0.2:9000" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.role_radius, 35.0);
        assert_eq!(config.color_range.lower, [200; 3]);
        assert_eq!(config.min_blob_area, 120.0);
        assert_eq!(
            config.source,
            SourceConfig::Replay {
                directory: PathBuf::from("frames"),
                fps: 15.0
            }
        );
        assert_eq!(config.publisher.address, "10.0.0.2:9000");
        assert_eq!(config.publisher.topic, "ball_tracker");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(TrackerConfig::from_json(r#"{ "blur_kernel_size": 8 }"#).is_err());
        assert!(TrackerConfig::from_json(r#"{ "cycle_rate_hz": 0.0 }"#).is_err());
        assert!(TrackerConfig::from_json(r#"{ "resolution": { "width": 0, "height": 480 } }"#).is_err());
        assert!(TrackerConfig::from_json("not json").is_err());
    }

    #[test]
    fn geometry_must_fit_the_frame() {
        assert!(TrackerConfig::from_json(r#"{ "role_radius": 1e7 }"#).is_err());
        assert!(TrackerConfig::from_json(r#"{ "role_radius": 0.0 }"#).is_err());
        assert!(TrackerConfig::from_json(r#"{ "role_radius": 799.0 }"#).is_ok());
        assert!(TrackerConfig::from_json(r#"{ "blur_kernel_size": 481 }"#).is_err());
        assert!(TrackerConfig::from_json(r#"{ "blur_kernel_size": 479 }"#).is_ok());
        assert!(TrackerConfig::from_json(r#"{ "min_blob_area": -1.0 }"#).is_err());
        assert!(TrackerConfig::from_json(r#"{ "reference_point": { "x": 700.0, "y": 10.0 } }"#).is_err());
        assert!(TrackerConfig::from_json(r#"{ "reference_point": { "x": 10.0, "y": -1.0 } }"#).is_err());
    }

    #[test]
    fn non_finite_values_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY] {
            let config = TrackerConfig {
                role_radius: bad,
                ..TrackerConfig::default()
            };
            assert!(config.validate().is_err());
            let config = TrackerConfig {
                min_blob_area: bad,
                ..TrackerConfig::default()
            };
            assert!(config.validate().is_err());
            let config = TrackerConfig {
                reference_point: Point2::new(bad, 10.0),
                ..TrackerConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn round_trips_through_json() {
        let config = TrackerConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(TrackerConfig::from_json(&text).unwrap(), config);
    }
}
