// THEORY:
// The `CycleDriver` is the consumer side of the engine. It wakes on a fixed cadence,
// takes whatever color frame the camera thread left in the mailbox and runs it through
// the `TrackingPipeline`. Frames that arrived while a cycle was busy are simply gone;
// cycles that find no fresh frame are skipped. There is no reuse of stale data and
// no queue.
//
// Key architectural principles:
// 1.  **One Frame, One Report**: `run_cycle` is synchronous and returns a
//     `CycleReport` describing exactly what happened. The async `run` loop only adds
//     pacing, key handling and cancellation around it.
// 2.  **Overlays Always**: the display copy is annotated whether or not tracking
//     succeeded, so the operator can see why a frame failed.
// 3.  **Two Modes, One Loop**: tracking mode uses the configured color range and
//     publishes. Calibration mode re-reads the range every cycle from a
//     `RangeSource`, shows the mask and a depth preview, and never publishes.
// 4.  **Cooperative Shutdown**: Escape from the display or the shutdown flag ends
//     the loop at a cycle boundary. Counters are logged on the way out.

use crate::config::TrackerConfig;
use crate::core_modules::depth::depth_preview;
use crate::core_modules::frame::ColorFrame;
use crate::core_modules::frame_channel::FrameChannels;
use crate::core_modules::overlay::{annotate_blob, annotate_reference};
use crate::core_modules::role_disambiguator::{RelativePosition, TrackingFailure};
use crate::core_modules::segmenter::ColorRange;
use crate::interfaces::{Display, KEY_ESCAPE, KEY_SNAPSHOT, NullPublisher, Publisher, RangeSource};
use crate::pipeline::TrackingPipeline;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// Window showing the blurred frame with overlays.
pub const WINDOW_RGB: &str = "rgb";
/// Window showing the binary mask (calibration only).
pub const WINDOW_MASK: &str = "filteredImg";
/// Window showing the depth preview (calibration only).
pub const WINDOW_DEPTH: &str = "depth";

/// What the driver does with each frame.
pub enum DriverMode {
    /// Fixed color range, full chain, publishes results.
    Tracking,
    /// Live color range, no role labelling, no publishing.
    Calibration(Box<dyn RangeSource>),
}

/// The outcome of a single cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleReport {
    /// No fresh color frame was waiting.
    Skipped,
    /// Both objects found and labelled; the position was published.
    Tracked(RelativePosition),
    /// A frame was processed but yielded no position.
    Incomplete(TrackingFailure),
    /// A calibration frame was processed.
    Calibrated { blobs: usize },
}

/// Running totals over the life of a driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub cycles: u64,
    pub skipped: u64,
    pub published: u64,
    pub wrong_count: u64,
    pub ambiguous: u64,
    pub calibrated: u64,
    pub snapshots: u64,
}

impl CycleStats {
    fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        match report {
            CycleReport::Skipped => self.skipped += 1,
            CycleReport::Tracked(_) => self.published += 1,
            CycleReport::Incomplete(TrackingFailure::WrongBlobCount(_)) => self.wrong_count += 1,
            CycleReport::Incomplete(TrackingFailure::AmbiguousRoles { .. }) => self.ambiguous += 1,
            CycleReport::Calibrated { .. } => self.calibrated += 1,
        }
    }
}

pub struct CycleDriver<P: Publisher, D: Display> {
    config: TrackerConfig,
    channels: Arc<FrameChannels>,
    pipeline: TrackingPipeline,
    mode: DriverMode,
    publisher: P,
    display: D,
    stats: CycleStats,
    last_canvas: Option<ColorFrame>,
}

impl<P: Publisher, D: Display> CycleDriver<P, D> {
    /// A tracking-mode driver publishing to `publisher`.
    pub fn tracking(config: TrackerConfig, channels: Arc<FrameChannels>, publisher: P, display: D) -> Self {
        Self::with_mode(config, channels, DriverMode::Tracking, publisher, display)
    }

    pub fn with_mode(
        config: TrackerConfig,
        channels: Arc<FrameChannels>,
        mode: DriverMode,
        publisher: P,
        display: D,
    ) -> Self {
        let pipeline = TrackingPipeline::new(&config);
        Self {
            config,
            channels,
            pipeline,
            mode,
            publisher,
            display,
            stats: CycleStats::default(),
            last_canvas: None,
        }
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn is_calibrating(&self) -> bool {
        matches!(self.mode, DriverMode::Calibration(_))
    }

    /// Processes the newest color frame, if any.
    pub fn run_cycle(&mut self) -> CycleReport {
        let report = match self.channels.color().try_consume() {
            None => CycleReport::Skipped,
            Some(frame) => {
                let live_range = match &mut self.mode {
                    DriverMode::Tracking => None,
                    DriverMode::Calibration(ranges) => Some(ranges.current_range()),
                };
                match live_range {
                    None => self.tracking_cycle(&frame),
                    Some(range) => self.calibration_cycle(&frame, range),
                }
            }
        };
        self.stats.record(&report);
        report
    }

    fn tracking_cycle(&mut self, frame: &ColorFrame) -> CycleReport {
        let (analysis, outcome) = self.pipeline.track(frame, &self.config.color_range);

        let mut canvas = analysis.blurred;
        annotate_reference(&mut canvas, self.pipeline.reference_point(), self.pipeline.role_radius());
        for blob in &analysis.blobs {
            annotate_blob(&mut canvas, blob, self.config.overlay_thickness);
        }
        self.display.show_color(WINDOW_RGB, &canvas);
        self.last_canvas = Some(canvas);

        match outcome {
            Ok(pair) => {
                let position = pair.relative_position();
                debug!(dx = position.dx, dy = position.dy, "tracked");
                self.publisher.publish(position);
                CycleReport::Tracked(position)
            }
            Err(failure) => {
                debug!(%failure, "no position this cycle");
                CycleReport::Incomplete(failure)
            }
        }
    }

    fn calibration_cycle(&mut self, frame: &ColorFrame, range: ColorRange) -> CycleReport {
        let analysis = self.pipeline.detect(frame, &range);

        let mut canvas = analysis.blurred;
        for blob in &analysis.blobs {
            annotate_blob(&mut canvas, blob, self.config.overlay_thickness);
        }
        self.display.show_color(WINDOW_RGB, &canvas);
        self.display.show_gray(WINDOW_MASK, &analysis.mask);
        if let Some(depth) = self.channels.depth().try_consume() {
            let preview = depth_preview(&depth, range.lower[0], range.upper[0]);
            self.display.show_gray(WINDOW_DEPTH, &preview);
        }
        self.last_canvas = Some(canvas);

        debug!(blobs = analysis.blobs.len(), ?range, "calibration frame");
        CycleReport::Calibrated {
            blobs: analysis.blobs.len(),
        }
    }

    /// Reacts to a keypress. Returns `true` when the loop should stop.
    pub fn handle_key(&mut self, key: i32) -> bool {
        match key {
            KEY_ESCAPE => {
                info!("escape pressed");
                true
            }
            KEY_SNAPSHOT if self.is_calibrating() => {
                self.save_snapshot();
                false
            }
            _ => false,
        }
    }

    fn save_snapshot(&mut self) {
        let Some(canvas) = &self.last_canvas else {
            warn!("no frame processed yet, nothing to snapshot");
            return;
        };
        let path = self
            .config
            .snapshot_dir
            .join(format!("snapshot{}.png", self.stats.snapshots));
        match canvas.save(&path) {
            Ok(()) => {
                self.stats.snapshots += 1;
                info!(path = %path.display(), "saved snapshot");
            }
            Err(e) => warn!(path = %path.display(), error = %e, "failed to save snapshot"),
        }
    }

    /// Runs cycles at the configured rate until Escape is pressed or `shutdown`
    /// turns `true`. A dropped shutdown sender also stops the loop.
    pub async fn run(&mut self, shutdown: watch::Receiver<bool>) -> CycleStats {
        let mut ticker = interval(self.config.cycle_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(
            rate_hz = self.config.cycle_rate_hz,
            calibration = self.is_calibrating(),
            "cycle driver started"
        );

        loop {
            ticker.tick().await;
            if shutdown.has_changed().is_err() {
                info!("shutdown sender dropped");
                break;
            }
            if *shutdown.borrow() {
                info!("shutdown requested");
                break;
            }

            self.run_cycle();

            if let Some(key) = self.display.poll_key() {
                if self.handle_key(key) {
                    break;
                }
            }
        }

        let stats = self.stats;
        info!(
            cycles = stats.cycles,
            skipped = stats.skipped,
            published = stats.published,
            wrong_count = stats.wrong_count,
            ambiguous = stats.ambiguous,
            calibrated = stats.calibrated,
            frames_dropped = self.channels.color().dropped(),
            frames_rejected = self.channels.rejected(),
            "cycle driver stopped"
        );
        stats
    }
}

impl<D: Display> CycleDriver<NullPublisher, D> {
    /// A calibration-mode driver reading its color range from `ranges`.
    pub fn calibration(
        config: TrackerConfig,
        channels: Arc<FrameChannels>,
        ranges: Box<dyn RangeSource>,
        display: D,
    ) -> Self {
        Self::with_mode(config, channels, DriverMode::Calibration(ranges), NullPublisher, display)
    }
}
