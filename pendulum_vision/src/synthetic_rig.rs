// THEORY:
// The `SyntheticRig` stands in for the depth camera. It renders the scene the tracker
// expects to see (a fixed end-effector marker at the reference point and a pendulum
// marker swinging above it, both in the marker color, on a dark background) and
// pushes the frames into the registered `FrameCallbacks` from its own thread, the
// same way a hardware driver calls back from its event thread.
//
// Depth is a flat plane with the two markers standing slightly closer to the sensor.

use crate::config::TrackerConfig;
use crate::core_modules::frame::{ColorFrame, DepthFrame, Resolution};
use crate::core_modules::geometry::Point2;
use crate::interfaces::{CameraDriver, FrameCallbacks};
use anyhow::{Context, Result, bail};
use image::{Luma, Rgb};
use std::f64::consts::TAU;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const BACKGROUND: Rgb<u8> = Rgb([30, 30, 30]);
/// Inside the default marker color range.
const MARKER: Rgb<u8> = Rgb([200, 160, 10]);
const FLOOR_DEPTH: u16 = 900;
const MARKER_DEPTH: u16 = 600;

/// Geometry and motion of the simulated rig.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigScene {
    pub resolution: Resolution,
    /// Where the end-effector marker sits, and the pivot of the pendulum.
    pub pivot: Point2,
    /// Pivot to pendulum-marker distance in pixels.
    pub arm_length: f64,
    /// Peak swing angle from vertical, in radians.
    pub amplitude: f64,
    /// Seconds per full swing.
    pub period: f64,
    pub end_effector_radius: f64,
    pub pendulum_radius: f64,
}

impl RigScene {
    pub fn from_config(config: &TrackerConfig) -> Self {
        Self {
            resolution: config.resolution,
            pivot: config.reference_point,
            arm_length: 130.0,
            amplitude: 0.6,
            period: 2.0,
            end_effector_radius: 22.0,
            pendulum_radius: 16.0,
        }
    }

    /// Pendulum marker center `t` seconds into the run.
    pub fn pendulum_at(&self, t: f64) -> Point2 {
        let angle = self.amplitude * (TAU * t / self.period).sin();
        Point2::new(
            self.pivot.x + self.arm_length * angle.sin(),
            self.pivot.y - self.arm_length * angle.cos(),
        )
    }

    fn on_marker(&self, t: f64, x: u32, y: u32) -> bool {
        let p = Point2::new(x as f64, y as f64);
        p.distance_to(self.pivot) <= self.end_effector_radius
            || p.distance_to(self.pendulum_at(t)) <= self.pendulum_radius
    }

    pub fn render_color(&self, t: f64) -> ColorFrame {
        let Resolution { width, height } = self.resolution;
        ColorFrame::from_fn(width, height, |x, y| {
            if self.on_marker(t, x, y) { MARKER } else { BACKGROUND }
        })
    }

    pub fn render_depth(&self, t: f64) -> DepthFrame {
        let Resolution { width, height } = self.resolution;
        DepthFrame::from_fn(width, height, |x, y| {
            Luma([if self.on_marker(t, x, y) { MARKER_DEPTH } else { FLOOR_DEPTH }])
        })
    }
}

struct Streams {
    running: AtomicBool,
    video: AtomicBool,
    depth: AtomicBool,
}

/// A simulated camera that calls back from a background thread at a fixed rate.
pub struct SyntheticRig {
    scene: RigScene,
    frame_interval: Duration,
    callbacks: Arc<dyn FrameCallbacks>,
    streams: Arc<Streams>,
    worker: Option<JoinHandle<()>>,
}

impl SyntheticRig {
    pub fn new(scene: RigScene, fps: f64, callbacks: Arc<dyn FrameCallbacks>) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            bail!("synthetic rig fps must be positive, got {fps}");
        }
        Ok(Self {
            scene,
            frame_interval: Duration::from_secs_f64(1.0 / fps),
            callbacks,
            streams: Arc::new(Streams {
                running: AtomicBool::new(false),
                video: AtomicBool::new(false),
                depth: AtomicBool::new(false),
            }),
            worker: None,
        })
    }

    pub fn scene(&self) -> &RigScene {
        &self.scene
    }

    fn ensure_worker(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        self.streams.running.store(true, Ordering::SeqCst);
        let scene = self.scene;
        let interval = self.frame_interval;
        let callbacks = Arc::clone(&self.callbacks);
        let streams = Arc::clone(&self.streams);
        let handle = thread::Builder::new()
            .name("synthetic-rig".into())
            .spawn(move || {
                let start = Instant::now();
                while streams.running.load(Ordering::SeqCst) {
                    let elapsed = start.elapsed();
                    let t = elapsed.as_secs_f64();
                    let timestamp = elapsed.as_millis() as u32;
                    if streams.video.load(Ordering::SeqCst) {
                        callbacks.on_color_frame(scene.render_color(t).as_raw(), timestamp);
                    }
                    if streams.depth.load(Ordering::SeqCst) {
                        callbacks.on_depth_frame(scene.render_depth(t).as_raw(), timestamp);
                    }
                    thread::sleep(interval);
                }
                debug!("synthetic rig thread exiting");
            })
            .context("spawning synthetic rig thread")?;
        self.worker = Some(handle);
        info!(
            width = self.scene.resolution.width,
            height = self.scene.resolution.height,
            "synthetic rig started"
        );
        Ok(())
    }

    fn stop_worker_if_idle(&mut self) {
        if self.streams.video.load(Ordering::SeqCst) || self.streams.depth.load(Ordering::SeqCst) {
            return;
        }
        self.streams.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!("synthetic rig thread panicked");
            }
            info!("synthetic rig stopped");
        }
    }
}

impl CameraDriver for SyntheticRig {
    fn start_video(&mut self) -> Result<()> {
        self.streams.video.store(true, Ordering::SeqCst);
        self.ensure_worker()
    }

    fn stop_video(&mut self) -> Result<()> {
        self.streams.video.store(false, Ordering::SeqCst);
        self.stop_worker_if_idle();
        Ok(())
    }

    fn start_depth(&mut self) -> Result<()> {
        self.streams.depth.store(true, Ordering::SeqCst);
        self.ensure_worker()
    }

    fn stop_depth(&mut self) -> Result<()> {
        self.streams.depth.store(false, Ordering::SeqCst);
        self.stop_worker_if_idle();
        Ok(())
    }
}

impl Drop for SyntheticRig {
    fn drop(&mut self) {
        self.streams.video.store(false, Ordering::SeqCst);
        self.streams.depth.store(false, Ordering::SeqCst);
        self.stop_worker_if_idle();
    }
}
