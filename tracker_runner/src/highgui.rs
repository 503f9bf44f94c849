// THEORY:
// OpenCV-backed implementations of the runner's collaborators, compiled only with the
// `highgui` feature: a `Display` that shows windows and reads keys, a `RangeSource`
// reading six trackbars on the mask window, and a `CameraDriver` over `VideoCapture`.
//
// The engine works in RGB `image` buffers. Conversion to and from OpenCV's BGR `Mat`
// happens here and nowhere else.

use anyhow::{Context, Result, bail};
use opencv::core::{self, Mat, Scalar};
use opencv::prelude::*;
use opencv::{highgui, imgproc, videoio};
use pendulum_vision::cycle_driver::{WINDOW_DEPTH, WINDOW_MASK, WINDOW_RGB};
use pendulum_vision::interfaces::{CameraDriver, Display, FrameCallbacks, RangeSource};
use pendulum_vision::{ColorFrame, ColorRange, Mask, Resolution};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Trackbar names in `ColorRange` order: lower RGB, then upper RGB.
const TRACKBARS: [&str; 6] = ["lowR", "lowG", "lowB", "highR", "highG", "highB"];

fn color_to_mat(frame: &ColorFrame) -> opencv::Result<Mat> {
    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());
    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}

fn mask_to_mat(mask: &Mask) -> opencv::Result<Mat> {
    let mut gray = Mat::new_rows_cols_with_default(
        mask.height() as i32,
        mask.width() as i32,
        core::CV_8UC1,
        Scalar::all(0.0),
    )?;
    gray.data_bytes_mut()?.copy_from_slice(mask.as_raw());
    Ok(gray)
}

/// Named OpenCV windows plus `wait_key` polling.
pub struct HighGuiDisplay;

impl HighGuiDisplay {
    pub fn new(calibration: bool) -> Result<Self> {
        highgui::named_window(WINDOW_RGB, highgui::WINDOW_AUTOSIZE)?;
        if calibration {
            highgui::named_window(WINDOW_MASK, highgui::WINDOW_AUTOSIZE)?;
            highgui::named_window(WINDOW_DEPTH, highgui::WINDOW_AUTOSIZE)?;
        }
        Ok(Self)
    }
}

impl Display for HighGuiDisplay {
    fn show_color(&mut self, window: &str, frame: &ColorFrame) {
        if let Err(e) = color_to_mat(frame).and_then(|mat| highgui::imshow(window, &mat)) {
            warn!(window, error = %e, "imshow failed");
        }
    }

    fn show_gray(&mut self, window: &str, frame: &Mask) {
        if let Err(e) = mask_to_mat(frame).and_then(|mat| highgui::imshow(window, &mat)) {
            warn!(window, error = %e, "imshow failed");
        }
    }

    fn poll_key(&mut self) -> Option<i32> {
        match highgui::wait_key(1) {
            Ok(key) if key >= 0 => Some(key & 0xFF),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "wait_key failed");
                None
            }
        }
    }
}

impl Drop for HighGuiDisplay {
    fn drop(&mut self) {
        highgui::destroy_all_windows().ok();
    }
}

/// Six 0–255 trackbars on the mask window.
pub struct TrackbarRange {
    last: ColorRange,
}

impl TrackbarRange {
    pub fn new(initial: ColorRange) -> Result<Self> {
        highgui::named_window(WINDOW_MASK, highgui::WINDOW_AUTOSIZE)?;
        let values = initial.lower.iter().chain(initial.upper.iter());
        for (name, value) in TRACKBARS.iter().zip(values) {
            highgui::create_trackbar(name, WINDOW_MASK, None, 255, None)
                .with_context(|| format!("creating trackbar {name}"))?;
            highgui::set_trackbar_pos(name, WINDOW_MASK, *value as i32)?;
        }
        Ok(Self { last: initial })
    }

    fn read(&self) -> opencv::Result<ColorRange> {
        let mut values = [0u8; 6];
        for (slot, name) in values.iter_mut().zip(TRACKBARS) {
            *slot = highgui::get_trackbar_pos(name, WINDOW_MASK)?.clamp(0, 255) as u8;
        }
        let [lr, lg, lb, hr, hg, hb] = values;
        Ok(ColorRange::new([lr, lg, lb], [hr, hg, hb]))
    }
}

impl RangeSource for TrackbarRange {
    fn current_range(&mut self) -> ColorRange {
        match self.read() {
            Ok(range) => self.last = range,
            Err(e) => warn!(error = %e, "reading trackbars failed, keeping last range"),
        }
        self.last
    }
}

/// A `VideoCapture` device read on its own thread. Color only.
pub struct OpenCvCamera {
    device: i32,
    resolution: Resolution,
    callbacks: Arc<dyn FrameCallbacks>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl OpenCvCamera {
    pub fn open(device: i32, resolution: Resolution, callbacks: Arc<dyn FrameCallbacks>) -> Result<Self> {
        Ok(Self {
            device,
            resolution,
            callbacks,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }
}

impl CameraDriver for OpenCvCamera {
    fn start_video(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        let mut capture = videoio::VideoCapture::new(self.device, videoio::CAP_ANY)
            .with_context(|| format!("opening capture device {}", self.device))?;
        if !capture.is_opened()? {
            bail!("capture device {} did not open", self.device);
        }
        capture.set(videoio::CAP_PROP_FRAME_WIDTH, self.resolution.width as f64)?;
        capture.set(videoio::CAP_PROP_FRAME_HEIGHT, self.resolution.height as f64)?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let callbacks = Arc::clone(&self.callbacks);
        let device = self.device;
        let handle = thread::Builder::new()
            .name("opencv-capture".into())
            .spawn(move || {
                let start = Instant::now();
                let mut bgr = Mat::default();
                let mut rgb = Mat::default();
                while running.load(Ordering::SeqCst) {
                    match capture.read(&mut bgr) {
                        Ok(true) if !bgr.empty() => {}
                        Ok(_) => {
                            thread::sleep(Duration::from_millis(5));
                            continue;
                        }
                        Err(e) => {
                            warn!(device, error = %e, "capture read failed");
                            break;
                        }
                    }
                    let converted = imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
                        .and_then(|()| rgb.data_bytes());
                    match converted {
                        Ok(bytes) => callbacks.on_color_frame(bytes, start.elapsed().as_millis() as u32),
                        Err(e) => warn!(device, error = %e, "frame conversion failed"),
                    }
                }
                info!(device, "capture thread exiting");
            })
            .context("spawning capture thread")?;
        self.worker = Some(handle);
        info!(device = self.device, "capture started");
        Ok(())
    }

    fn stop_video(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                bail!("capture thread panicked");
            }
        }
        Ok(())
    }

    fn start_depth(&mut self) -> Result<()> {
        warn!(device = self.device, "OpenCV capture has no depth stream");
        Ok(())
    }

    fn stop_depth(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        if let Err(e) = self.stop_video() {
            warn!(error = %e, "capture shutdown");
        }
    }
}
