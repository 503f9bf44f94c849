// A camera that replays still images from a directory, looping in file-name order.
// It has no depth stream.

use anyhow::{Context, Result, bail};
use pendulum_vision::interfaces::{CameraDriver, FrameCallbacks};
use pendulum_vision::{ColorFrame, Resolution};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

pub struct ReplayCamera {
    frames: Arc<Vec<ColorFrame>>,
    frame_interval: Duration,
    callbacks: Arc<dyn FrameCallbacks>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

fn image_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(directory)
        .with_context(|| format!("reading replay directory {}", directory.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_image {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl ReplayCamera {
    /// Decodes every image up front. Fails if the directory has no images or any
    /// image does not match `resolution`.
    pub fn open(
        directory: &Path,
        fps: f64,
        resolution: Resolution,
        callbacks: Arc<dyn FrameCallbacks>,
    ) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            bail!("replay fps must be positive, got {fps}");
        }
        let files = image_files(directory)?;
        if files.is_empty() {
            bail!("no images found in {}", directory.display());
        }

        let mut frames = Vec::with_capacity(files.len());
        for path in &files {
            let frame = image::open(path)
                .with_context(|| format!("decoding {}", path.display()))?
                .to_rgb8();
            if !resolution.matches(&frame) {
                bail!(
                    "{} is {}x{}, session resolution is {}x{}",
                    path.display(),
                    frame.width(),
                    frame.height(),
                    resolution.width,
                    resolution.height
                );
            }
            frames.push(frame);
        }
        info!(directory = %directory.display(), frames = frames.len(), fps, "replay loaded");

        Ok(Self {
            frames: Arc::new(frames),
            frame_interval: Duration::from_secs_f64(1.0 / fps),
            callbacks,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        })
    }
}

impl CameraDriver for ReplayCamera {
    fn start_video(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }
        self.running.store(true, Ordering::SeqCst);
        let frames = Arc::clone(&self.frames);
        let callbacks = Arc::clone(&self.callbacks);
        let running = Arc::clone(&self.running);
        let interval = self.frame_interval;
        let handle = thread::Builder::new()
            .name("replay-camera".into())
            .spawn(move || {
                let start = Instant::now();
                for frame in frames.iter().cycle() {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    callbacks.on_color_frame(frame.as_raw(), start.elapsed().as_millis() as u32);
                    thread::sleep(interval);
                }
            })
            .context("spawning replay thread")?;
        self.worker = Some(handle);
        Ok(())
    }

    fn stop_video(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                bail!("replay thread panicked");
            }
        }
        Ok(())
    }

    fn start_depth(&mut self) -> Result<()> {
        warn!("replay source has no depth stream");
        Ok(())
    }

    fn stop_depth(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Drop for ReplayCamera {
    fn drop(&mut self) {
        if let Err(e) = self.stop_video() {
            warn!(error = %e, "replay shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use pendulum_vision::FrameChannels;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pv-replay-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn replays_images_in_name_order_and_loops() {
        let dir = scratch_dir("loop");
        ColorFrame::from_pixel(8, 6, Rgb([10, 0, 0])).save(dir.join("b.png")).unwrap();
        ColorFrame::from_pixel(8, 6, Rgb([20, 0, 0])).save(dir.join("a.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let resolution = Resolution::new(8, 6);
        let channels = Arc::new(FrameChannels::new(resolution));
        let mut camera = ReplayCamera::open(&dir, 500.0, resolution, channels.clone()).unwrap();
        assert_eq!(channels.color().published(), 0);

        camera.start_video().unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while channels.color().published() < 4 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        camera.stop_video().unwrap();
        assert!(channels.color().published() >= 4);
        assert_eq!(channels.rejected(), 0);
        // The last frame handed over is one of the two decoded images.
        let last = channels.color().try_consume().unwrap();
        assert!([10, 20].contains(&last.get_pixel(0, 0).0[0]));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn wrong_sized_images_are_refused() {
        let dir = scratch_dir("size");
        ColorFrame::new(4, 4).save(dir.join("small.png")).unwrap();
        let channels = Arc::new(FrameChannels::new(Resolution::default()));
        let err = ReplayCamera::open(&dir, 10.0, Resolution::default(), channels)
            .err()
            .unwrap();
        assert!(err.to_string().contains("4x4"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
