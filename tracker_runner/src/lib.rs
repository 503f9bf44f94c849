// THEORY:
// `tracker_runner` is the process shell around the `pendulum_vision` engine. It owns
// everything the engine deliberately does not: picking a frame source, opening
// windows, the UDP socket, signal handling and logging setup. The two binaries only
// differ in which `CycleDriver` mode they build.
//
// OpenCV is optional. Without the `highgui` feature the runner is fully headless:
// calibration reads slider values from stdin and dumps its windows as PNG files.

pub mod headless;
#[cfg(feature = "highgui")]
pub mod highgui;
pub mod replay;
pub mod udp;

use anyhow::{Result, bail};
use pendulum_vision::config::SourceConfig;
use pendulum_vision::interfaces::{
    CameraDriver, Display, FrameCallbacks, LogPublisher, NullDisplay, Publisher, RangeSource,
};
use pendulum_vision::synthetic_rig::{RigScene, SyntheticRig};
use pendulum_vision::TrackerConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Headless calibration rewrites its window dumps every this many frames.
const SNAPSHOT_EVERY: u64 = 30;

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Config from the first CLI argument, `$PV_CONFIG`, or defaults.
pub fn config_from_args() -> Result<TrackerConfig> {
    let explicit = std::env::args_os().nth(1).map(PathBuf::from);
    let config = TrackerConfig::resolve(explicit)?;
    info!(source = ?config.source, resolution = ?config.resolution, "configuration loaded");
    Ok(config)
}

/// Builds the configured frame source, registered to call back into `callbacks`.
pub fn open_camera(config: &TrackerConfig, callbacks: Arc<dyn FrameCallbacks>) -> Result<Box<dyn CameraDriver>> {
    match &config.source {
        SourceConfig::Synthetic { fps } => {
            let rig = SyntheticRig::new(RigScene::from_config(config), *fps, callbacks)?;
            Ok(Box::new(rig))
        }
        SourceConfig::Replay { directory, fps } => {
            let camera = replay::ReplayCamera::open(directory, *fps, config.resolution, callbacks)?;
            Ok(Box::new(camera))
        }
        #[cfg(feature = "highgui")]
        SourceConfig::Opencv { device } => {
            let camera = highgui::OpenCvCamera::open(*device, config.resolution, callbacks)?;
            Ok(Box::new(camera))
        }
        #[cfg(not(feature = "highgui"))]
        SourceConfig::Opencv { device } => {
            bail!("source `opencv` (device {device}) needs the `highgui` feature")
        }
    }
}

/// UDP to `publisher.address`, or log-only when the address is empty.
pub fn open_publisher(config: &TrackerConfig) -> Result<Box<dyn Publisher>> {
    if config.publisher.address.is_empty() {
        info!("no publisher address, logging positions only");
        return Ok(Box::new(LogPublisher));
    }
    let publisher = udp::UdpPublisher::new(&config.publisher)?;
    info!(
        address = %config.publisher.address,
        topic = %config.publisher.topic,
        "publishing over UDP"
    );
    Ok(Box::new(publisher))
}

/// The window surface for this build: OpenCV windows with `highgui`, otherwise
/// PNG dumps in calibration and nothing while tracking.
pub fn open_display(config: &TrackerConfig, calibration: bool) -> Result<Box<dyn Display>> {
    #[cfg(feature = "highgui")]
    {
        let _ = config;
        Ok(Box::new(highgui::HighGuiDisplay::new(calibration)?))
    }
    #[cfg(not(feature = "highgui"))]
    {
        if calibration {
            let display = headless::SnapshotDisplay::new(&config.snapshot_dir, SNAPSHOT_EVERY)?;
            Ok(Box::new(display))
        } else {
            Ok(Box::new(NullDisplay))
        }
    }
}

/// Where calibration reads its live color range from.
pub fn open_range_source(config: &TrackerConfig) -> Result<Box<dyn RangeSource>> {
    #[cfg(feature = "highgui")]
    {
        Ok(Box::new(highgui::TrackbarRange::new(config.color_range)?))
    }
    #[cfg(not(feature = "highgui"))]
    {
        Ok(Box::new(headless::StdinRangeSource::spawn(config.color_range)?))
    }
}

/// A flag that flips to `true` on Ctrl-C.
pub fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (sender, receiver) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received");
                sender.send(true).ok();
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for ctrl-c; stop with escape instead");
                // Hold the sender so the driver does not read a drop as shutdown.
                sender.closed().await;
            }
        }
    });
    receiver
}

/// Starts both streams. Depth is optional for sources that have none.
pub fn start_streams(camera: &mut dyn CameraDriver) -> Result<()> {
    camera.start_video()?;
    camera.start_depth()?;
    Ok(())
}

pub fn stop_streams(camera: &mut dyn CameraDriver) {
    if let Err(e) = camera.stop_video() {
        warn!(error = %e, "stopping video failed");
    }
    if let Err(e) = camera.stop_depth() {
        warn!(error = %e, "stopping depth failed");
    }
}
