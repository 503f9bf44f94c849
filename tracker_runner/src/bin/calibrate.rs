// Calibration mode: shows the overlay, the mask and a depth preview while the color
// range is tuned live. Press `s` to save a snapshot, Esc or Ctrl-C to quit. Nothing
// is published.

use anyhow::Result;
use pendulum_vision::{CycleDriver, FrameChannels};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracker_runner::init_tracing();
    let config = tracker_runner::config_from_args()?;

    let channels = Arc::new(FrameChannels::new(config.resolution));
    let mut camera = tracker_runner::open_camera(&config, channels.clone())?;
    let display = tracker_runner::open_display(&config, true)?;
    let ranges = tracker_runner::open_range_source(&config)?;

    tracker_runner::start_streams(camera.as_mut())?;
    let shutdown = tracker_runner::shutdown_on_ctrl_c();
    let mut driver = CycleDriver::calibration(config, channels, ranges, display);
    let stats = driver.run(shutdown).await;
    tracker_runner::stop_streams(camera.as_mut());

    info!(snapshots = stats.snapshots, "calibration stopped");
    Ok(())
}
