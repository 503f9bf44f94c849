// Tracking mode: publishes the pendulum's position relative to the end effector
// over UDP at the configured cycle rate. Stop with Esc or Ctrl-C.

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
    let publisher = tracker_runner::open_publisher(&config)?;
    let display = tracker_runner::open_display(&config, false)?;

    tracker_runner::start_streams(camera.as_mut())?;
    let shutdown = tracker_runner::shutdown_on_ctrl_c();
    let mut driver = CycleDriver::tracking(config, channels, publisher, display);
    let stats = driver.run(shutdown).await;
    tracker_runner::stop_streams(camera.as_mut());

    info!(published = stats.published, "ball tracker stopped");
    Ok(())
}
