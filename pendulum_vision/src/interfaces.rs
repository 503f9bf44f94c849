// THEORY:
// The engine does not own the camera, the windows or the message transport. It talks
// to them through the narrow traits in this module so the core stays testable with
// in-memory stand-ins and the binaries can plug in real hardware.
//
// - `FrameCallbacks` is what a camera driver calls into, from any thread.
// - `CameraDriver` is the start/stop surface of that driver.
// - `Publisher` receives one relative position per successful cycle, fire-and-forget.
// - `Display` shows rendered frames and reports keypresses.
// - `RangeSource` supplies the live color range in calibration mode.

use crate::core_modules::frame::{ColorFrame, Mask};
use crate::core_modules::role_disambiguator::RelativePosition;
use crate::core_modules::segmenter::ColorRange;
use tokio::sync::watch;

/// Key code the display reports for Escape.
pub const KEY_ESCAPE: i32 = 27;
/// Key code that requests a calibration snapshot.
pub const KEY_SNAPSHOT: i32 = 's' as i32;

/// The callback capability a camera driver pushes frames into.
///
/// Implementations must copy what they need before returning; the driver may reuse
/// its buffers as soon as the call ends.
pub trait FrameCallbacks: Send + Sync {
    /// Interleaved 8-bit RGB, row-major, at the session resolution.
    fn on_color_frame(&self, rgb: &[u8], timestamp: u32);
    /// 16-bit depth readings, row-major, at the session resolution.
    fn on_depth_frame(&self, depth: &[u16], timestamp: u32);
}

/// Start/stop control of an asynchronous frame source.
pub trait CameraDriver {
    fn start_video(&mut self) -> anyhow::Result<()>;
    fn stop_video(&mut self) -> anyhow::Result<()>;
    fn start_depth(&mut self) -> anyhow::Result<()>;
    fn stop_depth(&mut self) -> anyhow::Result<()>;
}

/// Downstream consumer of tracking results. Delivery is fire-and-forget.
pub trait Publisher {
    fn publish(&mut self, position: RelativePosition);
}

/// A surface that shows named windows and reports keypresses.
pub trait Display {
    fn show_color(&mut self, window: &str, frame: &ColorFrame);
    fn show_gray(&mut self, window: &str, frame: &Mask);
    /// The key pressed since the last poll, if any.
    fn poll_key(&mut self) -> Option<i32>;
}

/// Live color thresholds, read once per calibration cycle.
pub trait RangeSource {
    fn current_range(&mut self) -> ColorRange;
}

impl<T: Publisher + ?Sized> Publisher for Box<T> {
    fn publish(&mut self, position: RelativePosition) {
        (**self).publish(position)
    }
}

impl<T: Display + ?Sized> Display for Box<T> {
    fn show_color(&mut self, window: &str, frame: &ColorFrame) {
        (**self).show_color(window, frame)
    }
    fn show_gray(&mut self, window: &str, frame: &Mask) {
        (**self).show_gray(window, frame)
    }
    fn poll_key(&mut self) -> Option<i32> {
        (**self).poll_key()
    }
}

/// A publisher that drops everything. Used by calibration mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPublisher;

impl Publisher for NullPublisher {
    fn publish(&mut self, _position: RelativePosition) {}
}

/// A publisher that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogPublisher;

impl Publisher for LogPublisher {
    fn publish(&mut self, position: RelativePosition) {
        tracing::info!(dx = position.dx, dy = position.dy, "relative position");
    }
}

/// A display with no windows and no keyboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDisplay;

impl Display for NullDisplay {
    fn show_color(&mut self, _window: &str, _frame: &ColorFrame) {}
    fn show_gray(&mut self, _window: &str, _frame: &Mask) {}
    fn poll_key(&mut self) -> Option<i32> {
        None
    }
}

/// A range that never changes.
#[derive(Debug, Clone, Copy)]
pub struct FixedRange(pub ColorRange);

impl RangeSource for FixedRange {
    fn current_range(&mut self) -> ColorRange {
        self.0
    }
}

/// A range fed from another task or thread through a `watch` channel.
pub struct WatchRange {
    receiver: watch::Receiver<ColorRange>,
}

impl WatchRange {
    pub fn new(initial: ColorRange) -> (watch::Sender<ColorRange>, Self) {
        let (sender, receiver) = watch::channel(initial);
        (sender, Self { receiver })
    }
}

impl RangeSource for WatchRange {
    fn current_range(&mut self) -> ColorRange {
        *self.receiver.borrow_and_update()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_range_follows_the_latest_slider_values() {
        let initial = ColorRange::new([0, 0, 0], [255, 255, 255]);
        let (sliders, mut source) = WatchRange::new(initial);
        assert_eq!(source.current_range(), initial);

        let tuned = ColorRange::new([10, 20, 30], [200, 210, 220]);
        sliders.send(tuned).unwrap();
        assert_eq!(source.current_range(), tuned);
    }
}
