// THEORY:
// The `frame_channel` module is the only place in the engine where two threads meet.
// The camera driver pushes frames from its own callback thread whenever the hardware
// has one; the cycle driver pulls frames on its own schedule. Neither side may wait
// on the other.
//
// Key architectural principles:
// 1.  **Single Slot, Newest Wins**: A `FrameMailbox` holds at most one pending frame.
//     Publishing replaces whatever is there. A slow consumer silently loses stale
//     frames instead of building a queue.
// 2.  **Clear-on-Read**: `try_consume` moves the frame out of the slot. The same
//     publication can never be consumed twice, and an empty slot means "no fresh
//     frame", never "reuse the last one".
// 3.  **Short Critical Sections**: The driver's buffer is copied into an owned frame
//     before the lock is taken. Inside the lock there is only a slot swap, so the
//     producer never waits on vision processing and vice versa.
// 4.  **Independent Channels**: Color and depth each get their own mailbox and their
//     own lock. `FrameChannels` bundles the pair and is what the driver calls back into.

use crate::core_modules::frame::{ColorFrame, DepthFrame, Resolution};
use crate::interfaces::FrameCallbacks;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{trace, warn};

/// A thread-safe single-slot mailbox with newest-wins semantics.
pub struct FrameMailbox<F> {
    slot: Mutex<Option<F>>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl<F> Default for FrameMailbox<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> FrameMailbox<F> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    // A slot holds no invariant a panicking holder could break.
    fn lock(&self) -> MutexGuard<'_, Option<F>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the held frame and marks it fresh. Never blocks beyond the swap.
    pub fn publish(&self, frame: F) {
        let stale = self.lock().replace(frame);
        self.published.fetch_add(1, Ordering::Relaxed);
        if stale.is_some() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        // `stale` is freed here, outside the lock.
    }

    /// Takes the fresh frame if there is one.
    pub fn try_consume(&self) -> Option<F> {
        self.lock().take()
    }

    /// Whether a frame is waiting to be consumed. Diagnostics only: the answer can be
    /// stale by the time the caller acts on it, so consumers use `try_consume`.
    pub fn has_fresh(&self) -> bool {
        self.lock().is_some()
    }

    /// Total frames ever published.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Frames that were overwritten before anyone consumed them.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// The color and depth mailboxes for one session, registered with the camera driver.
pub struct FrameChannels {
    resolution: Resolution,
    color: FrameMailbox<ColorFrame>,
    depth: FrameMailbox<DepthFrame>,
    rejected: AtomicU64,
}

impl FrameChannels {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            resolution,
            color: FrameMailbox::new(),
            depth: FrameMailbox::new(),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn color(&self) -> &FrameMailbox<ColorFrame> {
        &self.color
    }

    pub fn depth(&self) -> &FrameMailbox<DepthFrame> {
        &self.depth
    }

    /// Driver buffers refused because their size did not match the session resolution.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    fn reject(&self, kind: &str, len: usize) {
        let count = self.rejected.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            kind,
            len,
            width = self.resolution.width,
            height = self.resolution.height,
            rejected = count,
            "dropping driver frame with unexpected size"
        );
    }
}

impl FrameCallbacks for FrameChannels {
    fn on_color_frame(&self, rgb: &[u8], timestamp: u32) {
        match self.resolution.color_from_raw(rgb) {
            Some(frame) => {
                trace!(timestamp, "color frame");
                self.color.publish(frame);
            }
            None => self.reject("color", rgb.len()),
        }
    }

    fn on_depth_frame(&self, depth: &[u16], timestamp: u32) {
        match self.resolution.depth_from_raw(depth) {
            Some(frame) => {
                trace!(timestamp, "depth frame");
                self.depth.publish(frame);
            }
            None => self.reject("depth", depth.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn empty_mailbox_yields_nothing() {
        let mailbox: FrameMailbox<u32> = FrameMailbox::new();
        assert_eq!(mailbox.try_consume(), None);
        assert!(!mailbox.has_fresh());
    }

    #[test]
    fn published_frame_is_consumed_exactly_once() {
        let mailbox = FrameMailbox::new();
        mailbox.publish(7u32);
        assert!(mailbox.has_fresh());
        assert_eq!(mailbox.try_consume(), Some(7));
        assert!(!mailbox.has_fresh());
        assert_eq!(mailbox.try_consume(), None);
    }

    #[test]
    fn newest_frame_wins() {
        let mailbox = FrameMailbox::new();
        mailbox.publish(1u32);
        mailbox.publish(2u32);
        mailbox.publish(3u32);
        assert_eq!(mailbox.try_consume(), Some(3));
        assert_eq!(mailbox.try_consume(), None);
        assert_eq!(mailbox.published(), 3);
        assert_eq!(mailbox.dropped(), 2);
    }

    #[test]
    fn concurrent_consumer_never_sees_a_frame_twice() {
        const FRAMES: u32 = 20_000;
        let mailbox = Arc::new(FrameMailbox::new());

        let producer = {
            let mailbox = Arc::clone(&mailbox);
            thread::spawn(move || {
                for i in 1..=FRAMES {
                    mailbox.publish(i);
                }
            })
        };

        let mut seen = Vec::new();
        while !producer.is_finished() || mailbox.has_fresh() {
            if let Some(frame) = mailbox.try_consume() {
                seen.push(frame);
            }
        }
        producer.join().unwrap();
        if let Some(frame) = mailbox.try_consume() {
            seen.push(frame);
        }

        assert!(seen.windows(2).all(|w| w[0] < w[1]), "frames repeated or reordered");
        assert_eq!(seen.last(), Some(&FRAMES));
        assert_eq!(
            mailbox.published() - mailbox.dropped(),
            seen.len() as u64
        );
    }

    #[test]
    fn callbacks_copy_into_the_matching_channel() {
        let channels = FrameChannels::new(Resolution::new(2, 2));
        channels.on_color_frame(&[9u8; 12], 1);
        channels.on_depth_frame(&[512u16; 4], 1);

        let color = channels.color().try_consume().unwrap();
        assert_eq!(color.get_pixel(1, 1).0, [9, 9, 9]);
        let depth = channels.depth().try_consume().unwrap();
        assert_eq!(depth.get_pixel(0, 1).0, [512]);
        assert!(channels.color().try_consume().is_none());
    }

    #[test]
    fn wrongly_sized_driver_buffers_are_rejected() {
        let channels = FrameChannels::new(Resolution::new(2, 2));
        channels.on_color_frame(&[0u8; 11], 1);
        channels.on_depth_frame(&[0u16; 5], 2);
        assert!(!channels.color().has_fresh());
        assert!(!channels.depth().has_fresh());
        assert_eq!(channels.rejected(), 2);
    }
}
