// THEORY:
// This file is the entry point for the `pendulum_vision` library crate. It exposes
// the tracking engine for a two-marker pendulum rig: a camera driver pushes frames
// into `FrameChannels`, and a `CycleDriver` pulls the newest one on a fixed cadence,
// runs it through the `TrackingPipeline` and hands the pendulum's position relative
// to the end effector to a `Publisher`.
//
// Hardware, windows and transport stay outside the crate behind the traits in
// `interfaces`. The `SyntheticRig` is the one camera that ships with the library so
// the engine can run and be tested without a sensor attached.

pub mod config;
pub mod core_modules;
pub mod cycle_driver;
pub mod interfaces;
pub mod pipeline;
pub mod synthetic_rig;

pub use config::TrackerConfig;
pub use core_modules::frame::{ColorFrame, DepthFrame, Mask, Resolution};
pub use core_modules::frame_channel::FrameChannels;
pub use core_modules::geometry::Point2;
pub use core_modules::role_disambiguator::{TrackedPair, TrackingFailure};
pub use core_modules::segmenter::ColorRange;
pub use cycle_driver::{CycleDriver, CycleReport, CycleStats};
pub use pipeline::{Blob, FrameAnalysis, RelativePosition, TrackingPipeline};
pub use synthetic_rig::SyntheticRig;
