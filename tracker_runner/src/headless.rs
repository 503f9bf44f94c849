// Stand-ins for the OpenCV window and trackbars when running without a screen.

use anyhow::{Context, Result, bail};
use pendulum_vision::interfaces::{Display, RangeSource, WatchRange};
use pendulum_vision::{ColorFrame, ColorRange, Mask};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, info, warn};

/// Writes each window's latest image to `<dir>/<window>.png` every `every` frames.
pub struct SnapshotDisplay {
    dir: PathBuf,
    every: u64,
    shown: HashMap<String, u64>,
}

impl SnapshotDisplay {
    pub fn new(dir: &Path, every: u64) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating snapshot directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            every: every.max(1),
            shown: HashMap::new(),
        })
    }

    /// The dump path, when this show of `window` is due to be written.
    fn due(&mut self, window: &str) -> Option<PathBuf> {
        let count = self.shown.entry(window.to_string()).or_insert(0);
        *count += 1;
        ((*count - 1) % self.every == 0).then(|| self.dir.join(format!("{window}.png")))
    }
}

impl Display for SnapshotDisplay {
    fn show_color(&mut self, window: &str, frame: &ColorFrame) {
        if let Some(path) = self.due(window) {
            if let Err(e) = frame.save(&path) {
                warn!(path = %path.display(), error = %e, "window dump failed");
            }
        }
    }

    fn show_gray(&mut self, window: &str, frame: &Mask) {
        if let Some(path) = self.due(window) {
            if let Err(e) = frame.save(&path) {
                warn!(path = %path.display(), error = %e, "window dump failed");
            }
        }
    }

    fn poll_key(&mut self) -> Option<i32> {
        None
    }
}

/// Parses `lowR lowG lowB highR highG highB`, each 0 to 255.
pub fn parse_range(line: &str) -> Result<ColorRange> {
    let values = line
        .split_whitespace()
        .map(|v| v.parse::<u8>().with_context(|| format!("`{v}` is not a value in 0..=255")))
        .collect::<Result<Vec<u8>>>()?;
    let &[lr, lg, lb, hr, hg, hb] = values.as_slice() else {
        bail!("expected six values, got {}", values.len());
    };
    Ok(ColorRange::new([lr, lg, lb], [hr, hg, hb]))
}

/// Calibration sliders typed on stdin, one line of six values per update.
pub struct StdinRangeSource {
    inner: WatchRange,
}

impl StdinRangeSource {
    /// Starts a reader thread that feeds every valid line into the range.
    pub fn spawn(initial: ColorRange) -> Result<Self> {
        let (sender, inner) = WatchRange::new(initial);
        thread::Builder::new()
            .name("stdin-sliders".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_range(&line) {
                        Ok(range) => {
                            info!(?range, "color range updated");
                            if sender.send(range).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!(error = %e, "ignoring slider line"),
                    }
                }
                debug!("stdin closed, sliders frozen");
            })
            .context("spawning stdin slider thread")?;
        info!("type `lowR lowG lowB highR highG highB` to adjust the color range");
        Ok(Self { inner })
    }
}

impl RangeSource for StdinRangeSource {
    fn current_range(&mut self) -> ColorRange {
        self.inner.current_range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slider_lines_parse_in_low_then_high_order() {
        let range = parse_range("0 64 0  255 241 38").unwrap();
        assert_eq!(range, ColorRange::default());
        assert!(parse_range("1 2 3").is_err());
        assert!(parse_range("1 2 3 4 5 256").is_err());
        assert!(parse_range("a b c d e f").is_err());
    }

    #[test]
    fn windows_are_dumped_every_nth_show() {
        let dir = std::env::temp_dir().join(format!("pv-headless-{}", std::process::id()));
        let mut display = SnapshotDisplay::new(&dir, 3).unwrap();
        let path = dir.join("filteredImg.png");

        display.show_gray("filteredImg", &Mask::new(4, 4));
        assert!(path.exists());
        std::fs::remove_file(&path).unwrap();

        display.show_gray("filteredImg", &Mask::new(4, 4));
        display.show_gray("filteredImg", &Mask::new(4, 4));
        assert!(!path.exists());
        display.show_gray("filteredImg", &Mask::new(4, 4));
        assert!(path.exists());

        display.show_color("rgb", &ColorFrame::new(4, 4));
        assert!(dir.join("rgb.png").exists());
        assert_eq!(display.poll_key(), None);

        std::fs::remove_dir_all(&dir).ok();
    }
}
