//! Frame pacing for throttled execution.
//!
//! The run loop executes one frame's cycle budget at a time. Throttled runs
//! then busy-wait until the frame's wall-clock slot has elapsed, so the
//! average rate tracks the configured clock frequency.

use std::time::{Duration, Instant};

/// Default emulated clock frequency.
pub const DEFAULT_TARGET_FREQUENCY_HZ: u32 = 1_000_000;
/// Default number of frames per second.
pub const DEFAULT_REFRESH_RATE_HZ: u32 = 30;
/// Cycle budget of one unthrottled frame; bounds cancellation latency.
pub const UNTHROTTLED_FRAME_CYCLES: u64 = 1 << 16;

/// Per-frame cycle budget and wall-clock slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramePacer {
    cycles_per_frame: u64,
    frame_duration: Duration,
    throttled: bool,
}

impl FramePacer {
    /// Pacer for `target_frequency_hz` split into `refresh_rate_hz` frames.
    ///
    /// Zero rates are clamped to one.
    #[must_use]
    pub fn new(target_frequency_hz: u32, refresh_rate_hz: u32, unthrottled: bool) -> Self {
        let refresh = u64::from(refresh_rate_hz.max(1));
        let frequency = u64::from(target_frequency_hz.max(1));
        let frame_duration = Duration::from_nanos(1_000_000_000 / refresh);
        if unthrottled {
            Self {
                cycles_per_frame: UNTHROTTLED_FRAME_CYCLES,
                frame_duration,
                throttled: false,
            }
        } else {
            Self {
                cycles_per_frame: (frequency / refresh).max(1),
                frame_duration,
                throttled: true,
            }
        }
    }

    /// Cycles executed per frame.
    #[must_use]
    pub const fn cycles_per_frame(&self) -> u64 {
        self.cycles_per_frame
    }

    /// Wall-clock length of one frame.
    #[must_use]
    pub const fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// `false` when frames run back to back.
    #[must_use]
    pub const fn is_throttled(&self) -> bool {
        self.throttled
    }

    /// Spins until the frame that began at `frame_start` is over. Returns
    /// immediately when unthrottled or already late.
    pub fn wait_for_frame_end(&self, frame_start: Instant) {
        if !self.throttled {
            return;
        }
        let deadline = frame_start + self.frame_duration;
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}
