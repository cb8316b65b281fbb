//! Host-facing configuration, run control, and outcome types.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::{
    ControlStoreError, ProtectionFlags, TrapCode, DEFAULT_MEMORY_BYTES,
    DEFAULT_REFRESH_RATE_HZ, DEFAULT_TARGET_FREQUENCY_HZ,
};

/// Default seconds between performance reports.
pub const DEFAULT_PERF_INTERVAL_SECS: u8 = 1;
/// Accepted range for the performance report interval.
pub const PERF_INTERVAL_SECS_RANGE: RangeInclusive<u8> = 1..=10;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EngineConfig {
    /// Size of the backing store in bytes.
    pub memory_bytes: usize,
    /// Emulated clock frequency for throttled runs.
    pub target_frequency_hz: u32,
    /// Frames per second; the run loop checks its control flags once per frame.
    pub refresh_rate_hz: u32,
    /// Run frames back to back instead of pacing them.
    pub unthrottled: bool,
    /// Enforce segment protection and stack bounds.
    pub memory_checking: bool,
    /// Attribute cycles to opcodes.
    pub detailed_stats: bool,
    /// Emit per-microinstruction execution events.
    pub execution_events: bool,
    /// Begin every run idle until [`HaltSwitch::start`] is called.
    pub start_halted: bool,
    /// Seconds between performance reports.
    pub perf_interval_secs: u8,
    /// Permit instruction fetches from the data segment.
    pub allow_execute_from_data: bool,
    /// Permit instruction fetches from the stack segment.
    pub allow_execute_from_stack: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            memory_bytes: DEFAULT_MEMORY_BYTES,
            target_frequency_hz: DEFAULT_TARGET_FREQUENCY_HZ,
            refresh_rate_hz: DEFAULT_REFRESH_RATE_HZ,
            unthrottled: false,
            memory_checking: true,
            detailed_stats: false,
            execution_events: false,
            start_halted: false,
            perf_interval_secs: DEFAULT_PERF_INTERVAL_SECS,
            allow_execute_from_data: false,
            allow_execute_from_stack: false,
        }
    }
}

impl EngineConfig {
    /// Checks the configuration for values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_bytes == 0 {
            return Err(ConfigError::EmptyMemory);
        }
        if i32::try_from(self.memory_bytes).is_err() {
            return Err(ConfigError::MemoryTooLarge {
                bytes: self.memory_bytes,
            });
        }
        if self.target_frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        if self.refresh_rate_hz == 0 {
            return Err(ConfigError::ZeroRefreshRate);
        }
        if self.refresh_rate_hz > self.target_frequency_hz {
            return Err(ConfigError::RefreshExceedsFrequency {
                refresh_rate_hz: self.refresh_rate_hz,
                target_frequency_hz: self.target_frequency_hz,
            });
        }
        if !PERF_INTERVAL_SECS_RANGE.contains(&self.perf_interval_secs) {
            return Err(ConfigError::PerfIntervalOutOfRange {
                secs: self.perf_interval_secs,
            });
        }
        Ok(())
    }

    /// Protection switches handed to the memory unit.
    #[must_use]
    pub const fn protection(&self) -> ProtectionFlags {
        ProtectionFlags {
            checking_enabled: self.memory_checking,
            allow_execute_from_data: self.allow_execute_from_data,
            allow_execute_from_stack: self.allow_execute_from_stack,
        }
    }
}

/// Rejected configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ConfigError {
    /// Memory size is zero.
    #[error("memory size must be positive")]
    EmptyMemory,
    /// Memory is not addressable with 32-bit signed addresses.
    #[error("memory size {bytes} exceeds the addressable range")]
    MemoryTooLarge {
        /// Requested size.
        bytes: usize,
    },
    /// Clock frequency is zero.
    #[error("target frequency must be positive")]
    ZeroFrequency,
    /// Refresh rate is zero.
    #[error("refresh rate must be positive")]
    ZeroRefreshRate,
    /// More frames than cycles per second.
    #[error("refresh rate {refresh_rate_hz} Hz exceeds target frequency {target_frequency_hz} Hz")]
    RefreshExceedsFrequency {
        /// Requested refresh rate.
        refresh_rate_hz: u32,
        /// Requested frequency.
        target_frequency_hz: u32,
    },
    /// Report interval outside `1..=10` seconds.
    #[error("performance interval {secs}s outside 1..=10")]
    PerfIntervalOutOfRange {
        /// Requested interval.
        secs: u8,
    },
}

/// Engine construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Inconsistent microprogram.
    #[error(transparent)]
    ControlStore(#[from] ControlStoreError),
}

/// Cooperative cancellation flag shared between a run and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; observed at the next frame boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// `true` once [`Self::cancel`] was called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Cross-thread idle/resume switch of one engine.
#[derive(Debug, Clone, Default)]
pub struct HaltSwitch {
    idle: Arc<AtomicBool>,
}

impl HaltSwitch {
    /// Parks the run loop at the next frame boundary.
    pub fn stop(&self) {
        self.idle.store(true, Ordering::Release);
    }

    /// Resumes a parked run loop without reinitialising.
    pub fn start(&self) {
        self.idle.store(false, Ordering::Release);
    }

    /// `true` while the run loop is asked to stay parked.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.idle.load(Ordering::Acquire)
    }
}

/// Result of executing one microcycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CycleOutcome {
    /// Microinstruction executed; more follow.
    Continue,
    /// `HALT` reached.
    Halted,
    /// Fault trap raised or still latched.
    Trapped(TrapCode),
}

/// Why a run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum StopReason {
    /// Program reached `HALT`.
    Halted,
    /// A fault trap ended the run.
    Trapped(TrapCode),
    /// The cancellation token fired.
    Cancelled,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RunOutcome {
    /// Why the run returned.
    pub reason: StopReason,
    /// Microcycles executed by this run.
    pub cycles: u64,
}

impl RunOutcome {
    /// `true` when the program reached `HALT`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.reason, StopReason::Halted)
    }

    /// The trap that ended the run, if any.
    #[must_use]
    pub const fn trap(&self) -> Option<TrapCode> {
        match self.reason {
            StopReason::Trapped(code) => Some(code),
            StopReason::Halted | StopReason::Cancelled => None,
        }
    }
}
