//! The processor engine: control store, data path, memory and run loop.

/// Single-microcycle execution.
mod cycle;
/// Cycle and time counters.
pub mod stats;

use std::time::{Duration, Instant, SystemTime};

pub use stats::{ExecutionStats, OPCODE_SLOTS};

use crate::microcode::layout::FETCH_START;
use crate::{
    CancellationToken, ControlStore, CycleOutcome, EngineConfig, EngineError, EventHub,
    ExecutionEvent, ExecutionEventKind, FramePacer, HaltSwitch, MemoryUnit, MicroInstruction,
    PerfEvent, RegisterFile, RunOutcome, RunState, StopReason,
};

/// One independent MIC-1 processor.
///
/// Engines share no state; any number may run concurrently on separate
/// threads.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    registers: RegisterFile,
    memory: MemoryUnit,
    store: ControlStore,
    run_state: RunState,
    stats: ExecutionStats,
    events: EventHub,
    halt_switch: HaltSwitch,
    frame_start: Option<Instant>,
}

#[derive(Debug, Clone, Copy)]
struct PerfMark {
    at: Instant,
    cycles: u64,
    processor_time: Duration,
}

impl Engine {
    /// Validates `config`, builds the control store and initialises state.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] for an invalid configuration or an
    /// inconsistent microprogram.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let store = ControlStore::build()?;
        let mut engine = Self {
            memory: MemoryUnit::with_protection(config.memory_bytes, config.protection()),
            config,
            registers: RegisterFile::default(),
            store,
            run_state: RunState::Running,
            stats: ExecutionStats::default(),
            events: EventHub::default(),
            halt_switch: HaltSwitch::default(),
            frame_start: None,
        };
        engine.init();
        Ok(engine)
    }

    /// Clears memory, registers, counters and any latched trap.
    pub fn init(&mut self) {
        self.registers.reset();
        if self.memory.size() == self.config.memory_bytes {
            self.memory.clear();
        } else {
            self.memory = MemoryUnit::new(self.config.memory_bytes);
        }
        self.memory.set_protection(self.config.protection());
        self.stats.reset();
        self.run_state = RunState::Running;
        if self.config.start_halted {
            self.halt_switch.stop();
        } else {
            self.halt_switch.start();
        }
        tracing::debug!(
            memory_bytes = self.config.memory_bytes,
            start_halted = self.config.start_halted,
            "engine initialised"
        );
    }

    /// Loads `boot` at `start_pc` and executes from there until `HALT`, a
    /// trap, or cancellation.
    ///
    /// With `clear_state` the engine is reinitialised first. Without it, a
    /// latched trap ends the run immediately. Control flags are observed
    /// once per frame.
    pub fn run(
        &mut self,
        cancel: &CancellationToken,
        clear_state: bool,
        start_pc: i32,
        boot: &[u8],
    ) -> RunOutcome {
        if clear_state {
            self.init();
        } else {
            self.memory.set_protection(self.config.protection());
        }
        let cycles_before = self.stats.cycle_count();

        if let RunState::TrapLatched(code) = self.run_state {
            tracing::warn!(trap = %code, "run refused while a trap is latched");
            return RunOutcome {
                reason: StopReason::Trapped(code),
                cycles: 0,
            };
        }
        if let Err(fault) = self.memory.load(start_pc, boot) {
            let code = fault.trap_code();
            self.raise_trap(
                code,
                format!("boot image does not fit: {fault}"),
                Some(format!("{} bytes at {start_pc:#06X}", boot.len())),
            );
            return RunOutcome {
                reason: StopReason::Trapped(code),
                cycles: 0,
            };
        }

        self.registers.pc = start_pc;
        self.registers.mpc = FETCH_START;
        self.run_state = RunState::Running;
        tracing::debug!(start_pc, boot_len = boot.len(), clear_state, "run started");
        self.emit_lifecycle(ExecutionEventKind::Started);

        let pacer = FramePacer::new(
            self.config.target_frequency_hz,
            self.config.refresh_rate_hz,
            self.config.unthrottled,
        );
        let perf_interval = Duration::from_secs(u64::from(self.config.perf_interval_secs));
        let mut perf_mark = self.perf_mark();

        let reason = loop {
            if cancel.is_cancelled() {
                self.stats
                    .finish_instruction(self.registers.current_opcode, self.config.detailed_stats);
                tracing::debug!(cycles = self.stats.cycle_count(), "run cancelled");
                break StopReason::Cancelled;
            }
            if self.halt_switch.is_stopped() {
                self.idle_for(pacer.frame_duration());
                continue;
            }
            if self.run_state == RunState::Idle {
                tracing::debug!("resumed");
                self.run_state = RunState::Running;
            }

            if let Some(reason) = self.run_frame(&pacer) {
                break reason;
            }
            if perf_mark.at.elapsed() >= perf_interval {
                self.report_perf(&mut perf_mark);
            }
        };

        RunOutcome {
            reason,
            cycles: self.stats.cycle_count() - cycles_before,
        }
    }

    /// Resumes a parked run loop without reinitialising.
    pub fn start(&self) {
        self.halt_switch.start();
    }

    /// Parks the run loop at the next frame boundary.
    pub fn stop(&self) {
        self.halt_switch.stop();
    }

    /// Shareable handle to this engine's idle/resume switch.
    #[must_use]
    pub fn halt_switch(&self) -> HaltSwitch {
        self.halt_switch.clone()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Toggles segment protection and stack-bound checks.
    pub fn set_memory_checking(&mut self, enabled: bool) {
        self.config.memory_checking = enabled;
        self.memory.set_protection(self.config.protection());
    }

    /// Toggles per-opcode cycle attribution.
    pub const fn set_detailed_stats(&mut self, enabled: bool) {
        self.config.detailed_stats = enabled;
    }

    /// Toggles per-microinstruction execution events.
    pub const fn set_execution_events(&mut self, enabled: bool) {
        self.config.execution_events = enabled;
    }

    /// Toggles frame pacing; takes effect at the next run.
    pub const fn set_unthrottled(&mut self, enabled: bool) {
        self.config.unthrottled = enabled;
    }

    /// Register file.
    #[must_use]
    pub const fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Mutable register file, for debuggers and tests.
    pub const fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    /// Memory unit.
    #[must_use]
    pub const fn memory(&self) -> &MemoryUnit {
        &self.memory
    }

    /// Mutable memory unit.
    pub const fn memory_mut(&mut self) -> &mut MemoryUnit {
        &mut self.memory
    }

    /// The microprogram.
    #[must_use]
    pub const fn control_store(&self) -> &ControlStore {
        &self.store
    }

    /// Current execution state.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// Counters since the last reinitialisation.
    #[must_use]
    pub const fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Subscriber registry.
    pub const fn events_mut(&mut self) -> &mut EventHub {
        &mut self.events
    }

    /// Executes up to one frame's budget. Returns the stop reason when the
    /// frame ended the run.
    fn run_frame(&mut self, pacer: &FramePacer) -> Option<StopReason> {
        let frame_start = Instant::now();
        self.frame_start = Some(frame_start);
        let mut stop = None;
        for _ in 0..pacer.cycles_per_frame() {
            match self.step() {
                CycleOutcome::Continue => {}
                CycleOutcome::Halted => {
                    stop = Some(StopReason::Halted);
                    break;
                }
                CycleOutcome::Trapped(code) => {
                    stop = Some(StopReason::Trapped(code));
                    break;
                }
            }
        }
        if stop.is_none() {
            pacer.wait_for_frame_end(frame_start);
        }
        self.frame_start = None;
        self.stats.add_processor_time(frame_start.elapsed());
        stop
    }

    fn idle_for(&mut self, slot: Duration) {
        if self.run_state != RunState::Idle {
            tracing::debug!(pc = self.registers.pc, "idle");
            self.run_state = RunState::Idle;
        }
        let idle_start = Instant::now();
        std::thread::sleep(slot);
        self.stats.add_idle_time(idle_start.elapsed());
    }

    fn perf_mark(&self) -> PerfMark {
        PerfMark {
            at: Instant::now(),
            cycles: self.stats.cycle_count(),
            processor_time: self.stats.processor_time(),
        }
    }

    fn report_perf(&mut self, mark: &mut PerfMark) {
        let event = PerfEvent {
            timestamp: SystemTime::now(),
            cycle_delta: self.stats.cycle_count() - mark.cycles,
            tick_delta: self.stats.processor_time().saturating_sub(mark.processor_time),
        };
        tracing::trace!(
            cycle_delta = event.cycle_delta,
            rate = event.cycles_per_second(),
            "performance report"
        );
        self.events.emit_perf(&event);
        *mark = self.perf_mark();
    }

    /// Processor time including the frame in progress.
    fn elapsed(&self) -> Duration {
        self.stats.processor_time()
            + self
                .frame_start
                .map_or(Duration::ZERO, |start| start.elapsed())
    }

    fn emit_lifecycle(&mut self, kind: ExecutionEventKind) {
        if self.events.has_execution_subscribers() {
            self.emit_execution(kind, None);
        }
    }

    fn emit_execution(
        &mut self,
        kind: ExecutionEventKind,
        microinstruction: Option<MicroInstruction>,
    ) {
        let event = ExecutionEvent {
            kind,
            microinstruction,
            mpc: self.registers.mpc,
            cycle_count: self.stats.cycle_count(),
            ijvm_cycle_count: self.stats.ijvm_cycle_count(),
            elapsed: self.elapsed(),
        };
        self.events.emit_execution(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::Engine;
    use crate::{ConfigError, EngineConfig, EngineError, RunState};

    #[test]
    fn new_engine_starts_reset() {
        let engine = Engine::new(EngineConfig::default()).expect("default config is valid");
        assert_eq!(engine.registers().sp, 0xFFFF);
        assert_eq!(engine.registers().mpc, 0);
        assert_eq!(engine.run_state(), RunState::Running);
        assert_eq!(engine.stats().cycle_count(), 0);
        assert_eq!(engine.memory().size(), 0x1_0000);
        assert!(engine.run_state().latched_trap().is_none());
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = EngineConfig {
            refresh_rate_hz: 0,
            ..EngineConfig::default()
        };
        assert_eq!(
            Engine::new(config).err(),
            Some(EngineError::Config(ConfigError::ZeroRefreshRate))
        );
    }

    #[test]
    fn start_halted_engines_begin_parked() {
        let engine = Engine::new(EngineConfig {
            start_halted: true,
            ..EngineConfig::default()
        })
        .expect("valid config");
        assert!(engine.halt_switch().is_stopped());
        engine.start();
        assert!(!engine.halt_switch().is_stopped());
    }

    #[test]
    fn toggles_reach_memory_protection() {
        let mut engine = Engine::new(EngineConfig::default()).expect("valid config");
        engine.set_memory_checking(false);
        assert!(!engine.memory().protection().checking_enabled);
        assert!(!engine.config().memory_checking);
    }
}
