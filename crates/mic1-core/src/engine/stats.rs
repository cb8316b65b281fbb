use std::time::Duration;

/// Number of distinct opcode bytes.
pub const OPCODE_SLOTS: usize = 256;

/// Counters accumulated by the engine since the last reinitialisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionStats {
    cycle_count: u64,
    ijvm_cycle_count: u64,
    processor_time: Duration,
    idle_time: Duration,
    opcode_cycles: Box<[u64; OPCODE_SLOTS]>,
    instruction_cycles: u64,
}

impl Default for ExecutionStats {
    fn default() -> Self {
        Self {
            cycle_count: 0,
            ijvm_cycle_count: 0,
            processor_time: Duration::ZERO,
            idle_time: Duration::ZERO,
            opcode_cycles: Box::new([0; OPCODE_SLOTS]),
            instruction_cycles: 0,
        }
    }
}

impl ExecutionStats {
    /// Microcycles executed.
    #[must_use]
    pub const fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// IJVM instructions begun.
    #[must_use]
    pub const fn ijvm_cycle_count(&self) -> u64 {
        self.ijvm_cycle_count
    }

    /// Wall-clock time spent executing frames.
    #[must_use]
    pub const fn processor_time(&self) -> Duration {
        self.processor_time
    }

    /// Wall-clock time spent parked.
    #[must_use]
    pub const fn idle_time(&self) -> Duration {
        self.idle_time
    }

    /// Processor plus idle time.
    #[must_use]
    pub fn total_elapsed(&self) -> Duration {
        self.processor_time + self.idle_time
    }

    /// Cycles attributed to `opcode`; populated only with detailed stats.
    #[must_use]
    pub fn opcode_cycles(&self, opcode: u8) -> u64 {
        self.opcode_cycles[usize::from(opcode)]
    }

    /// Cycles per opcode byte.
    #[must_use]
    pub fn opcode_histogram(&self) -> &[u64; OPCODE_SLOTS] {
        &self.opcode_cycles
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }

    /// Counts one microcycle. A cycle at the fetch entry closes the previous
    /// instruction, whose cycles go to `previous_opcode`.
    pub(crate) fn record_cycle(&mut self, fetch_start: bool, previous_opcode: u8, detailed: bool) {
        if fetch_start {
            self.finish_instruction(previous_opcode, detailed);
            self.ijvm_cycle_count += 1;
        }
        self.cycle_count += 1;
        self.instruction_cycles += 1;
    }

    pub(crate) fn finish_instruction(&mut self, opcode: u8, detailed: bool) {
        if detailed {
            self.opcode_cycles[usize::from(opcode)] += self.instruction_cycles;
        }
        self.instruction_cycles = 0;
    }

    pub(crate) fn add_processor_time(&mut self, elapsed: Duration) {
        self.processor_time += elapsed;
    }

    pub(crate) fn add_idle_time(&mut self, elapsed: Duration) {
        self.idle_time += elapsed;
    }
}
