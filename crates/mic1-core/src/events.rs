//! Observable engine events and the subscriber hub.
//!
//! Subscribers are plain closures invoked synchronously on the thread that
//! drives the engine, in registration order. They receive shared references
//! only and cannot reach back into the engine.

use std::time::{Duration, SystemTime};

use crate::{MicroInstruction, RegisterFile, TrapCode};

/// Kind of an [`ExecutionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExecutionEventKind {
    /// A run began executing.
    Started,
    /// A microinstruction is about to execute.
    InstructionStarted,
    /// A microinstruction finished executing.
    InstructionEnded,
    /// A run reached `HALT`.
    Halted,
}

/// Lifecycle or per-microinstruction notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExecutionEvent {
    /// Event kind.
    pub kind: ExecutionEventKind,
    /// Microinstruction concerned, for per-instruction events.
    pub microinstruction: Option<MicroInstruction>,
    /// Control-store address of `microinstruction`.
    pub mpc: u16,
    /// Microcycles executed so far.
    pub cycle_count: u64,
    /// IJVM instructions begun so far.
    pub ijvm_cycle_count: u64,
    /// Processor time accumulated so far.
    pub elapsed: Duration,
}

/// Early termination or `HALT` report; exactly one per terminating run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TrapEvent {
    /// Cause.
    pub trap_code: TrapCode,
    /// Human-readable description.
    pub message: String,
    /// Extra context, such as the faulting address.
    pub information: Option<String>,
    /// Register file at the moment of the trap.
    pub registers: RegisterFile,
    /// Wall-clock time of the trap.
    pub timestamp: SystemTime,
}

/// Periodic throughput report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct PerfEvent {
    /// Wall-clock time of the report.
    pub timestamp: SystemTime,
    /// Microcycles executed since the previous report.
    pub cycle_delta: u64,
    /// Processor time elapsed since the previous report.
    pub tick_delta: Duration,
}

impl PerfEvent {
    /// Achieved clock rate over the reporting window.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cycles_per_second(&self) -> f64 {
        let seconds = self.tick_delta.as_secs_f64();
        if seconds > 0.0 {
            self.cycle_delta as f64 / seconds
        } else {
            0.0
        }
    }
}

/// Handle returned by subscription; pass to [`EventHub::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<E> = Box<dyn FnMut(&E) + Send>;

struct Subscribers<E> {
    entries: Vec<(SubscriptionId, Callback<E>)>,
}

impl<E> Default for Subscribers<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<E> Subscribers<E> {
    fn emit(&mut self, event: &E) {
        for (_, callback) in &mut self.entries {
            callback(event);
        }
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Subscriber registry for the three event streams.
#[derive(Default)]
pub struct EventHub {
    next_id: u64,
    execution: Subscribers<ExecutionEvent>,
    trap: Subscribers<TrapEvent>,
    perf: Subscribers<PerfEvent>,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("execution", &self.execution.entries.len())
            .field("trap", &self.trap.entries.len())
            .field("perf", &self.perf.entries.len())
            .finish()
    }
}

impl EventHub {
    /// Subscribes to execution events.
    pub fn on_execution(
        &mut self,
        callback: impl FnMut(&ExecutionEvent) + Send + 'static,
    ) -> SubscriptionId {
        let id = self.allocate_id();
        self.execution.entries.push((id, Box::new(callback)));
        id
    }

    /// Subscribes to trap events.
    pub fn on_trap(&mut self, callback: impl FnMut(&TrapEvent) + Send + 'static) -> SubscriptionId {
        let id = self.allocate_id();
        self.trap.entries.push((id, Box::new(callback)));
        id
    }

    /// Subscribes to performance reports.
    pub fn on_perf(&mut self, callback: impl FnMut(&PerfEvent) + Send + 'static) -> SubscriptionId {
        let id = self.allocate_id();
        self.perf.entries.push((id, Box::new(callback)));
        id
    }

    /// Removes a subscription from whichever stream holds it. Returns
    /// `false` for an unknown id.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.execution.remove(id) || self.trap.remove(id) || self.perf.remove(id)
    }

    /// `true` when anyone listens to execution events.
    #[must_use]
    pub fn has_execution_subscribers(&self) -> bool {
        !self.execution.is_empty()
    }

    pub(crate) fn emit_execution(&mut self, event: &ExecutionEvent) {
        self.execution.emit(event);
    }

    pub(crate) fn emit_trap(&mut self, event: &TrapEvent) {
        self.trap.emit(event);
    }

    pub(crate) fn emit_perf(&mut self, event: &PerfEvent) {
        self.perf.emit(event);
    }

    fn allocate_id(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        id
    }
}
