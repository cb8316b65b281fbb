//! Microprogrammed MIC-1 processor core executing IJVM stack code.
//!
//! An [`Engine`] owns a 512-slot control store, a 32-bit register file, an
//! ALU and a segmented byte-addressable memory. Each call to
//! [`Engine::step`] executes one microinstruction; [`Engine::run`] drives
//! whole programs in frames, optionally paced to a target clock rate.

/// Segmented memory and protection policy.
pub mod memory;
pub use memory::{
    decode_memory_region, validate_fetch_access, validate_write_access, MemoryRegion, MemoryUnit,
    ProtectionFlags, RegionDescriptor, CODE_END, CODE_START, DATA_END, DATA_START,
    DEFAULT_MEMORY_BYTES, FIXED_MEMORY_REGIONS, HALF_WORD_BYTES, STACK_END, STACK_START,
    WORD_BYTES,
};

/// Register file and run state.
pub mod state;
pub use state::{BSource, LoadMask, RegisterFile, RunState};

/// Trap taxonomy and memory faults.
pub mod fault;
pub use fault::{MemoryFault, TrapClass, TrapCode};

/// Data-path ALU.
pub mod alu;
pub use alu::{calculate, AluOp, AluOutput};

/// Microinstruction format, opcode set and control store.
pub mod microcode;
pub use microcode::{
    ControlStore, ControlStoreError, Jam, MemOp, MicroInstruction, Opcode, Routine, WriteOrder,
};

/// Frame pacing for throttled runs.
pub mod timing;
pub use timing::{
    FramePacer, DEFAULT_REFRESH_RATE_HZ, DEFAULT_TARGET_FREQUENCY_HZ, UNTHROTTLED_FRAME_CYCLES,
};

/// Observable events and subscriptions.
pub mod events;
pub use events::{
    EventHub, ExecutionEvent, ExecutionEventKind, PerfEvent, SubscriptionId, TrapEvent,
};

/// Configuration, run control and outcomes.
pub mod api;
pub use api::{
    CancellationToken, ConfigError, CycleOutcome, EngineConfig, EngineError, HaltSwitch,
    RunOutcome, StopReason, DEFAULT_PERF_INTERVAL_SECS, PERF_INTERVAL_SECS_RANGE,
};

/// The processor engine.
pub mod engine;
pub use engine::{Engine, ExecutionStats, OPCODE_SLOTS};

#[cfg(feature = "serde")]
use serde as _;
