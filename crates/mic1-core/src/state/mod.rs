//! Data-path register state and engine run state.

/// Register file, B-bus sources and load masks.
pub mod registers;
/// Host-visible execution state.
pub mod run_state;

pub use registers::{BSource, LoadMask, RegisterFile};
pub use run_state::RunState;
