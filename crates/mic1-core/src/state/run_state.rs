use crate::TrapCode;

/// Execution state of the engine as seen by hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next microinstruction.
    #[default]
    Running,
    /// Parked by the operator; resumes without reinitialising.
    Idle,
    /// `HALT` was reached.
    Halted,
    /// A fault trap is latched; only reinitialisation clears it.
    TrapLatched(TrapCode),
}

impl RunState {
    /// Returns the latched fault trap, if any.
    #[must_use]
    pub const fn latched_trap(self) -> Option<TrapCode> {
        match self {
            Self::TrapLatched(code) => Some(code),
            Self::Running | Self::Idle | Self::Halted => None,
        }
    }

    /// `true` once execution stopped for good (halt or trap).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Halted | Self::TrapLatched(_))
    }
}
