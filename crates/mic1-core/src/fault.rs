use thiserror::Error;

use crate::memory::MemoryRegion;

/// Coarse trap grouping used for logging policy and host reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TrapClass {
    /// Program reached `HALT`.
    Normal,
    /// Stack pointer left the stack segment.
    Stack,
    /// Memory bounds or protection violation.
    Memory,
    /// Control store reached an unpopulated slot.
    Microcode,
}

/// Stable trap taxonomy reported through trap events and run outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum TrapCode {
    /// Normal termination at the `HALT` slot.
    #[error("halt")]
    Halt = 0x01,
    /// `SP` dropped below the start of the stack segment.
    #[error("stack overflow")]
    StackOverflow = 0x02,
    /// `SP` rose above the end of the stack segment.
    #[error("stack underflow")]
    StackUnderflow = 0x03,
    /// Access outside the backing store.
    #[error("segmentation fault")]
    SegmentationFault = 0x06,
    /// `MPC` selected a control-store slot with no microinstruction.
    #[error("invalid microcode address")]
    InvalidMicrocodeAddress = 0x0D,
    /// Write into the code segment while protection is enabled.
    #[error("write protection fault")]
    WriteProtectionFault = 0x0E,
    /// Instruction fetch from a segment that does not allow execution.
    #[error("invalid execution region")]
    InvalidExecutionRegion = 0x0F,
}

impl TrapCode {
    /// Every defined trap code in ascending numeric order.
    pub const ALL: [Self; 7] = [
        Self::Halt,
        Self::StackOverflow,
        Self::StackUnderflow,
        Self::SegmentationFault,
        Self::InvalidMicrocodeAddress,
        Self::WriteProtectionFault,
        Self::InvalidExecutionRegion,
    ];

    /// Converts a trap code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a trap code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::Halt),
            0x02 => Some(Self::StackOverflow),
            0x03 => Some(Self::StackUnderflow),
            0x06 => Some(Self::SegmentationFault),
            0x0D => Some(Self::InvalidMicrocodeAddress),
            0x0E => Some(Self::WriteProtectionFault),
            0x0F => Some(Self::InvalidExecutionRegion),
            _ => None,
        }
    }

    /// Returns the reporting class of this trap.
    #[must_use]
    pub const fn class(self) -> TrapClass {
        match self {
            Self::Halt => TrapClass::Normal,
            Self::StackOverflow | Self::StackUnderflow => TrapClass::Stack,
            Self::SegmentationFault | Self::WriteProtectionFault | Self::InvalidExecutionRegion => {
                TrapClass::Memory
            }
            Self::InvalidMicrocodeAddress => TrapClass::Microcode,
        }
    }

    /// `true` only for the successful-termination trap.
    #[must_use]
    pub const fn is_normal(self) -> bool {
        matches!(self, Self::Halt)
    }
}

/// Low-level memory unit fault.
///
/// Faults never escape a run: the engine converts each one into the matching
/// [`TrapCode`] through [`MemoryFault::trap_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MemoryFault {
    /// Byte access outside the backing store.
    #[error("byte memory access violation (address {addr:#06X})")]
    ByteOutOfBounds {
        /// Requested byte address.
        addr: i32,
    },
    /// Half-word or word access outside the backing store.
    #[error("word memory access violation (address {addr:#06X})")]
    WordOutOfBounds {
        /// Requested word address.
        addr: i32,
    },
    /// Write into the code segment.
    #[error("write to protected code segment (address {addr:#06X})")]
    WriteProtect {
        /// Requested write address.
        addr: i32,
    },
    /// Instruction fetch from a non-executable segment.
    #[error("execution not allowed from {region} segment (address {addr:#06X})")]
    ExecutionProtection {
        /// Requested fetch address.
        addr: i32,
        /// Segment holding `addr`.
        region: MemoryRegion,
    },
}

impl MemoryFault {
    /// Maps the fault onto the trap reported to hosts.
    #[must_use]
    pub const fn trap_code(self) -> TrapCode {
        match self {
            Self::ByteOutOfBounds { .. } | Self::WordOutOfBounds { .. } => {
                TrapCode::SegmentationFault
            }
            Self::WriteProtect { .. } => TrapCode::WriteProtectionFault,
            Self::ExecutionProtection { .. } => TrapCode::InvalidExecutionRegion,
        }
    }

    /// Address that caused the fault.
    #[must_use]
    pub const fn address(self) -> i32 {
        match self {
            Self::ByteOutOfBounds { addr }
            | Self::WordOutOfBounds { addr }
            | Self::WriteProtect { addr }
            | Self::ExecutionProtection { addr, .. } => addr,
        }
    }
}
