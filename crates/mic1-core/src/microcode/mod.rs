//! Microinstruction format and the built-in microprogram.

/// Control-store construction and validation.
pub mod builder;
/// Control-store address map.
pub mod layout;
/// IJVM opcode set.
pub mod opcode;

use std::fmt;

pub use builder::{ControlStore, ControlStoreError};
pub use opcode::Opcode;

use crate::{AluOp, AluOutput, BSource, LoadMask};
use layout::{ADDRESS_MASK, JUMP_TABLE_START};

/// Memory transfer started by a microinstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemOp {
    /// No transfer.
    #[default]
    NoOp,
    /// High half of the word at `MAR` into the upper 16 bits of `MDR`.
    ReadWordHigh,
    /// Low half of the word at `MAR` into the lower 16 bits of `MDR`.
    ReadWordLow,
    /// Upper 16 bits of `MDR` into the high half of the word at `MAR`.
    WriteWordHigh,
    /// Lower 16 bits of `MDR` into the low half of the word at `MAR`.
    WriteWordLow,
    /// Byte at `MAR` into `MBR`.
    ReadByte,
    /// `MBR` into the byte at `MAR`.
    WriteByte,
}

/// Whether the memory transfer sees registers before or after the C-bus latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum WriteOrder {
    /// Latch registers first; the transfer uses the new `MAR`/`MDR`.
    #[default]
    RegistersThenMemory,
    /// Transfer first with the old `MAR`/`MDR`, then latch registers.
    MemoryThenRegisters,
}

/// Conditional sequencing bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Jam(u8);

impl Jam {
    /// Unconditional successor.
    pub const NONE: Self = Self(0);
    /// OR `MBR` into the next address (opcode dispatch).
    pub const JAMC: Self = Self(1 << 0);
    /// OR the jump-table base into the next address when the ALU result is zero.
    pub const JAMZ_EQ: Self = Self(1 << 1);
    /// OR the jump-table base into the next address when the ALU result is non-zero.
    pub const JAMZ_NE: Self = Self(1 << 2);

    /// `true` when every bit of `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// `true` for either zero-test bit.
    #[must_use]
    pub const fn is_conditional(self) -> bool {
        self.contains(Self::JAMZ_EQ) || self.contains(Self::JAMZ_NE)
    }

    /// Raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Routine a control-store slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Routine {
    /// Instruction fetch and dispatch.
    Fetch,
    /// Shared tail that refreshes `TOS` from the word at `SP`.
    ReloadTos,
    /// Shared branch routine reached by `GOTO` and taken conditionals.
    Branch,
    /// Body of one opcode.
    Opcode(Opcode),
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch => f.write_str("FETCH"),
            Self::ReloadTos => f.write_str("RELOAD_TOS"),
            Self::Branch => f.write_str("BRANCH"),
            Self::Opcode(opcode) => write!(f, "{opcode}"),
        }
    }
}

/// One control word of the microprogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MicroInstruction {
    /// Base successor address before JAM bits apply.
    pub next_address: u16,
    /// Conditional sequencing bits.
    pub jam: Jam,
    /// ALU function.
    pub alu: AluOp,
    /// Registers latching the ALU result.
    pub load: LoadMask,
    /// Memory transfer.
    pub mem: MemOp,
    /// Register driving the B bus.
    pub b_source: BSource,
    /// Ordering of the memory transfer against the register latch.
    pub order: WriteOrder,
    /// Owning routine.
    pub routine: Routine,
    /// Register-transfer notation for traces.
    pub label: &'static str,
}

impl MicroInstruction {
    /// Resolves the successor address from this cycle's ALU output and `MBR`.
    #[must_use]
    #[allow(
        clippy::cast_lossless,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub const fn successor(&self, alu: AluOutput, mbr: u8) -> u16 {
        let mut next = if self.load.contains(LoadMask::MPC) {
            (alu.result as u16) & ADDRESS_MASK
        } else {
            self.next_address
        };
        if self.jam.contains(Jam::JAMC) {
            next |= mbr as u16;
        }
        if (self.jam.contains(Jam::JAMZ_EQ) && alu.is_zero)
            || (self.jam.contains(Jam::JAMZ_NE) && !alu.is_zero)
        {
            next |= JUMP_TABLE_START;
        }
        next & ADDRESS_MASK
    }

    /// `true` for the byte read of the fetch routine, which is subject to
    /// execution protection and records the current opcode.
    #[must_use]
    pub const fn is_instruction_fetch(&self) -> bool {
        matches!(self.routine, Routine::Fetch) && matches!(self.mem, MemOp::ReadByte)
    }
}

impl fmt::Display for MicroInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.routine, self.label)
    }
}
