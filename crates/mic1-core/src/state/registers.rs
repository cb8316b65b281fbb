use std::ops::BitOr;

use crate::memory::STACK_END;

/// Register file of the data path.
///
/// All data registers are 32-bit signed. `MBR` holds the last byte read,
/// `MPC` the control-store address of the next microinstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    /// Program counter.
    pub pc: i32,
    /// Stack pointer; addresses the top-of-stack word.
    pub sp: i32,
    /// Local variable frame pointer.
    pub lv: i32,
    /// Constant pool pointer.
    pub cpp: i32,
    /// Cached top-of-stack value.
    pub tos: i32,
    /// Scratch register.
    pub opc: i32,
    /// ALU left operand.
    pub h: i32,
    /// Memory address register.
    pub mar: i32,
    /// Memory data register.
    pub mdr: i32,
    /// Memory byte register.
    pub mbr: u8,
    /// Microprogram counter.
    pub mpc: u16,
    /// Opcode byte of the IJVM instruction being executed.
    pub current_opcode: u8,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            pc: 0,
            sp: i32::from(STACK_END),
            lv: 0,
            cpp: 0,
            tos: 0,
            opc: 0,
            h: 0,
            mar: 0,
            mdr: 0,
            mbr: 0,
            mpc: 0,
            current_opcode: 0,
        }
    }
}

impl RegisterFile {
    /// Restores reset values: everything zero except `SP`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Value driven onto the B bus by `source`.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn read_b(&self, source: BSource) -> i32 {
        match source {
            BSource::None => 0,
            BSource::Mar => self.mar,
            BSource::Mdr => self.mdr,
            BSource::Pc => self.pc,
            BSource::Mbr => self.mbr as i32,
            BSource::Sp => self.sp,
            BSource::Lv => self.lv,
            BSource::Cpp => self.cpp,
            BSource::Tos => self.tos,
            BSource::Opc => self.opc,
            BSource::H => self.h,
        }
    }

    /// Latches `value` into every register named by `mask` except `MPC`,
    /// which the sequencer handles.
    pub fn latch(&mut self, mask: LoadMask, value: i32) {
        if mask.contains(LoadMask::H) {
            self.h = value;
        }
        if mask.contains(LoadMask::OPC) {
            self.opc = value;
        }
        if mask.contains(LoadMask::TOS) {
            self.tos = value;
        }
        if mask.contains(LoadMask::CPP) {
            self.cpp = value;
        }
        if mask.contains(LoadMask::LV) {
            self.lv = value;
        }
        if mask.contains(LoadMask::SP) {
            self.sp = value;
        }
        if mask.contains(LoadMask::PC) {
            self.pc = value;
        }
        if mask.contains(LoadMask::MDR) {
            self.mdr = value;
        }
        if mask.contains(LoadMask::MAR) {
            self.mar = value;
        }
    }
}

/// Register driving the B bus. `MBR` is zero-extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum BSource {
    /// Bus idle; reads as zero.
    #[default]
    None,
    /// `MAR`.
    Mar,
    /// `MDR`.
    Mdr,
    /// `PC`.
    Pc,
    /// `MBR`, zero-extended.
    Mbr,
    /// `SP`.
    Sp,
    /// `LV`.
    Lv,
    /// `CPP`.
    Cpp,
    /// `TOS`.
    Tos,
    /// `OPC`.
    Opc,
    /// `H`; drives both ALU inputs.
    H,
}

/// Set of registers that latch the ALU result (the C bus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LoadMask(u16);

impl LoadMask {
    /// No register loads.
    pub const NONE: Self = Self(0);
    /// `H`.
    pub const H: Self = Self(1 << 0);
    /// `OPC`.
    pub const OPC: Self = Self(1 << 1);
    /// `TOS`.
    pub const TOS: Self = Self(1 << 2);
    /// `CPP`.
    pub const CPP: Self = Self(1 << 3);
    /// `LV`.
    pub const LV: Self = Self(1 << 4);
    /// `SP`.
    pub const SP: Self = Self(1 << 5);
    /// `PC`.
    pub const PC: Self = Self(1 << 6);
    /// `MDR`.
    pub const MDR: Self = Self(1 << 7);
    /// `MAR`.
    pub const MAR: Self = Self(1 << 8);
    /// `MPC`; the ALU result becomes the base next address.
    pub const MPC: Self = Self(1 << 9);

    /// Raw bit pattern.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Union of two masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// `true` when every register in `other` is also in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// `true` when no register loads.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LoadMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}
