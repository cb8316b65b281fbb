use std::fmt;

/// IJVM instruction set understood by the built-in microprogram.
///
/// Discriminants are the opcode bytes as they appear in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Opcode {
    /// Push a sign-extended immediate byte.
    Bipush = 0x16,
    /// Duplicate the top of stack.
    Dup = 0x24,
    /// Pop two words, push their sum.
    Iadd = 0x50,
    /// Discard the top of stack.
    Pop = 0x57,
    /// Exchange the two topmost words.
    Swap = 0x5F,
    /// Pop two words, push `second - top`.
    Isub = 0x64,
    /// Pop two words, push `second << top`.
    Ishl = 0x78,
    /// Pop two words, push `second >> top` (arithmetic).
    Ishr = 0x7A,
    /// Pop two words, push `second >>> top` (logical).
    Iushr = 0x7C,
    /// Pop two words, push their bitwise and.
    Iand = 0x7E,
    /// Load `SP` from a 16-bit unsigned immediate.
    Setsp = 0x80,
    /// Pop two words, push their bitwise xor.
    Ixor = 0x82,
    /// Pop; branch by a 16-bit offset when the value is zero.
    Ifeq = 0x99,
    /// Pop; branch by a 16-bit offset when the value is non-zero.
    Ifne = 0x9A,
    /// Branch by a 16-bit offset.
    Goto = 0xA7,
    /// Pop two words, push their bitwise or.
    Ior = 0xB0,
    /// Stop the processor.
    Halt = 0xFF,
}

impl Opcode {
    /// Every opcode in ascending byte order.
    pub const ALL: [Self; 17] = [
        Self::Bipush,
        Self::Dup,
        Self::Iadd,
        Self::Pop,
        Self::Swap,
        Self::Isub,
        Self::Ishl,
        Self::Ishr,
        Self::Iushr,
        Self::Iand,
        Self::Setsp,
        Self::Ixor,
        Self::Ifeq,
        Self::Ifne,
        Self::Goto,
        Self::Ior,
        Self::Halt,
    ];

    /// Opcode byte.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Decodes an opcode byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x16 => Some(Self::Bipush),
            0x24 => Some(Self::Dup),
            0x50 => Some(Self::Iadd),
            0x57 => Some(Self::Pop),
            0x5F => Some(Self::Swap),
            0x64 => Some(Self::Isub),
            0x78 => Some(Self::Ishl),
            0x7A => Some(Self::Ishr),
            0x7C => Some(Self::Iushr),
            0x7E => Some(Self::Iand),
            0x80 => Some(Self::Setsp),
            0x82 => Some(Self::Ixor),
            0x99 => Some(Self::Ifeq),
            0x9A => Some(Self::Ifne),
            0xA7 => Some(Self::Goto),
            0xB0 => Some(Self::Ior),
            0xFF => Some(Self::Halt),
            _ => None,
        }
    }

    /// Assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Bipush => "BIPUSH",
            Self::Dup => "DUP",
            Self::Iadd => "IADD",
            Self::Pop => "POP",
            Self::Swap => "SWAP",
            Self::Isub => "ISUB",
            Self::Ishl => "ISHL",
            Self::Ishr => "ISHR",
            Self::Iushr => "IUSHR",
            Self::Iand => "IAND",
            Self::Setsp => "SETSP",
            Self::Ixor => "IXOR",
            Self::Ifeq => "IFEQ",
            Self::Ifne => "IFNE",
            Self::Goto => "GOTO",
            Self::Ior => "IOR",
            Self::Halt => "HALT",
        }
    }

    /// Number of operand bytes following the opcode.
    #[must_use]
    pub const fn operand_bytes(self) -> u8 {
        match self {
            Self::Bipush => 1,
            Self::Setsp | Self::Ifeq | Self::Ifne | Self::Goto => 2,
            _ => 0,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
