//! Combinational ALU of the data path.
//!
//! The left operand is always `H`, the right operand is whatever drives the
//! B bus. Arithmetic wraps on 32-bit overflow.

/// ALU function selected by a microinstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AluOp {
    /// No operation; result is zero.
    #[default]
    Nop,
    /// Constant zero.
    Zero,
    /// Constant one.
    One,
    /// Constant minus one.
    MinusOne,
    /// `A`.
    PassA,
    /// `B`.
    PassB,
    /// `!A`.
    NotA,
    /// `!B`.
    NotB,
    /// `A + B`.
    APlusB,
    /// `A + B + 1`.
    APlusBPlusOne,
    /// `A - B`.
    AMinusB,
    /// `B - A`.
    BMinusA,
    /// `-A`.
    NegateA,
    /// `A + 1`.
    IncrementA,
    /// `A - 1`.
    DecrementA,
    /// `B + 1`.
    IncrementB,
    /// `B + 2`.
    IncrementBBy2,
    /// `B + 3`.
    IncrementBBy3,
    /// `B + 4`.
    IncrementBBy4,
    /// `B - 1`.
    DecrementB,
    /// `B - 2`.
    DecrementBBy2,
    /// `B - 3`.
    DecrementBBy3,
    /// `B - 4`.
    DecrementBBy4,
    /// `A & B`.
    AAndB,
    /// `A | B`.
    AOrB,
    /// `A ^ B`.
    AXorB,
    /// `B << (A & 0x1F)`.
    ShiftLeft,
    /// `B >> (A & 0x1F)`, sign-filling.
    ShiftRightArithmetic,
    /// `B >> (A & 0x1F)`, zero-filling.
    ShiftRightLogical,
    /// Low byte of `B`, sign-extended.
    SignExtend8,
    /// `(A & 0xFF) << 8 | (B & 0xFF)`, zero-extended.
    CombineHighLow,
    /// `PC + sext16((A & 0xFF) << 8 | (B & 0xFF))`.
    CombineOffset,
}

/// ALU result with the flags the sequencer tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct AluOutput {
    /// 32-bit result.
    pub result: i32,
    /// `result == 0`.
    pub is_zero: bool,
    /// `result < 0`.
    pub is_negative: bool,
}

impl AluOutput {
    /// Wraps a raw result with its derived flags.
    #[must_use]
    pub const fn new(result: i32) -> Self {
        Self {
            result,
            is_zero: result == 0,
            is_negative: result < 0,
        }
    }
}

const SHIFT_MASK: i32 = 0x1F;

/// Evaluates `op` on `a` (`H`) and `b` (B bus). `pc` feeds `CombineOffset`.
#[must_use]
#[allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
pub const fn calculate(op: AluOp, a: i32, b: i32, pc: i32) -> AluOutput {
    let result = match op {
        AluOp::Nop | AluOp::Zero => 0,
        AluOp::One => 1,
        AluOp::MinusOne => -1,
        AluOp::PassA => a,
        AluOp::PassB => b,
        AluOp::NotA => !a,
        AluOp::NotB => !b,
        AluOp::APlusB => a.wrapping_add(b),
        AluOp::APlusBPlusOne => a.wrapping_add(b).wrapping_add(1),
        AluOp::AMinusB => a.wrapping_sub(b),
        AluOp::BMinusA => b.wrapping_sub(a),
        AluOp::NegateA => a.wrapping_neg(),
        AluOp::IncrementA => a.wrapping_add(1),
        AluOp::DecrementA => a.wrapping_sub(1),
        AluOp::IncrementB => b.wrapping_add(1),
        AluOp::IncrementBBy2 => b.wrapping_add(2),
        AluOp::IncrementBBy3 => b.wrapping_add(3),
        AluOp::IncrementBBy4 => b.wrapping_add(4),
        AluOp::DecrementB => b.wrapping_sub(1),
        AluOp::DecrementBBy2 => b.wrapping_sub(2),
        AluOp::DecrementBBy3 => b.wrapping_sub(3),
        AluOp::DecrementBBy4 => b.wrapping_sub(4),
        AluOp::AAndB => a & b,
        AluOp::AOrB => a | b,
        AluOp::AXorB => a ^ b,
        AluOp::ShiftLeft => b.wrapping_shl((a & SHIFT_MASK) as u32),
        AluOp::ShiftRightArithmetic => b.wrapping_shr((a & SHIFT_MASK) as u32),
        AluOp::ShiftRightLogical => ((b as u32) >> (a & SHIFT_MASK)) as i32,
        AluOp::SignExtend8 => b as i8 as i32,
        AluOp::CombineHighLow => ((a & 0xFF) << 8) | (b & 0xFF),
        AluOp::CombineOffset => {
            let offset = (((a & 0xFF) << 8) | (b & 0xFF)) as i16;
            pc.wrapping_add(offset as i32)
        }
    };
    AluOutput::new(result)
}
