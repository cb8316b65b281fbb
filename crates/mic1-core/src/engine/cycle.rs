use std::time::SystemTime;

use super::Engine;
use crate::microcode::layout::{FETCH_START, HALT_ADDRESS};
use crate::{
    calculate, CycleOutcome, ExecutionEventKind, MemOp, MemoryFault, MicroInstruction, RunState,
    TrapClass, TrapCode, TrapEvent, WriteOrder, STACK_END, STACK_START,
};

impl Engine {
    /// Executes exactly one microcycle.
    ///
    /// The slot at `MPC` is looked up first; an empty slot traps without
    /// counting a cycle. Otherwise the cycle is counted, the stack bounds and
    /// then `HALT` are checked, and the microinstruction runs: ALU, register
    /// latch and memory transfer in the instruction's order, then sequencing.
    /// After a halt or trap every further call reports the same outcome.
    pub fn step(&mut self) -> CycleOutcome {
        match self.run_state {
            RunState::Halted => return CycleOutcome::Halted,
            RunState::TrapLatched(code) => return CycleOutcome::Trapped(code),
            RunState::Running | RunState::Idle => {}
        }

        let mpc = self.registers.mpc;
        let Some(instruction) = self.store.get(mpc).copied() else {
            return self.raise_trap(
                TrapCode::InvalidMicrocodeAddress,
                format!("no microinstruction at control-store address {mpc:#05X}"),
                Some(format!("opcode {:#04X}", self.registers.current_opcode)),
            );
        };

        let per_instruction_events =
            self.config.execution_events && self.events.has_execution_subscribers();
        if per_instruction_events {
            self.emit_execution(ExecutionEventKind::InstructionStarted, Some(instruction));
        }
        self.stats.record_cycle(
            mpc == FETCH_START,
            self.registers.current_opcode,
            self.config.detailed_stats,
        );
        tracing::trace!(mpc, label = instruction.label, "microcycle");

        if self.config.memory_checking {
            if let Some(code) = stack_violation(self.registers.sp) {
                return self.raise_trap(
                    code,
                    format!("{code}: stack pointer outside the stack segment"),
                    Some(format!("SP = {:#06X}", self.registers.sp)),
                );
            }
        }
        if mpc == HALT_ADDRESS {
            return self.raise_trap(TrapCode::Halt, "program halted".to_owned(), None);
        }

        if let Err(fault) = self.execute(&instruction) {
            return self.raise_trap(
                fault.trap_code(),
                fault.to_string(),
                Some(format!(
                    "{instruction} at MPC {mpc:#05X}, PC = {:#06X}",
                    self.registers.pc
                )),
            );
        }

        if per_instruction_events {
            self.emit_execution(ExecutionEventKind::InstructionEnded, Some(instruction));
        }
        CycleOutcome::Continue
    }

    fn execute(&mut self, instruction: &MicroInstruction) -> Result<(), MemoryFault> {
        let b = self.registers.read_b(instruction.b_source);
        let alu = calculate(instruction.alu, self.registers.h, b, self.registers.pc);

        match instruction.order {
            WriteOrder::RegistersThenMemory => {
                self.registers.latch(instruction.load, alu.result);
                self.transfer(instruction)?;
            }
            WriteOrder::MemoryThenRegisters => {
                self.transfer(instruction)?;
                self.registers.latch(instruction.load, alu.result);
            }
        }

        self.registers.mpc = instruction.successor(alu, self.registers.mbr);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn transfer(&mut self, instruction: &MicroInstruction) -> Result<(), MemoryFault> {
        let mar = self.registers.mar;
        let mdr = self.registers.mdr;
        match instruction.mem {
            MemOp::NoOp => {}
            MemOp::ReadWordHigh => {
                let high = empty_stack_or(mar, self.memory.read_word_high(mar))?;
                self.registers.mdr = (i32::from(high) << 16) | (mdr & 0xFFFF);
            }
            MemOp::ReadWordLow => {
                let low = empty_stack_or(mar, self.memory.read_word_low(mar))?;
                self.registers.mdr = (mdr & !0xFFFF) | i32::from(low);
            }
            MemOp::WriteWordHigh => self.memory.write_word_high(mar, (mdr >> 16) as u16)?,
            MemOp::WriteWordLow => self.memory.write_word_low(mar, mdr as u16)?,
            MemOp::ReadByte => {
                let fetch = instruction.is_instruction_fetch();
                let byte = self.memory.read_byte(mar, fetch)?;
                self.registers.mbr = byte;
                if fetch {
                    self.registers.current_opcode = byte;
                }
            }
            MemOp::WriteByte => self.memory.write_byte(mar, self.registers.mbr)?,
        }
        Ok(())
    }

    /// Stops execution with `code` and reports it: one trap event, a log
    /// record, and for `HALT` the halted lifecycle event.
    pub(super) fn raise_trap(
        &mut self,
        code: TrapCode,
        message: String,
        information: Option<String>,
    ) -> CycleOutcome {
        self.stats
            .finish_instruction(self.registers.current_opcode, self.config.detailed_stats);

        if code.class() == TrapClass::Normal {
            self.run_state = RunState::Halted;
            tracing::info!(
                cycles = self.stats.cycle_count(),
                instructions = self.stats.ijvm_cycle_count(),
                tos = self.registers.tos,
                "halt reached"
            );
        } else {
            self.run_state = RunState::TrapLatched(code);
            tracing::warn!(
                trap = %code,
                code = code.as_u8(),
                pc = self.registers.pc,
                sp = self.registers.sp,
                mpc = self.registers.mpc,
                information = information.as_deref().unwrap_or_default(),
                "{message}"
            );
        }

        let event = TrapEvent {
            trap_code: code,
            message,
            information,
            registers: self.registers,
            timestamp: SystemTime::now(),
        };
        self.events.emit_trap(&event);

        if code.is_normal() {
            self.emit_lifecycle(ExecutionEventKind::Halted);
            CycleOutcome::Halted
        } else {
            CycleOutcome::Trapped(code)
        }
    }
}

/// The word at the empty-stack position reads as zero when it would run
/// past the end of memory.
fn empty_stack_or(mar: i32, read: Result<u16, MemoryFault>) -> Result<u16, MemoryFault> {
    match read {
        Err(MemoryFault::WordOutOfBounds { .. }) if mar == i32::from(STACK_END) => Ok(0),
        other => other,
    }
}

/// Classifies an out-of-segment stack pointer.
#[allow(clippy::cast_lossless)]
const fn stack_violation(sp: i32) -> Option<TrapCode> {
    if sp < STACK_START as i32 {
        Some(TrapCode::StackOverflow)
    } else if sp > STACK_END as i32 {
        Some(TrapCode::StackUnderflow)
    } else {
        None
    }
}
