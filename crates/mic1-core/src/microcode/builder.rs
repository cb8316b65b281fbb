//! Assembles the built-in microprogram into a validated control store.
//!
//! Routines are written as step lists. The builder places each routine at
//! its entry slot and lays any further steps out sequentially in the body
//! area, so no body address is hand-assigned. Construction fails on slot
//! collisions, area exhaustion, or a reachable slot left empty.

use thiserror::Error;

use super::layout::{
    dispatch_address, is_jump_table, BODY_END, BODY_START, CONTROL_STORE_SLOTS, DISPATCH_BASE,
    FALLTHROUGH_END, FALLTHROUGH_START, FETCH_START, HALT_ADDRESS, JUMP_TABLE_END,
    JUMP_TABLE_START,
};
use super::{Jam, MemOp, MicroInstruction, Opcode, Routine, WriteOrder};
use crate::{AluOp, BSource, LoadMask};

/// Control-store construction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ControlStoreError {
    /// Two routines claimed the same slot.
    #[error("control-store slot {address:#05X} claimed by both {existing} and {incoming}")]
    SlotCollision {
        /// Contested slot.
        address: u16,
        /// Routine already placed there.
        existing: Routine,
        /// Routine that tried to take the slot.
        incoming: Routine,
    },
    /// No body slot left for a routine step.
    #[error("routine body area exhausted while placing {routine}")]
    BodyAreaExhausted {
        /// Routine being placed.
        routine: Routine,
    },
    /// No fall-through slot left for a conditional branch.
    #[error("branch fall-through area exhausted while placing {routine}")]
    FallthroughAreaExhausted {
        /// Routine being placed.
        routine: Routine,
    },
    /// An opcode's dispatch slot lies inside the jump table.
    #[error("dispatch entry of {opcode} lies inside the jump table")]
    DispatchInJumpTable {
        /// Offending opcode.
        opcode: Opcode,
    },
    /// A slot reachable from the fetch routine holds no microinstruction.
    #[error("slot {address:#05X} is reachable from {from:#05X} but unpopulated")]
    UnpopulatedSuccessor {
        /// Empty slot.
        address: u16,
        /// Slot whose successor it is.
        from: u16,
    },
}

/// The 512-slot microprogram memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlStore {
    slots: Box<[Option<MicroInstruction>]>,
}

impl ControlStore {
    /// Builds and validates the built-in microprogram.
    ///
    /// # Errors
    ///
    /// Returns a [`ControlStoreError`] when the routine tables are
    /// inconsistent with the address map.
    pub fn build() -> Result<Self, ControlStoreError> {
        let mut builder = Builder::new();
        builder.place_microprogram()?;
        let store = builder.finish();
        store.validate_reachability()?;
        Ok(store)
    }

    /// Microinstruction at `address`, or `None` for an empty slot.
    #[must_use]
    pub fn get(&self, address: u16) -> Option<&MicroInstruction> {
        self.slots.get(usize::from(address)).and_then(Option::as_ref)
    }

    /// Iterates populated slots in address order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn populated(&self) -> impl Iterator<Item = (u16, &MicroInstruction)> + '_ {
        (0..CONTROL_STORE_SLOTS as u16)
            .filter_map(move |address| self.get(address).map(|instruction| (address, instruction)))
    }

    fn validate_reachability(&self) -> Result<(), ControlStoreError> {
        let mut visited = vec![false; CONTROL_STORE_SLOTS];
        let mut pending = vec![FETCH_START];
        while let Some(address) = pending.pop() {
            if std::mem::replace(&mut visited[usize::from(address)], true) {
                continue;
            }
            let Some(instruction) = self.get(address) else {
                continue;
            };
            for successor in static_successors(instruction) {
                if self.get(successor).is_none() {
                    return Err(ControlStoreError::UnpopulatedSuccessor {
                        address: successor,
                        from: address,
                    });
                }
                pending.push(successor);
            }
        }
        Ok(())
    }
}

/// Successors of `instruction` for every documented opcode and both
/// outcomes of a zero test.
fn static_successors(instruction: &MicroInstruction) -> Vec<u16> {
    let next = instruction.next_address;
    if instruction.jam.contains(Jam::JAMC) {
        Opcode::ALL
            .iter()
            .map(|opcode| next | u16::from(opcode.byte()))
            .collect()
    } else if instruction.jam.is_conditional() {
        vec![next, next | JUMP_TABLE_START]
    } else {
        vec![next]
    }
}

#[derive(Debug, Clone, Copy)]
struct Step {
    label: &'static str,
    alu: AluOp,
    b_source: BSource,
    load: LoadMask,
    mem: MemOp,
    order: WriteOrder,
}

const fn step(label: &'static str, alu: AluOp, b_source: BSource, load: LoadMask) -> Step {
    Step {
        label,
        alu,
        b_source,
        load,
        mem: MemOp::NoOp,
        order: WriteOrder::RegistersThenMemory,
    }
}

const fn transfer(label: &'static str, mem: MemOp) -> Step {
    step(label, AluOp::Nop, BSource::None, LoadMask::NONE).with_mem(mem)
}

impl Step {
    const fn with_mem(self, mem: MemOp) -> Self {
        Self { mem, ..self }
    }

    const fn memory_first(self) -> Self {
        Self {
            order: WriteOrder::MemoryThenRegisters,
            ..self
        }
    }

    const fn instruction(self, routine: Routine, next_address: u16, jam: Jam) -> MicroInstruction {
        MicroInstruction {
            next_address,
            jam,
            alu: self.alu,
            load: self.load,
            mem: self.mem,
            b_source: self.b_source,
            order: self.order,
            routine,
            label: self.label,
        }
    }
}

const SP_MAR: LoadMask = LoadMask::SP.union(LoadMask::MAR);
const PC_MAR: LoadMask = LoadMask::PC.union(LoadMask::MAR);
const MDR_TOS: LoadMask = LoadMask::MDR.union(LoadMask::TOS);

const FETCH: [Step; 4] = [
    step("H = PC", AluOp::PassB, BSource::Pc, LoadMask::H),
    step("MAR = H", AluOp::PassA, BSource::None, LoadMask::MAR),
    transfer("fetch", MemOp::ReadByte),
    step("PC = PC + 1; goto (MBR)", AluOp::IncrementB, BSource::Pc, LoadMask::PC),
];

const RELOAD_TOS: [Step; 3] = [
    step("MAR = SP; rd high", AluOp::PassB, BSource::Sp, LoadMask::MAR)
        .with_mem(MemOp::ReadWordHigh),
    transfer("rd low", MemOp::ReadWordLow),
    step("TOS = MDR", AluOp::PassB, BSource::Mdr, LoadMask::TOS),
];

/// Reads a big-endian 16-bit offset at `PC` and adds it to the address of
/// its low byte.
const BRANCH: [Step; 4] = [
    step("MAR = PC; rd", AluOp::PassB, BSource::Pc, LoadMask::MAR).with_mem(MemOp::ReadByte),
    step("H = MBR", AluOp::PassB, BSource::Mbr, LoadMask::H),
    step("PC = MAR = PC + 1; rd", AluOp::IncrementB, BSource::Pc, PC_MAR)
        .with_mem(MemOp::ReadByte),
    step("PC = PC + (H:MBR)", AluOp::CombineOffset, BSource::Mbr, LoadMask::PC),
];

const BIPUSH: [Step; 7] = [
    step("MAR = PC; rd", AluOp::PassB, BSource::Pc, LoadMask::MAR).with_mem(MemOp::ReadByte),
    step("PC = PC + 1", AluOp::IncrementB, BSource::Pc, LoadMask::PC),
    step("H = sext(MBR)", AluOp::SignExtend8, BSource::Mbr, LoadMask::H),
    step("SP = MAR = SP - 4", AluOp::DecrementBBy4, BSource::Sp, SP_MAR),
    step("MDR = H; wr high", AluOp::PassB, BSource::H, LoadMask::MDR)
        .with_mem(MemOp::WriteWordHigh),
    transfer("wr low", MemOp::WriteWordLow),
    step("TOS = MDR", AluOp::PassB, BSource::Mdr, LoadMask::TOS),
];

const DUP: [Step; 4] = [
    step("MAR = SP; rd high", AluOp::PassB, BSource::Sp, LoadMask::MAR)
        .with_mem(MemOp::ReadWordHigh),
    transfer("rd low", MemOp::ReadWordLow),
    step("SP = MAR = SP - 4; wr high", AluOp::DecrementBBy4, BSource::Sp, SP_MAR)
        .with_mem(MemOp::WriteWordHigh),
    transfer("wr low", MemOp::WriteWordLow),
];

const POP: [Step; 1] = [step("SP = SP + 4", AluOp::IncrementBBy4, BSource::Sp, LoadMask::SP)];

const SWAP: [Step; 10] = [
    step("MAR = SP; rd high", AluOp::PassB, BSource::Sp, LoadMask::MAR)
        .with_mem(MemOp::ReadWordHigh),
    transfer("rd low", MemOp::ReadWordLow),
    step("OPC = MDR", AluOp::PassB, BSource::Mdr, LoadMask::OPC),
    step("MAR = SP + 4; rd high", AluOp::IncrementBBy4, BSource::Sp, LoadMask::MAR)
        .with_mem(MemOp::ReadWordHigh),
    step("rd low; MAR = SP", AluOp::PassB, BSource::Sp, LoadMask::MAR)
        .with_mem(MemOp::ReadWordLow)
        .memory_first(),
    transfer("wr high", MemOp::WriteWordHigh),
    transfer("wr low", MemOp::WriteWordLow),
    step("MDR = OPC", AluOp::PassB, BSource::Opc, LoadMask::MDR),
    step("MAR = SP + 4; wr high", AluOp::IncrementBBy4, BSource::Sp, LoadMask::MAR)
        .with_mem(MemOp::WriteWordHigh),
    transfer("wr low", MemOp::WriteWordLow),
];

const SETSP: [Step; 5] = [
    step("MAR = PC; rd", AluOp::PassB, BSource::Pc, LoadMask::MAR).with_mem(MemOp::ReadByte),
    step("H = MBR", AluOp::PassB, BSource::Mbr, LoadMask::H),
    step("PC = MAR = PC + 1; rd", AluOp::IncrementB, BSource::Pc, PC_MAR)
        .with_mem(MemOp::ReadByte),
    step("SP = H:MBR", AluOp::CombineHighLow, BSource::Mbr, LoadMask::SP),
    step("PC = PC + 1", AluOp::IncrementB, BSource::Pc, LoadMask::PC),
];

/// Pops the top word into `H`, combines it with the next word and stores
/// the result in place of that word.
const fn binary(label: &'static str, alu: AluOp) -> [Step; 5] {
    [
        step("H = TOS", AluOp::PassB, BSource::Tos, LoadMask::H),
        step("SP = MAR = SP + 4; rd high", AluOp::IncrementBBy4, BSource::Sp, SP_MAR)
            .with_mem(MemOp::ReadWordHigh),
        transfer("rd low", MemOp::ReadWordLow),
        step(label, alu, BSource::Mdr, MDR_TOS).with_mem(MemOp::WriteWordHigh),
        transfer("wr low", MemOp::WriteWordLow),
    ]
}

/// Pops the top word and tests the popped value; the new top is cached.
const CONDITIONAL: [Step; 5] = [
    step("SP = MAR = SP + 4; rd high", AluOp::IncrementBBy4, BSource::Sp, SP_MAR)
        .with_mem(MemOp::ReadWordHigh),
    transfer("rd low", MemOp::ReadWordLow),
    step("OPC = TOS", AluOp::PassB, BSource::Tos, LoadMask::OPC),
    step("TOS = MDR", AluOp::PassB, BSource::Mdr, LoadMask::TOS),
    step("Z = OPC", AluOp::PassB, BSource::Opc, LoadMask::NONE),
];

const NOT_TAKEN: Step = step("PC = PC + 2", AluOp::IncrementBBy2, BSource::Pc, LoadMask::PC);

const HALT: Step = step("halt", AluOp::Nop, BSource::None, LoadMask::NONE);

#[derive(Debug, Clone, Copy)]
enum Placement {
    /// Consecutive slots starting at the given address.
    Contiguous(u16),
    /// First step at the given address, the rest in the body area.
    Entry(u16),
    /// Every step in the body area.
    Body,
}

#[derive(Debug, Clone, Copy)]
enum Exit {
    Goto(u16),
    Dispatch,
    Branch { jam: Jam, fallthrough: u16 },
}

struct Builder {
    slots: Vec<Option<MicroInstruction>>,
    next_body: u16,
    next_fallthrough: u16,
}

impl Builder {
    fn new() -> Self {
        Self {
            slots: vec![None; CONTROL_STORE_SLOTS],
            next_body: BODY_START,
            next_fallthrough: FALLTHROUGH_START,
        }
    }

    fn finish(self) -> ControlStore {
        ControlStore {
            slots: self.slots.into_boxed_slice(),
        }
    }

    fn place_microprogram(&mut self) -> Result<(), ControlStoreError> {
        for opcode in Opcode::ALL {
            if is_jump_table(dispatch_address(opcode.byte())) {
                return Err(ControlStoreError::DispatchInJumpTable { opcode });
            }
        }

        self.routine(
            Routine::Fetch,
            Placement::Contiguous(FETCH_START),
            &FETCH,
            Exit::Dispatch,
        )?;
        let reload = self.routine(
            Routine::ReloadTos,
            Placement::Body,
            &RELOAD_TOS,
            Exit::Goto(FETCH_START),
        )?;
        let branch = self.routine(
            Routine::Branch,
            Placement::Body,
            &BRANCH,
            Exit::Goto(FETCH_START),
        )?;
        for address in JUMP_TABLE_START..=JUMP_TABLE_END {
            self.alias(address, branch, Routine::Branch)?;
        }

        for opcode in Opcode::ALL {
            let routine = Routine::Opcode(opcode);
            let entry = Placement::Entry(dispatch_address(opcode.byte()));
            let to_fetch = Exit::Goto(FETCH_START);
            match opcode {
                Opcode::Bipush => self.routine(routine, entry, &BIPUSH, to_fetch)?,
                Opcode::Dup => self.routine(routine, entry, &DUP, Exit::Goto(reload))?,
                Opcode::Pop => self.routine(routine, entry, &POP, Exit::Goto(reload))?,
                Opcode::Swap => self.routine(routine, entry, &SWAP, Exit::Goto(reload))?,
                Opcode::Setsp => self.routine(routine, entry, &SETSP, to_fetch)?,
                Opcode::Iadd => self.routine(
                    routine,
                    entry,
                    &binary("MDR = TOS = MDR + H; wr high", AluOp::APlusB),
                    to_fetch,
                )?,
                Opcode::Isub => self.routine(
                    routine,
                    entry,
                    &binary("MDR = TOS = MDR - H; wr high", AluOp::BMinusA),
                    to_fetch,
                )?,
                Opcode::Iand => self.routine(
                    routine,
                    entry,
                    &binary("MDR = TOS = MDR AND H; wr high", AluOp::AAndB),
                    to_fetch,
                )?,
                Opcode::Ior => self.routine(
                    routine,
                    entry,
                    &binary("MDR = TOS = MDR OR H; wr high", AluOp::AOrB),
                    to_fetch,
                )?,
                Opcode::Ixor => self.routine(
                    routine,
                    entry,
                    &binary("MDR = TOS = MDR XOR H; wr high", AluOp::AXorB),
                    to_fetch,
                )?,
                Opcode::Ishl => self.routine(
                    routine,
                    entry,
                    &binary("MDR = TOS = MDR << H; wr high", AluOp::ShiftLeft),
                    to_fetch,
                )?,
                Opcode::Ishr => self.routine(
                    routine,
                    entry,
                    &binary("MDR = TOS = MDR >> H; wr high", AluOp::ShiftRightArithmetic),
                    to_fetch,
                )?,
                Opcode::Iushr => self.routine(
                    routine,
                    entry,
                    &binary("MDR = TOS = MDR >>> H; wr high", AluOp::ShiftRightLogical),
                    to_fetch,
                )?,
                Opcode::Ifeq => self.conditional(routine, entry, Jam::JAMZ_EQ)?,
                Opcode::Ifne => self.conditional(routine, entry, Jam::JAMZ_NE)?,
                Opcode::Goto => {
                    self.alias(dispatch_address(opcode.byte()), branch, routine)?;
                    branch
                }
                Opcode::Halt => {
                    self.place(
                        HALT_ADDRESS,
                        HALT.instruction(routine, HALT_ADDRESS, Jam::NONE),
                    )?;
                    HALT_ADDRESS
                }
            };
        }
        Ok(())
    }

    /// Places a pop-and-test routine whose not-taken path advances `PC`
    /// past the offset and whose taken path enters the jump table.
    fn conditional(
        &mut self,
        routine: Routine,
        entry: Placement,
        jam: Jam,
    ) -> Result<u16, ControlStoreError> {
        let fallthrough = self.alloc_fallthrough(routine)?;
        self.place(
            fallthrough,
            NOT_TAKEN.instruction(routine, FETCH_START, Jam::NONE),
        )?;
        self.routine(routine, entry, &CONDITIONAL, Exit::Branch { jam, fallthrough })
    }

    /// Places `steps` and returns the entry address.
    #[allow(clippy::cast_possible_truncation)]
    fn routine(
        &mut self,
        routine: Routine,
        placement: Placement,
        steps: &[Step],
        exit: Exit,
    ) -> Result<u16, ControlStoreError> {
        let mut addresses = Vec::with_capacity(steps.len());
        for index in 0..steps.len() {
            let address = match placement {
                Placement::Contiguous(start) => start + addresses.len() as u16,
                Placement::Entry(entry) if index == 0 => entry,
                Placement::Entry(_) | Placement::Body => self.alloc_body(routine)?,
            };
            addresses.push(address);
        }

        for (index, step) in steps.iter().enumerate() {
            let (next_address, jam) = match addresses.get(index + 1) {
                Some(next) => (*next, Jam::NONE),
                None => match exit {
                    Exit::Goto(target) => (target, Jam::NONE),
                    Exit::Dispatch => (DISPATCH_BASE, Jam::JAMC),
                    Exit::Branch { jam, fallthrough } => (fallthrough, jam),
                },
            };
            self.place(addresses[index], step.instruction(routine, next_address, jam))?;
        }
        Ok(addresses[0])
    }

    /// Copies the instruction at `source` into `target`, retagged.
    fn alias(
        &mut self,
        target: u16,
        source: u16,
        routine: Routine,
    ) -> Result<(), ControlStoreError> {
        let instruction = self.slots[usize::from(source)].ok_or(
            ControlStoreError::UnpopulatedSuccessor {
                address: source,
                from: target,
            },
        )?;
        self.place(target, MicroInstruction { routine, ..instruction })
    }

    fn place(
        &mut self,
        address: u16,
        instruction: MicroInstruction,
    ) -> Result<(), ControlStoreError> {
        let slot = &mut self.slots[usize::from(address)];
        if let Some(existing) = slot {
            return Err(ControlStoreError::SlotCollision {
                address,
                existing: existing.routine,
                incoming: instruction.routine,
            });
        }
        *slot = Some(instruction);
        Ok(())
    }

    fn alloc_body(&mut self, routine: Routine) -> Result<u16, ControlStoreError> {
        if self.next_body > BODY_END {
            return Err(ControlStoreError::BodyAreaExhausted { routine });
        }
        let address = self.next_body;
        self.next_body += 1;
        Ok(address)
    }

    fn alloc_fallthrough(&mut self, routine: Routine) -> Result<u16, ControlStoreError> {
        if self.next_fallthrough > FALLTHROUGH_END {
            return Err(ControlStoreError::FallthroughAreaExhausted { routine });
        }
        let address = self.next_fallthrough;
        self.next_fallthrough += 1;
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        step, Builder, ControlStore, ControlStoreError, Exit, Placement, BIPUSH, FETCH,
    };
    use crate::microcode::layout::{
        dispatch_address, FETCH_START, HALT_ADDRESS, JUMP_TABLE_END, JUMP_TABLE_START,
    };
    use crate::{AluOp, BSource, Jam, LoadMask, MemOp, Opcode, Routine};

    fn store() -> ControlStore {
        ControlStore::build().expect("built-in microprogram is consistent")
    }

    #[test]
    fn fetch_occupies_the_first_four_slots_and_dispatches_on_mbr() {
        let store = store();
        for address in 0..4 {
            assert_eq!(
                store.get(address).map(|instruction| instruction.routine),
                Some(Routine::Fetch)
            );
        }
        let fetch = store.get(2).expect("fetch read");
        assert!(fetch.is_instruction_fetch());
        let last = store.get(3).expect("dispatch step");
        assert_eq!(last.jam, Jam::JAMC);
        assert_eq!(last.next_address, 0x100);
    }

    #[test]
    fn every_opcode_has_a_populated_dispatch_entry() {
        let store = store();
        for opcode in Opcode::ALL {
            let entry = store
                .get(dispatch_address(opcode.byte()))
                .expect("dispatch entry populated");
            assert_eq!(entry.routine, Routine::Opcode(opcode));
        }
    }

    #[test]
    fn undefined_opcode_slots_stay_empty() {
        let store = store();
        assert!(store.get(dispatch_address(0x00)).is_none());
        assert!(store.get(dispatch_address(0x10)).is_none());
    }

    #[test]
    fn jump_table_holds_copies_of_the_branch_entry() {
        let store = store();
        let goto = *store.get(dispatch_address(Opcode::Goto.byte())).expect("goto");
        for address in JUMP_TABLE_START..=JUMP_TABLE_END {
            let slot = store.get(address).expect("jump table populated");
            assert_eq!(slot.routine, Routine::Branch);
            assert_eq!(slot.next_address, goto.next_address);
            assert_eq!(slot.mem, MemOp::ReadByte);
        }
    }

    #[test]
    fn conditional_fallthroughs_sit_below_the_body_area() {
        let store = store();
        let conditional_exits: Vec<_> = store
            .populated()
            .filter(|(_, instruction)| instruction.jam.is_conditional())
            .collect();
        assert_eq!(conditional_exits.len(), 2);
        for (_, instruction) in conditional_exits {
            assert!(instruction.next_address < 0x20);
            let fallthrough = store.get(instruction.next_address).expect("fallthrough");
            assert_eq!(fallthrough.label, "PC = PC + 2");
        }
    }

    #[test]
    fn halt_slot_loops_on_itself() {
        let store = store();
        let halt = store.get(HALT_ADDRESS).expect("halt");
        assert_eq!(halt.next_address, HALT_ADDRESS);
        assert_eq!(halt.routine, Routine::Opcode(Opcode::Halt));
    }

    #[test]
    fn routine_lengths_match_cycle_budget() {
        let store = store();
        let count = |routine| {
            store
                .populated()
                .filter(|(address, instruction)| {
                    instruction.routine == routine && *address < JUMP_TABLE_START
                })
                .count()
        };
        assert_eq!(count(Routine::Opcode(Opcode::Setsp)), 5);
        assert_eq!(count(Routine::Opcode(Opcode::Bipush)), 7);
        assert_eq!(count(Routine::Opcode(Opcode::Dup)), 4);
        assert_eq!(count(Routine::ReloadTos), 3);
        assert_eq!(count(Routine::Opcode(Opcode::Iadd)), 5);
        assert_eq!(count(Routine::Opcode(Opcode::Ifeq)), 6, "five steps plus fall-through");
    }

    #[test]
    fn builder_rejects_slot_collisions() {
        let mut builder = Builder::new();
        builder
            .routine(
                Routine::Fetch,
                Placement::Contiguous(FETCH_START),
                &FETCH,
                Exit::Dispatch,
            )
            .expect("fresh store accepts fetch");
        let clash = builder.routine(
            Routine::Opcode(Opcode::Bipush),
            Placement::Entry(2),
            &BIPUSH,
            Exit::Goto(FETCH_START),
        );
        assert_eq!(
            clash,
            Err(ControlStoreError::SlotCollision {
                address: 2,
                existing: Routine::Fetch,
                incoming: Routine::Opcode(Opcode::Bipush),
            })
        );
    }

    #[test]
    fn builder_reports_body_exhaustion() {
        let mut builder = Builder::new();
        let filler = [step("H = PC", AluOp::PassB, BSource::Pc, LoadMask::H); 0xE1];
        let result = builder.routine(
            Routine::Branch,
            Placement::Body,
            &filler,
            Exit::Goto(FETCH_START),
        );
        assert_eq!(
            result,
            Err(ControlStoreError::BodyAreaExhausted {
                routine: Routine::Branch
            })
        );
    }

    #[test]
    fn dangling_successor_is_detected() {
        let mut builder = Builder::new();
        builder
            .routine(
                Routine::Fetch,
                Placement::Contiguous(FETCH_START),
                &FETCH,
                Exit::Dispatch,
            )
            .expect("fetch placed");
        let store = builder.finish();
        assert!(matches!(
            store.validate_reachability(),
            Err(ControlStoreError::UnpopulatedSuccessor { from: 3, .. })
        ));
    }
}
