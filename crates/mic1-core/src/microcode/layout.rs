//! Address map of the 512-slot control store.

/// Number of control-store slots.
pub const CONTROL_STORE_SLOTS: usize = 512;
/// Mask applied to every computed next address.
pub const ADDRESS_MASK: u16 = 0x1FF;

/// First slot of the instruction fetch routine.
pub const FETCH_START: u16 = 0x000;
/// Last slot of the instruction fetch routine.
pub const FETCH_END: u16 = 0x003;
/// First slot usable as a conditional-branch fall-through.
pub const FALLTHROUGH_START: u16 = 0x004;
/// Last slot usable as a conditional-branch fall-through.
pub const FALLTHROUGH_END: u16 = 0x01F;
/// First slot of the routine body area.
pub const BODY_START: u16 = 0x020;
/// Last slot of the routine body area.
pub const BODY_END: u16 = 0x0FF;
/// Base of the opcode dispatch table; the entry for opcode `op` is `DISPATCH_BASE | op`.
pub const DISPATCH_BASE: u16 = 0x100;
/// First slot of the jump table reached by taken conditional branches.
pub const JUMP_TABLE_START: u16 = 0x1C0;
/// Last slot of the jump table.
pub const JUMP_TABLE_END: u16 = 0x1DF;
/// Slot of the `HALT` microinstruction.
pub const HALT_ADDRESS: u16 = 0x1FF;

/// Dispatch slot of an opcode byte.
#[must_use]
#[allow(clippy::cast_lossless)]
pub const fn dispatch_address(opcode: u8) -> u16 {
    DISPATCH_BASE | opcode as u16
}

/// `true` when `address` lies in the jump table.
#[must_use]
pub const fn is_jump_table(address: u16) -> bool {
    address >= JUMP_TABLE_START && address <= JUMP_TABLE_END
}

const _: () = assert_control_store_layout();

const fn assert_control_store_layout() {
    assert!(FETCH_END < FALLTHROUGH_START, "fetch overlaps fall-through slots");
    assert!(FALLTHROUGH_END < BODY_START, "fall-through slots overlap bodies");
    assert!(BODY_END < DISPATCH_BASE, "bodies overlap dispatch table");
    assert!(
        FALLTHROUGH_END | JUMP_TABLE_START == JUMP_TABLE_END,
        "taken branches must land inside the jump table"
    );
    assert!(
        HALT_ADDRESS == dispatch_address(0xFF),
        "HALT dispatch entry is the halt slot"
    );
    assert!(
        HALT_ADDRESS as usize == CONTROL_STORE_SLOTS - 1,
        "halt occupies the last slot"
    );
}
