//! Segmented memory of the processor and its protection policy.

/// Fetch and write protection policy helpers.
pub mod access;
/// Fixed segment map and address decoder.
pub mod map;
/// Byte-addressable memory unit.
pub mod unit;

pub use access::{validate_fetch_access, validate_write_access, ProtectionFlags};
pub use map::{
    decode_memory_region, MemoryRegion, RegionDescriptor, CODE_END, CODE_START, DATA_END,
    DATA_START, FIXED_MEMORY_REGIONS, STACK_END, STACK_START,
};
pub use unit::{MemoryUnit, HALF_WORD_BYTES, WORD_BYTES};

/// Default size of the backing store (64 KiB).
pub const DEFAULT_MEMORY_BYTES: usize = u16::MAX as usize + 1;
