//! Segment protection policy for instruction fetches and writes.

use crate::{decode_memory_region, MemoryFault, MemoryRegion};

/// Protection switches consulted by the memory unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ProtectionFlags {
    /// Enforces segment protection; bounds checks stay active when off.
    pub checking_enabled: bool,
    /// Permits instruction fetches from the data segment.
    pub allow_execute_from_data: bool,
    /// Permits instruction fetches from the stack segment.
    pub allow_execute_from_stack: bool,
}

impl Default for ProtectionFlags {
    fn default() -> Self {
        Self {
            checking_enabled: true,
            allow_execute_from_data: false,
            allow_execute_from_stack: false,
        }
    }
}

/// Validates an instruction fetch from `addr`.
///
/// Code is always executable. Data and stack fetches need their allow flag.
/// Nothing is enforced while checking is disabled.
///
/// # Errors
///
/// Returns [`MemoryFault::ExecutionProtection`] for a fetch from a segment
/// that does not allow execution.
pub const fn validate_fetch_access(addr: i32, flags: ProtectionFlags) -> Result<(), MemoryFault> {
    if !flags.checking_enabled {
        return Ok(());
    }
    match decode_memory_region(addr) {
        Some(MemoryRegion::Data) if !flags.allow_execute_from_data => {
            Err(MemoryFault::ExecutionProtection {
                addr,
                region: MemoryRegion::Data,
            })
        }
        Some(MemoryRegion::Stack) if !flags.allow_execute_from_stack => {
            Err(MemoryFault::ExecutionProtection {
                addr,
                region: MemoryRegion::Stack,
            })
        }
        _ => Ok(()),
    }
}

/// Validates a write of `len` bytes starting at `addr`.
///
/// # Errors
///
/// Returns [`MemoryFault::WriteProtect`] when any written byte lies in the
/// code segment and checking is enabled.
pub const fn validate_write_access(
    addr: i32,
    len: i32,
    flags: ProtectionFlags,
) -> Result<(), MemoryFault> {
    if !flags.checking_enabled {
        return Ok(());
    }
    let mut offset = 0;
    while offset < len {
        if let Some(MemoryRegion::Code) = decode_memory_region(addr.wrapping_add(offset)) {
            return Err(MemoryFault::WriteProtect { addr });
        }
        offset += 1;
    }
    Ok(())
}
