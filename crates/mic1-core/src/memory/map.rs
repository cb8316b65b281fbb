//! Fixed segment map of the MIC-1 address space and decoding helpers.

use std::fmt;

/// Inclusive start address of the code segment.
pub const CODE_START: u16 = 0x0000;
/// Inclusive end address of the code segment.
pub const CODE_END: u16 = 0x3FFF;
/// Inclusive start address of the data segment.
pub const DATA_START: u16 = 0x4000;
/// Inclusive end address of the data segment.
pub const DATA_END: u16 = 0xBFFF;
/// Inclusive start address of the stack segment.
pub const STACK_START: u16 = 0xC000;
/// Inclusive end address of the stack segment; also the reset value of `SP`.
pub const STACK_END: u16 = 0xFFFF;

/// Canonical segment descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionDescriptor {
    /// Segment classification.
    pub region: MemoryRegion,
    /// Inclusive start address.
    pub start: u16,
    /// Inclusive end address.
    pub end: u16,
}

/// Segment classification for addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum MemoryRegion {
    /// Code segment (`0x0000..=0x3FFF`), write-protected and executable.
    Code,
    /// Data segment (`0x4000..=0xBFFF`).
    Data,
    /// Stack segment (`0xC000..=0xFFFF`), grows downward.
    Stack,
}

impl MemoryRegion {
    /// Returns the inclusive bounds for this segment.
    #[must_use]
    pub const fn bounds(self) -> (u16, u16) {
        match self {
            Self::Code => (CODE_START, CODE_END),
            Self::Data => (DATA_START, DATA_END),
            Self::Stack => (STACK_START, STACK_END),
        }
    }

    /// Returns `true` when `addr` belongs to this segment.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn contains(self, addr: i32) -> bool {
        let (start, end) = self.bounds();
        addr >= start as i32 && addr <= end as i32
    }

    /// Returns the canonical descriptor for this segment.
    #[must_use]
    pub const fn descriptor(self) -> RegionDescriptor {
        let (start, end) = self.bounds();
        RegionDescriptor {
            region: self,
            start,
            end,
        }
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Code => "code",
            Self::Data => "data",
            Self::Stack => "stack",
        })
    }
}

/// Segment layout in ascending address order.
pub const FIXED_MEMORY_REGIONS: [RegionDescriptor; 3] = [
    MemoryRegion::Code.descriptor(),
    MemoryRegion::Data.descriptor(),
    MemoryRegion::Stack.descriptor(),
];

const _: () = assert_fixed_region_layout();

const fn assert_fixed_region_layout() {
    let mut index = 0;
    while index < FIXED_MEMORY_REGIONS.len() {
        let descriptor = FIXED_MEMORY_REGIONS[index];
        assert!(
            descriptor.start <= descriptor.end,
            "segment start cannot be greater than end"
        );

        if index > 0 {
            let previous = FIXED_MEMORY_REGIONS[index - 1];
            assert!(
                previous.end.wrapping_add(1) == descriptor.start,
                "segments must be contiguous"
            );
        }

        index += 1;
    }

    assert!(
        FIXED_MEMORY_REGIONS[0].start == 0x0000 && FIXED_MEMORY_REGIONS[2].end == u16::MAX,
        "segments must cover the 16-bit address space"
    );
}

/// Decodes an address into its segment, or `None` outside `0x0000..=0xFFFF`.
#[must_use]
pub const fn decode_memory_region(addr: i32) -> Option<MemoryRegion> {
    if addr < 0 {
        return None;
    }
    match addr {
        0x0000..=0x3FFF => Some(MemoryRegion::Code),
        0x4000..=0xBFFF => Some(MemoryRegion::Data),
        0xC000..=0xFFFF => Some(MemoryRegion::Stack),
        _ => None,
    }
}
