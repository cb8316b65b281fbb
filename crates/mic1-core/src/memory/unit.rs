//! Byte-addressable backing store with segment protection.

use crate::{validate_fetch_access, validate_write_access, MemoryFault, ProtectionFlags};

/// Bytes in one half-word transfer.
pub const HALF_WORD_BYTES: usize = 2;
/// Bytes in one full word.
pub const WORD_BYTES: usize = 4;

/// Flat memory of the processor.
///
/// Words are big-endian. A word at `addr` spans `addr..=addr + 3`; its high
/// half is `addr..=addr + 1` and its low half `addr + 2..=addr + 3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryUnit {
    bytes: Box<[u8]>,
    protection: ProtectionFlags,
}

impl MemoryUnit {
    /// Allocates a zeroed memory of `size` bytes with default protection.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self::with_protection(size, ProtectionFlags::default())
    }

    /// Allocates a zeroed memory of `size` bytes with the given protection.
    #[must_use]
    pub fn with_protection(size: usize, protection: ProtectionFlags) -> Self {
        Self {
            bytes: vec![0; size].into_boxed_slice(),
            protection,
        }
    }

    /// Size of the backing store in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Current protection switches.
    #[must_use]
    pub const fn protection(&self) -> ProtectionFlags {
        self.protection
    }

    /// Replaces the protection switches.
    pub fn set_protection(&mut self, protection: ProtectionFlags) {
        self.protection = protection;
    }

    /// Raw view of the backing store.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Zeroes every byte.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Reads one byte. `is_fetch` marks an instruction fetch, which is
    /// subject to execution protection.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ByteOutOfBounds`] outside the backing store and
    /// [`MemoryFault::ExecutionProtection`] for a forbidden fetch.
    pub fn read_byte(&self, addr: i32, is_fetch: bool) -> Result<u8, MemoryFault> {
        let index = self.span(addr, 0, 1, false)?;
        if is_fetch {
            validate_fetch_access(addr, self.protection)?;
        }
        Ok(self.bytes[index])
    }

    /// Writes one byte.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ByteOutOfBounds`] outside the backing store and
    /// [`MemoryFault::WriteProtect`] for a write into code.
    pub fn write_byte(&mut self, addr: i32, value: u8) -> Result<(), MemoryFault> {
        let index = self.span(addr, 0, 1, false)?;
        validate_write_access(addr, 1, self.protection)?;
        self.bytes[index] = value;
        Ok(())
    }

    /// Reads the high half of the word at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::WordOutOfBounds`] when the half leaves the
    /// backing store.
    pub fn read_word_high(&self, addr: i32) -> Result<u16, MemoryFault> {
        self.read_half(addr, 0)
    }

    /// Reads the low half of the word at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::WordOutOfBounds`] when the half leaves the
    /// backing store.
    pub fn read_word_low(&self, addr: i32) -> Result<u16, MemoryFault> {
        self.read_half(addr, HALF_WORD_BYTES)
    }

    /// Writes the high half of the word at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::WordOutOfBounds`] when the half leaves the
    /// backing store and [`MemoryFault::WriteProtect`] for a write into code.
    pub fn write_word_high(&mut self, addr: i32, value: u16) -> Result<(), MemoryFault> {
        self.write_half(addr, 0, value)
    }

    /// Writes the low half of the word at `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::WordOutOfBounds`] when the half leaves the
    /// backing store and [`MemoryFault::WriteProtect`] for a write into code.
    pub fn write_word_low(&mut self, addr: i32, value: u16) -> Result<(), MemoryFault> {
        self.write_half(addr, HALF_WORD_BYTES, value)
    }

    /// Reads a full big-endian word.
    ///
    /// # Errors
    ///
    /// Same as [`Self::read_word_high`] and [`Self::read_word_low`].
    pub fn read_word(&self, addr: i32) -> Result<i32, MemoryFault> {
        let high = self.read_word_high(addr)?;
        let low = self.read_word_low(addr)?;
        Ok((i32::from(high) << 16) | i32::from(low))
    }

    /// Writes a full big-endian word.
    ///
    /// # Errors
    ///
    /// Same as [`Self::write_word_high`] and [`Self::write_word_low`].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn write_word(&mut self, addr: i32, value: i32) -> Result<(), MemoryFault> {
        self.span(addr, 0, WORD_BYTES, true)?;
        self.write_word_high(addr, (value >> 16) as u16)?;
        self.write_word_low(addr, value as u16)
    }

    /// Copies `image` to `start`, ignoring write protection. Used to place
    /// programs into the code segment.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryFault::ByteOutOfBounds`] when the image does not fit.
    pub fn load(&mut self, start: i32, image: &[u8]) -> Result<(), MemoryFault> {
        if image.is_empty() {
            return Ok(());
        }
        let begin = self.span(start, 0, image.len(), false)?;
        self.bytes[begin..begin + image.len()].copy_from_slice(image);
        Ok(())
    }

    /// Returns `(address, byte)` pairs from the top of memory down to `sp`.
    ///
    /// An `sp` outside the backing store yields an empty dump.
    #[must_use]
    pub fn stack_dump(&self, sp: i32) -> Vec<(i32, u8)> {
        let Ok(bottom) = usize::try_from(sp) else {
            return Vec::new();
        };
        (bottom..self.bytes.len())
            .rev()
            .filter_map(|index| Some((i32::try_from(index).ok()?, self.bytes[index])))
            .collect()
    }

    fn read_half(&self, addr: i32, offset: usize) -> Result<u16, MemoryFault> {
        let index = self.span(addr, offset, HALF_WORD_BYTES, true)?;
        Ok(u16::from_be_bytes([self.bytes[index], self.bytes[index + 1]]))
    }

    fn write_half(&mut self, addr: i32, offset: usize, value: u16) -> Result<(), MemoryFault> {
        let index = self.span(addr, offset, HALF_WORD_BYTES, true)?;
        let start = i32::try_from(index).map_err(|_| MemoryFault::WordOutOfBounds { addr })?;
        validate_write_access(start, 2, self.protection)
            .map_err(|_| MemoryFault::WriteProtect { addr })?;
        self.bytes[index..index + HALF_WORD_BYTES].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Resolves `addr + offset .. + len` to a backing-store index.
    fn span(&self, addr: i32, offset: usize, len: usize, word: bool) -> Result<usize, MemoryFault> {
        let fault = if word {
            MemoryFault::WordOutOfBounds { addr }
        } else {
            MemoryFault::ByteOutOfBounds { addr }
        };
        let start = usize::try_from(addr)
            .ok()
            .and_then(|base| base.checked_add(offset))
            .ok_or(fault)?;
        match start.checked_add(len) {
            Some(end) if end <= self.bytes.len() => Ok(start),
            _ => Err(fault),
        }
    }
}
