//! Register bus abstraction
//!
//! Layers never touch MMIO directly: every access goes through a
//! [`RegisterBus`], addressed by byte offset from the controller base. On
//! hardware this is [`MmioBus`]; host tests substitute a mock.

use crate::internal::register::{modify_reg, read_reg, write_reg};

// =============================================================================
// RegisterBus Trait
// =============================================================================

/// 32-bit register access by offset from the controller base
///
/// # Example
///
/// ```ignore
/// fn channel_enabled<B: RegisterBus>(bus: &mut B) -> bool {
///     bus.read(0x08) & 1 != 0
/// }
/// ```
pub trait RegisterBus {
    /// Read the register at `offset`
    fn read(&mut self, offset: usize) -> u32;

    /// Write `value` to the register at `offset`
    fn write(&mut self, offset: usize, value: u32);

    /// Replace the `mask` bits of the register at `offset` with `value`
    fn modify(&mut self, offset: usize, mask: u32, value: u32) {
        let old = self.read(offset);
        self.write(offset, (old & !mask) | (value & mask));
    }

    /// Read consecutive registers starting at `offset`
    fn bulk_read(&mut self, offset: usize, out: &mut [u32]) {
        for (i, word) in out.iter_mut().enumerate() {
            *word = self.read(offset + i * 4);
        }
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&mut self, offset: usize) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: usize, value: u32) {
        (**self).write(offset, value);
    }

    fn modify(&mut self, offset: usize, mask: u32, value: u32) {
        (**self).modify(offset, mask, value);
    }

    fn bulk_read(&mut self, offset: usize, out: &mut [u32]) {
        (**self).bulk_read(offset, out);
    }
}

// =============================================================================
// Memory-Mapped Bus
// =============================================================================

/// Volatile memory-mapped access to the controller registers
#[derive(Debug)]
pub struct MmioBus {
    base: usize,
}

impl MmioBus {
    /// Create a bus for the register block at `base`
    ///
    /// # Safety
    ///
    /// `base` must be the address of the HLCDC register block, and no other
    /// code may access the registers of the layers driven through this bus.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    /// Base address of the register block
    pub const fn base(&self) -> usize {
        self.base
    }
}

impl RegisterBus for MmioBus {
    #[inline]
    fn read(&mut self, offset: usize) -> u32 {
        // SAFETY: `new` guarantees the block is mapped at `base`
        unsafe { read_reg(self.base + offset) }
    }

    #[inline]
    fn write(&mut self, offset: usize, value: u32) {
        // SAFETY: `new` guarantees the block is mapped at `base`
        unsafe { write_reg(self.base + offset, value) }
    }

    #[inline]
    fn modify(&mut self, offset: usize, mask: u32, value: u32) {
        // SAFETY: `new` guarantees the block is mapped at `base`
        unsafe { modify_reg(self.base + offset, |old| (old & !mask) | (value & mask)) }
    }
}
