//! Layer DMA descriptor.
//!
//! The HLCDC fetches a layer plane through a linked list of three-word
//! descriptors (`addr`, `ctrl`, `next`). A fourth, software-only word tracks
//! where the descriptor is in its lifecycle.

use core::cell::UnsafeCell;

/// Volatile cell wrapper for descriptor fields
///
/// Ensures all accesses are volatile to prevent compiler optimization
/// from reordering or caching descriptor field accesses.
#[repr(transparent)]
pub(crate) struct VolatileCell<T: Copy> {
    value: UnsafeCell<T>,
}

// SAFETY: every access is a volatile 32-bit operation, and mutation from
// software only happens with the owning layer locked.
unsafe impl<T: Copy> Sync for VolatileCell<T> {}

impl<T: Copy> VolatileCell<T> {
    /// Create a new volatile cell with the given initial value
    #[inline(always)]
    pub const fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    /// Read the value (volatile read)
    #[inline(always)]
    pub fn get(&self) -> T {
        // SAFETY: the pointer comes from our own UnsafeCell
        unsafe { core::ptr::read_volatile(self.value.get()) }
    }

    /// Write a value (volatile write)
    #[inline(always)]
    pub fn set(&self, value: T) {
        // SAFETY: the pointer comes from our own UnsafeCell
        unsafe { core::ptr::write_volatile(self.value.get(), value) }
    }

    /// Update the value using a function (read-modify-write)
    #[inline(always)]
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(T) -> T,
    {
        let old = self.get();
        self.set(f(old));
    }
}

/// Descriptor lifecycle bits (software only, never seen by hardware).
pub(crate) mod status {
    /// Owned by a flip request
    pub const RESERVED: u32 = 1 << 0;
    /// Fetched by the channel
    pub const LOADED: u32 = 1 << 1;
    /// Transfer finished
    pub const DONE: u32 = 1 << 2;
    /// Channel overflowed while using the descriptor
    pub const OVERRUN: u32 = 1 << 3;
}

/// Lifecycle state of one DMA descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorState {
    /// Available for allocation
    Free,
    /// Allocated to a flip, not yet seen by hardware
    Reserved,
    /// Fetched by the channel
    Loaded,
    /// Transfer finished
    Done,
    /// Channel overflowed while using it
    Overrun,
}

impl DescriptorState {
    /// Most advanced state present in a status word.
    pub(crate) const fn from_bits(bits: u32) -> Self {
        if bits & status::OVERRUN != 0 {
            Self::Overrun
        } else if bits & status::DONE != 0 {
            Self::Done
        } else if bits & status::LOADED != 0 {
            Self::Loaded
        } else if bits & status::RESERVED != 0 {
            Self::Reserved
        } else {
            Self::Free
        }
    }
}

/// One hardware DMA descriptor plus its software status.
///
/// The first three words are read by the controller and must stay in this
/// order; the alignment matches what the DSCR registers expect.
#[repr(C, align(8))]
pub(crate) struct DmaDescriptor {
    addr: VolatileCell<u32>,
    ctrl: VolatileCell<u32>,
    next: VolatileCell<u32>,
    status: VolatileCell<u32>,
}

impl DmaDescriptor {
    /// Create a zeroed, free descriptor
    pub const fn new() -> Self {
        Self {
            addr: VolatileCell::new(0),
            ctrl: VolatileCell::new(0),
            next: VolatileCell::new(0),
            status: VolatileCell::new(0),
        }
    }

    /// Bus address of this descriptor
    #[inline(always)]
    pub fn bus_addr(&self) -> u32 {
        self as *const Self as usize as u32
    }

    /// Reset all words and link the descriptor to itself
    pub fn init(&self) {
        self.addr.set(0);
        self.ctrl.set(0);
        self.next.set(self.bus_addr());
        self.status.set(0);
    }

    /// Buffer address
    #[inline(always)]
    pub fn addr(&self) -> u32 {
        self.addr.get()
    }

    /// Set the buffer address
    #[inline(always)]
    pub fn set_addr(&self, addr: u32) {
        self.addr.set(addr);
    }

    /// Control word
    #[inline(always)]
    pub fn ctrl(&self) -> u32 {
        self.ctrl.get()
    }

    /// Replace the control word
    #[inline(always)]
    pub fn set_ctrl(&self, ctrl: u32) {
        self.ctrl.set(ctrl);
    }

    /// Set bits in the control word
    #[inline(always)]
    pub fn latch_ctrl(&self, bits: u32) {
        self.ctrl.update(|c| c | bits);
    }

    /// Clear bits in the control word
    #[inline(always)]
    pub fn clear_ctrl(&self, bits: u32) {
        self.ctrl.update(|c| c & !bits);
    }

    /// Link address
    #[inline(always)]
    pub fn next(&self) -> u32 {
        self.next.get()
    }

    /// Point the link word at the descriptor's current address
    #[inline(always)]
    pub fn relink(&self) {
        self.next.set(self.bus_addr());
    }

    /// Raw status bits
    #[inline(always)]
    pub fn status_bits(&self) -> u32 {
        self.status.get()
    }

    /// Lifecycle state
    #[inline(always)]
    pub fn state(&self) -> DescriptorState {
        DescriptorState::from_bits(self.status.get())
    }

    /// True if the descriptor can be allocated
    #[inline(always)]
    pub fn is_free(&self) -> bool {
        self.status.get() == 0
    }

    /// Add lifecycle bits
    #[inline(always)]
    pub fn mark(&self, bits: u32) {
        self.status.update(|s| s | bits);
    }

    /// Return the descriptor to the free state
    #[inline(always)]
    pub fn release(&self) {
        self.status.set(0);
    }
}

impl Default for DmaDescriptor {
    fn default() -> Self {
        Self::new()
    }
}
