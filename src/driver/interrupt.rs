//! Interrupt status handling for HLCDC layers.
//!
//! Layer interrupt registers hold one 8-bit field per plane. This module
//! provides [`InterruptMask`] for building the enable mask and
//! [`InterruptStatus`] / [`PlaneStatus`] for decoding what fired.

use crate::internal::constants::MAX_PLANES;
use crate::internal::register::layer::plane::{
    ADD_IRQ, ALL_IRQS, DMA_IRQ, DONE_IRQ, DSCR_IRQ, FIELD_BITS, FIELD_MASK, OVR_IRQ,
};

// =============================================================================
// Interrupt Mask
// =============================================================================

/// Per-plane interrupt enable mask as written to IER/IDR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptMask(u32);

impl InterruptMask {
    /// No interrupt enabled
    pub const NONE: Self = Self(0);

    /// Enable DMA, descriptor, add, done and overrun for `planes` planes
    pub const fn for_planes(planes: usize) -> Self {
        let mut raw = 0;
        let mut plane = 0;
        while plane < planes && plane < MAX_PLANES {
            raw |= ALL_IRQS << (FIELD_BITS * plane as u32);
            plane += 1;
        }
        Self(raw)
    }

    /// Create from a raw register value
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw register value
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// 8-bit field of `plane`
    pub const fn plane(&self, plane: usize) -> u8 {
        if plane >= MAX_PLANES {
            return 0;
        }
        ((self.0 >> (FIELD_BITS * plane as u32)) & FIELD_MASK) as u8
    }
}

// =============================================================================
// Interrupt Status
// =============================================================================

/// Decoded status of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PlaneStatus {
    bits: u8,
}

impl PlaneStatus {
    /// Create from an 8-bit plane field
    #[inline]
    pub const fn from_raw(bits: u8) -> Self {
        Self { bits }
    }

    /// Raw 8-bit field
    #[inline]
    pub const fn raw(&self) -> u8 {
        self.bits
    }

    /// True if nothing fired for this plane
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// End of DMA transfer
    #[inline]
    pub const fn dma(&self) -> bool {
        self.bits as u32 & DMA_IRQ != 0
    }

    /// Head or descriptor loaded (the flip is now on screen)
    #[inline]
    pub const fn loaded(&self) -> bool {
        self.bits as u32 & (ADD_IRQ | DSCR_IRQ) != 0
    }

    /// Bits reporting the load, as latched in the descriptor CTRL word
    #[inline]
    pub const fn loaded_bits(&self) -> u32 {
        self.bits as u32 & (ADD_IRQ | DSCR_IRQ)
    }

    /// Transfer done
    #[inline]
    pub const fn done(&self) -> bool {
        self.bits as u32 & DONE_IRQ != 0
    }

    /// Overflow
    #[inline]
    pub const fn overrun(&self) -> bool {
        self.bits as u32 & OVR_IRQ != 0
    }
}

/// Layer interrupt status (ISR masked by IMR).
///
/// # Example
///
/// ```ignore
/// let status = InterruptStatus::from_raw(isr & imr);
/// if status.any_overrun(max_planes) {
///     // channel must be reset
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptStatus(u32);

impl InterruptStatus {
    /// Create from a raw register value
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw register value
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// True if any bit is set
    #[inline]
    pub const fn any(&self) -> bool {
        self.0 != 0
    }

    /// Status of `plane`
    #[inline]
    pub const fn plane(&self, plane: usize) -> PlaneStatus {
        if plane >= MAX_PLANES {
            return PlaneStatus::from_raw(0);
        }
        PlaneStatus::from_raw(((self.0 >> (FIELD_BITS * plane as u32)) & FIELD_MASK) as u8)
    }

    /// True if any of the first `planes` planes overflowed
    pub fn any_overrun(&self, planes: usize) -> bool {
        (0..planes).any(|p| self.plane(p).overrun())
    }
}
