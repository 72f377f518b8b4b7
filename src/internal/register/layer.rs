//! Layer Register Block Definitions
//!
//! Every HLCDC layer (base, overlays, high-end overlay, cursor) exposes the
//! same channel/interrupt/plane register layout at its own offset inside the
//! controller. The configuration registers follow the plane registers, so
//! their position depends on how many planes the layer can fetch.

// =============================================================================
// Register Offsets (relative to the layer block)
// =============================================================================

/// Channel Enable Register offset
pub const CHER_OFFSET: usize = 0x00;
/// Channel Disable Register offset
pub const CHDR_OFFSET: usize = 0x04;
/// Channel Status Register offset
pub const CHSR_OFFSET: usize = 0x08;
/// Interrupt Enable Register offset
pub const IER_OFFSET: usize = 0x0C;
/// Interrupt Disable Register offset
pub const IDR_OFFSET: usize = 0x10;
/// Interrupt Mask Register offset
pub const IMR_OFFSET: usize = 0x14;
/// Interrupt Status Register offset (read-to-clear)
pub const ISR_OFFSET: usize = 0x18;

/// Offset of the first plane register group
const PLANE_BASE_OFFSET: usize = 0x1C;
/// Size of one plane register group (HEAD, ADDR, CTRL, NEXT)
const PLANE_STRIDE: usize = 0x10;

// =============================================================================
// Channel Enable / Disable / Status Bits
// =============================================================================

/// CHER: enable the DMA channel (CHEN)
pub const CHER_DMA_CHAN: u32 = 1 << 0;
/// CHER: latch configuration registers on next frame (UPDATEEN)
pub const CHER_UPDATE: u32 = 1 << 1;
/// CHER: append the HEAD descriptor to the running queue (A2QEN)
pub const CHER_A2Q: u32 = 1 << 2;

/// CHDR: disable the DMA channel (CHDIS)
pub const CHDR_DMA_CHAN: u32 = 1 << 0;
/// CHDR: reset the channel (CHRST)
pub const CHDR_RST: u32 = 1 << 8;

/// CHSR: channel enabled
pub const CHSR_DMA_CHAN: u32 = 1 << 0;

// =============================================================================
// Per-Plane Interrupt / Descriptor Control Bits
// =============================================================================

/// Per-plane bit fields shared by IER/IDR/IMR/ISR and descriptor CTRL words.
///
/// Each plane owns one 8-bit field; plane `n` starts at bit `8 * n`.
pub mod plane {
    /// Width of one plane field in the interrupt registers
    pub const FIELD_BITS: u32 = 8;
    /// Mask of one plane field
    pub const FIELD_MASK: u32 = 0xFF;

    /// Descriptor fetch enable (CTRL only)
    pub const DFETCH: u32 = 1 << 0;
    /// Line fetch enable (CTRL only)
    pub const LFETCH: u32 = 1 << 1;
    /// End of DMA transfer
    pub const DMA_IRQ: u32 = 1 << 2;
    /// Descriptor loaded
    pub const DSCR_IRQ: u32 = 1 << 3;
    /// Head descriptor added to the queue (address loaded)
    pub const ADD_IRQ: u32 = 1 << 4;
    /// End of list, transfer done
    pub const DONE_IRQ: u32 = 1 << 5;
    /// Overflow (the channel could not keep up with the display)
    pub const OVR_IRQ: u32 = 1 << 6;

    /// Interrupt sources enabled for every plane at initialization
    pub const ALL_IRQS: u32 = DMA_IRQ | DSCR_IRQ | ADD_IRQ | DONE_IRQ | OVR_IRQ;

    /// CTRL word for a descriptor fetched immediately on channel enable
    pub const CTRL_IMMEDIATE: u32 = DFETCH | DMA_IRQ | ADD_IRQ | DONE_IRQ;
    /// CTRL word for a descriptor appended to a running channel
    pub const CTRL_APPEND: u32 = DFETCH | DMA_IRQ | DSCR_IRQ | DONE_IRQ;
}

// =============================================================================
// Layer Register Map
// =============================================================================

/// Register map of one layer block.
///
/// Offsets returned by the accessors are relative to the controller base and
/// can be handed straight to a [`RegisterBus`](crate::hal::RegisterBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRegs {
    /// Offset of the layer block inside the controller
    base: usize,
    /// Number of plane register groups in the block
    max_planes: usize,
}

impl LayerRegs {
    /// Create the register map for a layer block
    pub const fn new(base: usize, max_planes: usize) -> Self {
        Self { base, max_planes }
    }

    /// Channel Enable Register
    #[inline(always)]
    pub const fn cher(&self) -> usize {
        self.base + CHER_OFFSET
    }

    /// Channel Disable Register
    #[inline(always)]
    pub const fn chdr(&self) -> usize {
        self.base + CHDR_OFFSET
    }

    /// Channel Status Register
    #[inline(always)]
    pub const fn chsr(&self) -> usize {
        self.base + CHSR_OFFSET
    }

    /// Interrupt Enable Register
    #[inline(always)]
    pub const fn ier(&self) -> usize {
        self.base + IER_OFFSET
    }

    /// Interrupt Disable Register
    #[inline(always)]
    pub const fn idr(&self) -> usize {
        self.base + IDR_OFFSET
    }

    /// Interrupt Mask Register
    #[inline(always)]
    pub const fn imr(&self) -> usize {
        self.base + IMR_OFFSET
    }

    /// Interrupt Status Register
    #[inline(always)]
    pub const fn isr(&self) -> usize {
        self.base + ISR_OFFSET
    }

    /// Plane `n` HEAD register (descriptor appended by A2Q)
    #[inline(always)]
    pub const fn plane_head(&self, n: usize) -> usize {
        self.base + PLANE_BASE_OFFSET + n * PLANE_STRIDE
    }

    /// Plane `n` ADDR register
    #[inline(always)]
    pub const fn plane_addr(&self, n: usize) -> usize {
        self.plane_head(n) + 0x4
    }

    /// Plane `n` CTRL register
    #[inline(always)]
    pub const fn plane_ctrl(&self, n: usize) -> usize {
        self.plane_head(n) + 0x8
    }

    /// Plane `n` NEXT register
    #[inline(always)]
    pub const fn plane_next(&self, n: usize) -> usize {
        self.plane_head(n) + 0xC
    }

    /// Configuration register `c`, located after the last plane group
    #[inline(always)]
    pub const fn cfg(&self, c: usize) -> usize {
        self.base + PLANE_BASE_OFFSET + self.max_planes * PLANE_STRIDE + c * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_registers_follow_block_base() {
        let regs = LayerRegs::new(0x40, 1);
        assert_eq!(regs.cher(), 0x40);
        assert_eq!(regs.chdr(), 0x44);
        assert_eq!(regs.chsr(), 0x48);
        assert_eq!(regs.ier(), 0x4C);
        assert_eq!(regs.idr(), 0x50);
        assert_eq!(regs.imr(), 0x54);
        assert_eq!(regs.isr(), 0x58);
    }

    #[test]
    fn plane_groups_are_sixteen_bytes_apart() {
        let regs = LayerRegs::new(0, 3);
        assert_eq!(regs.plane_head(0), 0x1C);
        assert_eq!(regs.plane_addr(0), 0x20);
        assert_eq!(regs.plane_ctrl(0), 0x24);
        assert_eq!(regs.plane_next(0), 0x28);
        assert_eq!(regs.plane_head(2), 0x3C);
        assert_eq!(regs.plane_next(2), 0x48);
    }

    #[test]
    fn config_registers_start_after_last_plane() {
        let single = LayerRegs::new(0x140, 1);
        assert_eq!(single.cfg(0), 0x140 + 0x2C);
        assert_eq!(single.cfg(3), 0x140 + 0x38);

        let yuv = LayerRegs::new(0x340, 3);
        assert_eq!(yuv.cfg(0), 0x340 + 0x4C);
    }

    #[test]
    fn descriptor_control_words() {
        assert_eq!(plane::CTRL_IMMEDIATE, 0x35);
        assert_eq!(plane::CTRL_APPEND, 0x2D);
        assert_eq!(plane::ALL_IRQS, 0x7C);
    }
}
