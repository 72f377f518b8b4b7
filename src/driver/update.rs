//! Double-buffered layer updates.
//!
//! Each layer owns two update slots. The producer fills the "next" slot
//! between `update_start` and `update_commit`; a committed slot becomes
//! "pending" until it is applied to the hardware.

use super::flip::FlipRequest;
use crate::internal::constants::MAX_CONFIGS;

/// Set of configuration registers touched by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConfigMask(u32);

impl ConfigMask {
    /// Empty mask
    pub const EMPTY: Self = Self(0);

    /// Create from a raw bitmap
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw bitmap
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// True if no register is marked
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True if register `idx` is marked
    pub const fn contains(&self, idx: usize) -> bool {
        idx < MAX_CONFIGS && self.0 & (1 << idx) != 0
    }

    /// Mark register `idx`; out of range indices are ignored
    pub fn insert(&mut self, idx: usize) {
        if idx < MAX_CONFIGS {
            self.0 |= 1 << idx;
        }
    }

    /// Unmark every register
    pub fn clear(&mut self) {
        self.0 = 0;
    }

    /// Number of marked registers
    pub const fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate over the marked register indices in ascending order
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let raw = self.0;
        (0..MAX_CONFIGS).filter(move |idx| raw & (1 << idx) != 0)
    }
}

/// One of the two update slots of a layer.
pub(crate) struct UpdateSlot<F> {
    /// Registers written since the slot was opened (or inherited)
    pub updated: ConfigMask,
    /// Values to program into the configuration registers
    pub configs: [u32; MAX_CONFIGS],
    /// Flip carried by this update
    pub flip: Option<FlipRequest<F>>,
}

impl<F> UpdateSlot<F> {
    /// Create an empty slot (const, suitable for static initialization)
    pub const fn new() -> Self {
        Self {
            updated: ConfigMask::EMPTY,
            configs: [0; MAX_CONFIGS],
            flip: None,
        }
    }

    /// Read-modify-write one pending register value and mark it dirty
    pub fn update_cfg(&mut self, idx: usize, mask: u32, value: u32) {
        if let Some(cfg) = self.configs.get_mut(idx) {
            *cfg = (*cfg & !mask) | (value & mask);
            self.updated.insert(idx);
        }
    }

    /// Clear the slot, handing back its flip for retirement
    pub fn reset(&mut self) -> Option<FlipRequest<F>> {
        self.updated.clear();
        self.configs = [0; MAX_CONFIGS];
        self.flip.take()
    }
}

impl<F> Default for UpdateSlot<F> {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the slot that is not `pending`
#[inline]
pub(crate) const fn other_slot(pending: Option<usize>) -> usize {
    match pending {
        Some(0) => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec;

    use super::*;
    use crate::internal::dma::DescriptorSet;

    #[test]
    fn config_mask_insert_and_iter() {
        let mut mask = ConfigMask::EMPTY;
        mask.insert(0);
        mask.insert(5);
        mask.insert(31);
        mask.insert(32);

        assert!(mask.contains(5));
        assert!(!mask.contains(4));
        assert!(!mask.contains(32));
        assert_eq!(mask.count(), 3);
        assert_eq!(mask.iter().collect::<Vec<_>>(), [0, 5, 31]);
    }

    #[test]
    fn config_mask_clear() {
        let mut mask = ConfigMask::from_raw(0xF0);
        assert!(!mask.is_empty());
        mask.clear();
        assert!(mask.is_empty());
        assert_eq!(mask.raw(), 0);
    }

    #[test]
    fn update_cfg_applies_mask() {
        let mut slot: UpdateSlot<u32> = UpdateSlot::new();
        slot.configs[2] = 0xFFFF_0000;

        slot.update_cfg(2, 0x0000_FF00, 0x1234_5678);

        assert_eq!(slot.configs[2], 0xFFFF_5600);
        assert!(slot.updated.contains(2));
        assert_eq!(slot.updated.count(), 1);
    }

    #[test]
    fn update_cfg_out_of_range_is_ignored() {
        let mut slot: UpdateSlot<u32> = UpdateSlot::new();
        slot.update_cfg(MAX_CONFIGS, !0, 1);
        assert!(slot.updated.is_empty());
    }

    #[test]
    fn reset_returns_flip_and_clears() {
        let mut slot: UpdateSlot<u32> = UpdateSlot::new();
        slot.update_cfg(1, !0, 7);
        slot.flip = Some(FlipRequest::new(DescriptorSet::EMPTY));

        assert!(slot.reset().is_some());
        assert!(slot.flip.is_none());
        assert!(slot.updated.is_empty());
        assert_eq!(slot.configs[1], 0);
    }

    #[test]
    fn other_slot_alternates() {
        assert_eq!(other_slot(None), 0);
        assert_eq!(other_slot(Some(0)), 1);
        assert_eq!(other_slot(Some(1)), 0);
    }
}
