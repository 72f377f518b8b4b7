//! Fixed descriptor pool of one layer.
//!
//! Descriptors are never individually freed: allocation flips a free entry to
//! reserved and release simply clears its status. The pool is small (at most
//! [`MAX_DESCRIPTORS`] entries), so allocation is a linear scan from the start.

use super::descriptor::{DescriptorState, DmaDescriptor, status};
use crate::driver::error::{DmaError, DmaResult};
use crate::internal::constants::{MAX_DESCRIPTORS, MAX_PLANES};

/// Descriptors owned by one flip request, indexed by plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct DescriptorSet {
    slots: [Option<u8>; MAX_PLANES],
}

impl DescriptorSet {
    /// Set owning no descriptors
    pub const EMPTY: Self = Self {
        slots: [None; MAX_PLANES],
    };

    /// Pool index of the descriptor used by `plane`
    #[inline]
    pub fn get(&self, plane: usize) -> Option<usize> {
        self.slots.get(plane).copied().flatten().map(usize::from)
    }

    /// Iterate over `(plane, pool index)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(plane, slot)| slot.map(|idx| (plane, usize::from(idx))))
    }

    /// Remove and return the descriptor of `plane`
    fn take(&mut self, plane: usize) -> Option<usize> {
        self.slots
            .get_mut(plane)
            .and_then(Option::take)
            .map(usize::from)
    }
}

/// Number of descriptors in each lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PoolCensus {
    /// Available for allocation
    pub free: usize,
    /// Owned by a flip, not yet fetched
    pub reserved: usize,
    /// Fetched by the channel
    pub loaded: usize,
    /// Transfer finished
    pub done: usize,
    /// Hit by an overrun
    pub overrun: usize,
}

impl PoolCensus {
    /// Total number of descriptors counted
    pub const fn total(&self) -> usize {
        self.free + self.reserved + self.loaded + self.done + self.overrun
    }

    /// Number of descriptors not available for allocation
    pub const fn in_use(&self) -> usize {
        self.total() - self.free
    }
}

/// Per-layer pool of DMA descriptors.
pub(crate) struct DescriptorPool<const N: usize = MAX_DESCRIPTORS> {
    descriptors: [DmaDescriptor; N],
    /// Number of entries in use for this layer (`max_planes * 4`)
    len: usize,
}

impl<const N: usize> DescriptorPool<N> {
    /// Create an empty pool (const, suitable for static initialization)
    pub const fn new() -> Self {
        Self {
            descriptors: [const { DmaDescriptor::new() }; N],
            len: 0,
        }
    }

    /// Reset every descriptor and activate the first `len` entries.
    ///
    /// Each descriptor is linked to its own address; call
    /// [`DmaDescriptor::relink`] again if the pool has moved since.
    pub fn init(&mut self, len: usize) {
        self.len = len.min(N);
        for desc in &self.descriptors {
            desc.init();
        }
    }

    /// Descriptor at pool index `idx`
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&DmaDescriptor> {
        self.descriptors[..self.len].get(idx)
    }

    /// Reserve `count` free descriptors, one per plane.
    ///
    /// Either all of them are reserved or none is: on shortage the partial
    /// reservation is rolled back and [`DmaError::Exhausted`] returned.
    pub fn allocate(&mut self, count: usize) -> DmaResult<DescriptorSet> {
        if count > MAX_PLANES {
            return Err(DmaError::Exhausted);
        }

        let mut set = DescriptorSet::EMPTY;
        let mut plane = 0;

        for (idx, desc) in self.descriptors[..self.len].iter().enumerate() {
            if plane == count {
                break;
            }
            if desc.is_free() {
                desc.mark(status::RESERVED);
                set.slots[plane] = Some(idx as u8);
                plane += 1;
            }
        }

        if plane < count {
            self.release_set(&mut set);
            return Err(DmaError::Exhausted);
        }

        Ok(set)
    }

    /// Return one descriptor to the free state
    #[inline]
    pub fn release(&self, idx: usize) {
        if let Some(desc) = self.get(idx) {
            desc.release();
        }
    }

    /// Release every descriptor in `set` and empty it
    pub fn release_set(&self, set: &mut DescriptorSet) {
        self.release_from(set, 0);
    }

    /// Release the descriptors of planes `first..` and drop them from `set`
    pub fn release_from(&self, set: &mut DescriptorSet, first: usize) {
        for plane in first..MAX_PLANES {
            if let Some(idx) = set.take(plane) {
                self.release(idx);
            }
        }
    }

    /// Mark every active descriptor free (channel teardown)
    pub fn release_all(&self) {
        for desc in &self.descriptors[..self.len] {
            desc.release();
        }
    }

    /// Count descriptors by lifecycle state
    pub fn census(&self) -> PoolCensus {
        let mut census = PoolCensus::default();
        for desc in &self.descriptors[..self.len] {
            match desc.state() {
                DescriptorState::Free => census.free += 1,
                DescriptorState::Reserved => census.reserved += 1,
                DescriptorState::Loaded => census.loaded += 1,
                DescriptorState::Done => census.done += 1,
                DescriptorState::Overrun => census.overrun += 1,
            }
        }
        census
    }
}

impl<const N: usize> Default for DescriptorPool<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(len: usize) -> DescriptorPool<12> {
        let mut pool = DescriptorPool::new();
        pool.init(len);
        pool
    }

    #[test]
    fn new_pool_is_inactive() {
        let pool: DescriptorPool<8> = DescriptorPool::new();
        assert_eq!(pool.census().total(), 0);
        assert!(pool.get(0).is_none());
    }

    #[test]
    fn init_clamps_to_capacity() {
        let pool = {
            let mut p: DescriptorPool<4> = DescriptorPool::new();
            p.init(12);
            p
        };
        assert_eq!(pool.census().total(), 4);
        assert!(pool.get(3).is_some());
        assert!(pool.get(4).is_none());
    }

    #[test]
    fn init_links_each_descriptor_to_itself() {
        let mut pool: DescriptorPool<12> = DescriptorPool::new();
        pool.init(4);
        for idx in 0..4 {
            let desc = pool.get(idx).unwrap();
            assert_eq!(desc.next(), desc.bus_addr());
        }
    }

    #[test]
    fn relink_after_move_restores_self_links() {
        let pool = pool(4);
        for idx in 0..4 {
            let desc = pool.get(idx).unwrap();
            desc.relink();
            assert_eq!(desc.next(), desc.bus_addr());
        }
    }

    #[test]
    fn allocate_takes_first_free_entries() {
        let mut pool = pool(4);
        let set = pool.allocate(2).unwrap();

        assert_eq!(set.get(0), Some(0));
        assert_eq!(set.get(1), Some(1));
        assert_eq!(set.get(2), None);
        assert_eq!(set.iter().count(), 2);
        assert_eq!(pool.census().reserved, 2);
    }

    #[test]
    fn allocate_skips_busy_entries() {
        let mut pool = pool(4);
        let first = pool.allocate(1).unwrap();
        let second = pool.allocate(2).unwrap();
        pool.release(first.get(0).unwrap());

        let third = pool.allocate(2).unwrap();
        assert_eq!(second.get(0), Some(1));
        assert_eq!(third.get(0), Some(0));
        assert_eq!(third.get(1), Some(3));
    }

    #[test]
    fn allocate_shortage_rolls_back() {
        let mut pool = pool(4);
        let _held = pool.allocate(3).unwrap();

        assert_eq!(pool.allocate(2), Err(DmaError::Exhausted));

        let census = pool.census();
        assert_eq!(census.reserved, 3);
        assert_eq!(census.free, 1);
    }

    #[test]
    fn allocate_more_than_max_planes_fails() {
        let mut pool = pool(12);
        assert_eq!(pool.allocate(MAX_PLANES + 1), Err(DmaError::Exhausted));
        assert_eq!(pool.census().free, 12);
    }

    #[test]
    fn release_from_keeps_leading_planes() {
        let mut pool = pool(12);
        let mut set = pool.allocate(3).unwrap();

        pool.release_from(&mut set, 1);

        assert_eq!(set.iter().count(), 1);
        assert_eq!(set.get(0), Some(0));
        assert_eq!(pool.census().reserved, 1);
    }

    #[test]
    fn release_set_empties_the_set() {
        let mut pool = pool(12);
        let mut set = pool.allocate(3).unwrap();

        pool.release_set(&mut set);

        assert_eq!(set, DescriptorSet::EMPTY);
        assert_eq!(pool.census().free, 12);
    }

    #[test]
    fn census_always_sums_to_pool_size() {
        let mut pool = pool(8);
        let a = pool.allocate(3).unwrap();
        let b = pool.allocate(3).unwrap();

        pool.get(a.get(0).unwrap()).unwrap().mark(status::LOADED);
        pool.get(a.get(1).unwrap()).unwrap().mark(status::DONE);
        pool.get(b.get(2).unwrap()).unwrap().mark(status::OVERRUN);

        let census = pool.census();
        assert_eq!(census.total(), 8);
        assert_eq!(census.free, 2);
        assert_eq!(census.reserved, 3);
        assert_eq!(census.loaded, 1);
        assert_eq!(census.done, 1);
        assert_eq!(census.overrun, 1);
        assert_eq!(census.in_use(), 6);
    }

    #[test]
    fn release_all_frees_pool() {
        let mut pool = pool(6);
        let _a = pool.allocate(3).unwrap();
        let _b = pool.allocate(3).unwrap();
        assert_eq!(pool.census().free, 0);

        pool.release_all();
        assert_eq!(pool.census().free, 6);
    }

    #[test]
    fn set_iter_yields_plane_and_index() {
        let mut pool = pool(6);
        let _skip = pool.allocate(1).unwrap();
        let set = pool.allocate(2).unwrap();

        let mut it = set.iter();
        assert_eq!(it.next(), Some((0, 1)));
        assert_eq!(it.next(), Some((1, 2)));
        assert_eq!(it.next(), None);
    }
}
