//! Testing utilities and mock implementations
//!
//! This module provides mock implementations for testing the layer engine
//! on the host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::RefCell;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::collections::HashMap;
use std::sync::Arc;
use std::vec::Vec;

use crate::driver::config::LayerConfig;
use crate::driver::flip::Framebuffer;
use crate::hal::RegisterBus;
use crate::internal::register::layer::{
    CHDR_DMA_CHAN, CHDR_RST, CHER_DMA_CHAN, CHSR_DMA_CHAN, LayerRegs,
};

// =============================================================================
// Mock Register Bus
// =============================================================================

/// Mock register bus emulating one layer block
///
/// Plain registers keep the last value written. The interrupt and channel
/// registers of the layer behave like the hardware:
/// - IER/IDR set and clear bits of IMR
/// - ISR is cleared when read
/// - CHER/CHDR set and clear the channel-enabled bit of CHSR
///
/// # Example
///
/// ```ignore
/// let bus = MockRegisterBus::for_layer(&config);
/// bus.raise_plane(0, ADD_IRQ);
/// layer.handle_interrupt();
/// ```
#[derive(Debug)]
pub struct MockRegisterBus {
    regs: LayerRegs,
    /// Register values: offset -> value
    registers: RefCell<HashMap<usize, u32>>,
    /// Record of writes: (offset, value)
    write_log: RefCell<Vec<(usize, u32)>>,
    /// Number of reads performed
    reads: RefCell<usize>,
}

impl MockRegisterBus {
    /// Create a mock for the layer described by `config`
    pub fn for_layer(config: &LayerConfig) -> Self {
        Self {
            regs: LayerRegs::new(config.regs_offset, config.max_planes),
            registers: RefCell::new(HashMap::new()),
            write_log: RefCell::new(Vec::new()),
            reads: RefCell::new(0),
        }
    }

    /// Register map of the emulated layer
    pub fn regs(&self) -> LayerRegs {
        self.regs
    }

    /// Set a register value without logging a write
    pub fn set_register(&self, offset: usize, value: u32) {
        self.registers.borrow_mut().insert(offset, value);
    }

    /// Current value of a register (0 if never written)
    pub fn get_register(&self, offset: usize) -> u32 {
        self.registers.borrow().get(&offset).copied().unwrap_or(0)
    }

    /// Latch interrupt bits in ISR
    pub fn raise(&self, bits: u32) {
        let isr = self.regs.isr();
        let value = self.get_register(isr) | bits;
        self.set_register(isr, value);
    }

    /// Latch interrupt bits in the 8-bit field of `plane`
    pub fn raise_plane(&self, plane: usize, bits: u32) {
        self.raise(bits << (8 * plane));
    }

    /// Report the channel as stopped or running in CHSR
    pub fn set_channel_running(&self, running: bool) {
        let value = if running { CHSR_DMA_CHAN } else { 0 };
        self.set_register(self.regs.chsr(), value);
    }

    /// All writes so far
    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.write_log.borrow().clone()
    }

    /// Values written to one register, oldest first
    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.write_log
            .borrow()
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Offsets written, in order
    pub fn written_offsets(&self) -> Vec<usize> {
        self.write_log.borrow().iter().map(|(o, _)| *o).collect()
    }

    /// Clear the write log
    pub fn clear_writes(&self) {
        self.write_log.borrow_mut().clear();
    }

    /// Number of reads performed
    pub fn read_count(&self) -> usize {
        *self.reads.borrow()
    }
}

impl RegisterBus for MockRegisterBus {
    fn read(&mut self, offset: usize) -> u32 {
        *self.reads.borrow_mut() += 1;
        let value = self.get_register(offset);
        if offset == self.regs.isr() {
            self.set_register(offset, 0);
        }
        value
    }

    fn write(&mut self, offset: usize, value: u32) {
        self.write_log.borrow_mut().push((offset, value));

        let regs = self.regs;
        if offset == regs.ier() {
            let imr = self.get_register(regs.imr()) | value;
            self.set_register(regs.imr(), imr);
        } else if offset == regs.idr() {
            let imr = self.get_register(regs.imr()) & !value;
            self.set_register(regs.imr(), imr);
        } else if offset == regs.cher() {
            if value & CHER_DMA_CHAN != 0 {
                self.set_channel_running(true);
            }
        } else if offset == regs.chdr() {
            if value & (CHDR_DMA_CHAN | CHDR_RST) != 0 {
                self.set_channel_running(false);
            }
        } else {
            self.set_register(offset, value);
        }
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay provider for testing timeout logic
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Total nanoseconds delayed
    total_ns: RefCell<u64>,
}

impl MockDelay {
    /// Create a new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        *self.total_ns.borrow()
    }

    /// Get total microseconds that were "delayed"
    pub fn total_us(&self) -> u64 {
        self.total_ns() / 1_000
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.borrow_mut() += u64::from(ns);
    }
}

// =============================================================================
// Test Framebuffer
// =============================================================================

/// Framebuffer backed by fixed plane addresses
#[derive(Debug)]
pub struct TestFramebuffer {
    planes: Vec<u32>,
}

/// Reference-counted handle used as the layer framebuffer in tests
pub type TestFb = Arc<TestFramebuffer>;

/// Create a framebuffer whose planes start at `addrs`
pub fn framebuffer(addrs: &[u32]) -> TestFb {
    Arc::new(TestFramebuffer {
        planes: addrs.to_vec(),
    })
}

/// Number of live references to `fb`
pub fn refs(fb: &TestFb) -> usize {
    Arc::strong_count(fb)
}

impl Framebuffer for Arc<TestFramebuffer> {
    fn num_planes(&self) -> usize {
        self.planes.len()
    }

    fn plane_addr(&self, plane: usize) -> u32 {
        self.planes.get(plane).copied().unwrap_or(0)
    }
}

// =============================================================================
// Callback Counters
// =============================================================================

const COUNTER_SLOTS: usize = 256;

static NEXT_COUNTER: AtomicUsize = AtomicUsize::new(0);
static FINISHED: [AtomicUsize; COUNTER_SLOTS] = [const { AtomicUsize::new(0) }; COUNTER_SLOTS];

/// Reserve a counter slot unique to the calling test
///
/// Pass the slot as the callback argument of [`count_finished`].
pub fn counter_slot() -> usize {
    NEXT_COUNTER.fetch_add(1, Ordering::SeqCst) % COUNTER_SLOTS
}

/// Finished callback incrementing the counter selected by `arg`
pub fn count_finished(arg: usize) {
    FINISHED[arg % COUNTER_SLOTS].fetch_add(1, Ordering::SeqCst);
}

/// Number of times [`count_finished`] ran for `slot`
pub fn finished_count(slot: usize) -> usize {
    FINISHED[slot % COUNTER_SLOTS].load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::delay::DelayNs;

    fn bus() -> MockRegisterBus {
        MockRegisterBus::for_layer(&LayerConfig::new().with_regs_offset(0x40))
    }

    #[test]
    fn mock_bus_stores_and_logs_writes() {
        let mut bus = bus();
        bus.write(0x100, 5);
        assert_eq!(bus.read(0x100), 5);
        assert_eq!(bus.writes(), [(0x100, 5)]);
        assert_eq!(bus.read_count(), 1);
    }

    #[test]
    fn mock_bus_isr_is_read_to_clear() {
        let mut bus = bus();
        let isr = bus.regs().isr();
        bus.raise_plane(1, 0x10);
        assert_eq!(bus.read(isr), 0x1000);
        assert_eq!(bus.read(isr), 0);
    }

    #[test]
    fn mock_bus_tracks_interrupt_mask() {
        let mut bus = bus();
        let regs = bus.regs();
        bus.write(regs.ier(), 0xFF);
        bus.write(regs.idr(), 0x0F);
        assert_eq!(bus.read(regs.imr()), 0xF0);
    }

    #[test]
    fn mock_bus_tracks_channel_status() {
        let mut bus = bus();
        let regs = bus.regs();
        bus.write(regs.cher(), CHER_DMA_CHAN);
        assert_eq!(bus.read(regs.chsr()), CHSR_DMA_CHAN);
        bus.write(regs.chdr(), CHDR_RST);
        assert_eq!(bus.read(regs.chsr()), 0);
    }

    #[test]
    fn mock_delay_accumulates() {
        let mut delay = MockDelay::new();
        delay.delay_us(100);
        delay.delay_us(50);
        assert_eq!(delay.total_us(), 150);
    }

    #[test]
    fn framebuffer_reports_planes() {
        let fb = framebuffer(&[0x1000, 0x2000]);
        assert_eq!(fb.num_planes(), 2);
        assert_eq!(fb.plane_addr(1), 0x2000);
        assert_eq!(fb.plane_addr(5), 0);
        assert_eq!(refs(&fb), 1);
    }

    #[test]
    fn counters_are_per_slot() {
        let a = counter_slot();
        let b = counter_slot();
        count_finished(a);
        count_finished(a);
        assert_eq!(finished_count(a), 2);
        assert_eq!(finished_count(b), 0);
    }
}
