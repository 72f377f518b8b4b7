//! HLCDC layer DMA and update engine.
//!
//! A [`Layer`] owns everything needed to stream framebuffers to one hardware
//! layer: the descriptor pool, the DMA channel bookkeeping, the two update
//! slots and the deferred release queue.
//!
//! # Update protocol
//!
//! ```ignore
//! layer.update_start()?;
//! let old = layer.update_set_fb(Some(&fb), &[0]);
//! layer.update_cfg(LAYER_CFG_POS, 0xFFFF_FFFF, pos);
//! layer.update_set_finished(page_flip_done, crtc_id);
//! layer.update_commit();
//! drop(old);
//! ```
//!
//! `update_commit` applies the update immediately when the channel has no
//! queued flip; otherwise it stays pending and the interrupt handler applies
//! it once the queued flip has been loaded.
//!
//! # Memory location
//!
//! Descriptors link to their own address. The link is refreshed every time a
//! descriptor is handed to the hardware, so a layer may move between `init`
//! and the first flip, or after `cleanup`, but never while the channel runs.
//! A `static` (see [`SharedLayer`]) is the usual home.
//!
//! [`SharedLayer`]: crate::sync::SharedLayer

use embedded_hal::delay::DelayNs;

use super::config::{ChannelState, LayerConfig};
use super::error::{ConfigError, DmaError, IoError, Result};
use super::flip::{FinishedCallback, FlipRequest, Framebuffer};
use super::interrupt::{InterruptMask, InterruptStatus};
use super::update::{UpdateSlot, other_slot};
use crate::hal::RegisterBus;
use crate::internal::constants::{CHANNEL_POLL_INTERVAL_US, MAX_CONFIGS, UPDATE_SLOTS};
use crate::internal::dma::{DescriptorPool, DmaChannel, PoolCensus, ReleaseQueue, status};
use crate::internal::register::layer::{
    CHDR_RST, CHER_A2Q, CHER_DMA_CHAN, CHER_UPDATE, CHSR_DMA_CHAN, LayerRegs, plane,
};

#[cfg(feature = "log")]
use log::{debug, trace, warn};

/// DMA and update engine of one HLCDC layer
///
/// # Type Parameters
/// * `B` - Register bus giving access to the controller
/// * `F` - Framebuffer handle (cloning takes a reference)
pub struct Layer<B, F> {
    config: LayerConfig,
    regs: LayerRegs,
    bus: B,
    pool: DescriptorPool,
    channel: DmaChannel<F>,
    slots: [UpdateSlot<F>; UPDATE_SLOTS],
    /// Committed slot waiting to be applied
    pending: Option<usize>,
    /// Slot being filled by the producer
    next: Option<usize>,
    /// Framebuffer references waiting to be dropped outside the lock
    gc: ReleaseQueue<F>,
    irq_mask: InterruptMask,
    overruns: u32,
    initialized: bool,
}

impl<B: RegisterBus, F: Framebuffer> Layer<B, F> {
    /// Create a layer (const, suitable for static initialization)
    ///
    /// Nothing touches the hardware until [`init`](Self::init).
    pub const fn new(bus: B, config: LayerConfig) -> Self {
        Self {
            config,
            regs: LayerRegs::new(config.regs_offset, config.max_planes),
            bus,
            pool: DescriptorPool::new(),
            channel: DmaChannel::new(),
            slots: [const { UpdateSlot::new() }; UPDATE_SLOTS],
            pending: None,
            next: None,
            gc: ReleaseQueue::new(),
            irq_mask: InterruptMask::NONE,
            overruns: 0,
            initialized: false,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Reset the channel and prepare the layer for updates
    ///
    /// Resets the DMA channel, links every descriptor to itself, flushes the
    /// interrupt status and enables the DMA, descriptor, add, done and
    /// overrun interrupts of every plane.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Err(ConfigError::AlreadyInitialized.into());
        }
        self.config.validate()?;

        self.regs = LayerRegs::new(self.config.regs_offset, self.config.max_planes);
        self.bus.write(self.regs.chdr(), CHDR_RST);

        self.pool.init(self.config.pool_size());
        self.channel = DmaChannel::new();
        for slot in &mut self.slots {
            slot.reset();
        }
        self.pending = None;
        self.next = None;
        self.overruns = 0;

        // Flush status register
        self.bus.write(self.regs.idr(), 0xFFFF_FFFF);
        let _ = self.bus.read(self.regs.isr());

        self.irq_mask = InterruptMask::for_planes(self.config.max_planes);
        self.bus.write(self.regs.ier(), self.irq_mask.raw());

        self.initialized = true;

        #[cfg(feature = "log")]
        debug!(
            "{}: initialized, {} planes, {} descriptors",
            self.config.name,
            self.config.max_planes,
            self.config.pool_size()
        );

        Ok(())
    }

    /// Stop the layer and release everything it holds
    ///
    /// Disables all interrupts, resets the channel and returns every
    /// descriptor to the pool. Framebuffers of live flips go to the release
    /// queue. The layer can be initialized again afterwards.
    pub fn cleanup(&mut self) {
        self.bus.write(self.regs.idr(), 0xFFFF_FFFF);
        self.bus.write(self.regs.chdr(), CHDR_RST);

        let queued = self.channel.queue.take();
        self.retire(queued);
        let cur = self.channel.cur.take();
        self.retire(cur);
        for idx in 0..UPDATE_SLOTS {
            let flip = self.slots[idx].reset();
            self.retire(flip);
        }

        self.pool.release_all();
        self.channel.state = ChannelState::Disabled;
        self.pending = None;
        self.next = None;
        self.irq_mask = InterruptMask::NONE;
        self.initialized = false;

        #[cfg(feature = "log")]
        debug!("{}: cleaned up", self.config.name);
    }

    // =========================================================================
    // Update Transactions
    // =========================================================================

    /// Open an update transaction on the free slot
    ///
    /// Reserves `max_planes` descriptors for a new flip. If an update is
    /// pending, its configuration, dirty registers and framebuffer are
    /// carried over; otherwise the configuration is read back from the
    /// hardware.
    ///
    /// # Errors
    ///
    /// - [`DmaError::Exhausted`] if not enough descriptors are free
    /// - [`DmaError::ReleaseQueueFull`] if released framebuffers need collecting
    /// - [`IoError::InvalidState`] if a transaction is already open
    ///
    /// Nothing changes when an error is returned.
    pub fn update_start(&mut self) -> Result<()> {
        self.ensure_initialized()?;

        if self.next.is_some() {
            return Err(IoError::InvalidState.into());
        }

        // Every live flip may end up in the release queue, plus the new one
        if self.live_flips() + 1 > self.gc.free() {
            return Err(DmaError::ReleaseQueueFull.into());
        }

        let next = other_slot(self.pending);
        let dscrs = self.pool.allocate(self.config.max_planes)?;
        let mut flip = FlipRequest::new(dscrs);

        let stale = self.slots[next].reset();
        self.retire(stale);

        let nconfigs = self.config.nconfigs;
        if let Some(pending) = self.pending {
            let source = &self.slots[pending];
            let configs = source.configs;
            let updated = source.updated;

            if let Some(src) = source.flip.as_ref()
                && let Some(fb) = src.fb.as_ref()
            {
                flip.fb = Some(fb.clone());
                flip.ngems = src.ngems;
                for plane in 0..src.ngems {
                    let addr = src
                        .dscrs
                        .get(plane)
                        .and_then(|idx| self.pool.get(idx))
                        .map_or(0, |d| d.addr());
                    if let Some(dst) = flip.dscrs.get(plane).and_then(|idx| self.pool.get(idx)) {
                        dst.set_addr(addr);
                    }
                }
            }

            let slot = &mut self.slots[next];
            slot.configs = configs;
            slot.updated = updated;
        } else {
            let slot = &mut self.slots[next];
            self.bus
                .bulk_read(self.regs.cfg(0), &mut slot.configs[..nconfigs]);
        }

        self.slots[next].flip = Some(flip);
        self.next = Some(next);

        #[cfg(feature = "log")]
        debug!("{}: update started on slot {next}", self.config.name);

        Ok(())
    }

    /// Bind a framebuffer (or none) to the open transaction
    ///
    /// Plane `i` is fetched from `fb.plane_addr(i) + offsets[i]`; missing
    /// offsets count as 0. Returns the framebuffer previously bound to the
    /// transaction so the caller can drop it outside any critical section.
    ///
    /// Ignored when no transaction is open or the framebuffer has more planes
    /// than the layer supports.
    pub fn update_set_fb(&mut self, fb: Option<&F>, offsets: &[u32]) -> Option<F> {
        let Some(next) = self.next else {
            #[cfg(feature = "log")]
            debug!("{}: set_fb outside of an update", self.config.name);
            return None;
        };

        let nplanes = fb.map_or(0, F::num_planes);
        if nplanes > self.config.max_planes {
            #[cfg(feature = "log")]
            debug!("{}: framebuffer has {nplanes} planes", self.config.name);
            return None;
        }

        let flip = self.slots[next].flip.as_mut()?;

        if let Some(fb) = fb {
            for plane in 0..nplanes {
                let offset = offsets.get(plane).copied().unwrap_or(0);
                if let Some(desc) = flip.dscrs.get(plane).and_then(|idx| self.pool.get(idx)) {
                    desc.set_addr(fb.plane_addr(plane).wrapping_add(offset));
                }
            }
        }

        flip.ngems = nplanes;
        core::mem::replace(&mut flip.fb, fb.cloned())
    }

    /// Read-modify-write configuration register `cfg` in the open transaction
    ///
    /// Only the bits in `mask` are replaced. Ignored when no transaction is
    /// open or `cfg` is out of range.
    pub fn update_cfg(&mut self, cfg: usize, mask: u32, value: u32) {
        let Some(next) = self.next else {
            #[cfg(feature = "log")]
            debug!("{}: cfg {cfg} written outside of an update", self.config.name);
            return;
        };
        if cfg >= self.config.nconfigs {
            #[cfg(feature = "log")]
            debug!("{}: cfg {cfg} out of range", self.config.name);
            return;
        }
        self.slots[next].update_cfg(cfg, mask, value);
    }

    /// Attach a completion callback to the open transaction
    ///
    /// `func(arg)` runs from the interrupt handler once the flip is loaded
    /// by the hardware, at most once.
    pub fn update_set_finished(&mut self, func: fn(usize), arg: usize) {
        let Some(next) = self.next else {
            #[cfg(feature = "log")]
            debug!("{}: finished callback outside of an update", self.config.name);
            return;
        };
        if let Some(flip) = self.slots[next].flip.as_mut() {
            flip.set_finished(FinishedCallback::new(func, arg));
        }
    }

    /// Discard the open transaction
    pub fn update_rollback(&mut self) {
        let Some(next) = self.next.take() else {
            return;
        };
        let flip = self.slots[next].reset();
        self.retire(flip);

        #[cfg(feature = "log")]
        debug!("{}: update rolled back", self.config.name);
    }

    /// Publish the open transaction
    ///
    /// Replaces any update that is still pending, and applies it right away
    /// if the channel has no queued flip.
    pub fn update_commit(&mut self) {
        let Some(next) = self.next.take() else {
            #[cfg(feature = "log")]
            debug!("{}: commit without an update", self.config.name);
            return;
        };

        if let Some(pending) = self.pending.take() {
            let flip = self.slots[pending].reset();
            self.retire(flip);
        }
        self.pending = Some(next);

        if self.channel.queue.is_none() {
            self.apply();
        }
    }

    // =========================================================================
    // Channel Control
    // =========================================================================

    /// Stop fetching
    ///
    /// Clears descriptor fetch on the active flip (the queued one if any,
    /// since it may already have started) and discards the pending update so
    /// the interrupt handler cannot re-arm the channel. The channel drains on
    /// its own; see [`wait_channel_idle`](Self::wait_channel_idle).
    pub fn disable(&mut self) -> Result<()> {
        if let Some(flip) = self.channel.active_mut() {
            for (_, idx) in flip.dscrs.iter().take(flip.ngems) {
                if let Some(desc) = self.pool.get(idx) {
                    desc.clear_ctrl(plane::DFETCH | plane::DONE_IRQ);
                }
            }
            self.channel.state = ChannelState::Disabling;
        }

        if let Some(pending) = self.pending.take() {
            let flip = self.slots[pending].reset();
            self.retire(flip);
        }

        #[cfg(feature = "log")]
        debug!(
            "{}: disable requested, state {:?}",
            self.config.name, self.channel.state
        );

        Ok(())
    }

    /// Poll CHSR until the hardware reports the channel stopped
    ///
    /// # Errors
    ///
    /// [`IoError::Timeout`] if the channel is still running after
    /// `timeout_us` microseconds.
    pub fn wait_channel_idle<D: DelayNs>(&mut self, delay: &mut D, timeout_us: u32) -> Result<()> {
        let max_iterations = timeout_us / CHANNEL_POLL_INTERVAL_US;
        for _ in 0..=max_iterations {
            if !self.channel_running() {
                return Ok(());
            }
            delay.delay_us(CHANNEL_POLL_INTERVAL_US);
        }

        #[cfg(feature = "log")]
        warn!("{}: channel still running after {timeout_us}us", self.config.name);

        Err(IoError::Timeout.into())
    }

    /// True while CHSR reports the DMA channel enabled
    pub fn channel_running(&mut self) -> bool {
        self.bus.read(self.regs.chsr()) & CHSR_DMA_CHAN != 0
    }

    // =========================================================================
    // Interrupt Handling
    // =========================================================================

    /// Layer interrupt handler
    ///
    /// Latches descriptor progress reported by the hardware, retires flips
    /// the hardware has moved past, recovers from overruns and applies the
    /// pending update once nothing is queued. Returns the status that was
    /// handled (empty if the interrupt was not for this layer).
    pub fn handle_interrupt(&mut self) -> InterruptStatus {
        if !self.initialized {
            return InterruptStatus::default();
        }

        let imr = self.bus.read(self.regs.imr());
        let isr = self.bus.read(self.regs.isr());
        let irq = InterruptStatus::from_raw(imr & isr);
        if !irq.any() {
            return irq;
        }

        #[cfg(feature = "log")]
        trace!("{}: irq status {:#010x}", self.config.name, irq.raw());

        let active_is_queued = self.channel.queue.is_some();
        let Some(flip) = self.channel.active_mut() else {
            return irq;
        };

        let mut flip_status = 0;
        for (i, idx) in flip.dscrs.iter().take(flip.ngems) {
            let Some(desc) = self.pool.get(idx) else {
                continue;
            };
            let plane_status = irq.plane(i);

            if plane_status.loaded_bits() & !desc.ctrl() != 0 {
                desc.mark(status::LOADED);
                desc.latch_ctrl(plane::ADD_IRQ | plane::DSCR_IRQ);
            }

            if plane_status.done() && desc.ctrl() & plane::DONE_IRQ == 0 {
                desc.mark(status::DONE);
                desc.latch_ctrl(plane::DONE_IRQ);
            }

            if plane_status.overrun() {
                desc.mark(status::OVERRUN);
            }

            flip_status |= desc.status_bits();
        }

        let changed = flip_status ^ flip.status;
        flip.status |= changed;

        if changed & status::LOADED != 0 {
            let mut previous = self.channel.cur.take();
            let mut promoted = self.channel.queue.take();
            if active_is_queued {
                if let Some(flip) = promoted.as_mut() {
                    flip.notify_finished();
                }
            } else if let Some(flip) = previous.as_mut() {
                flip.notify_finished();
            }
            self.channel.cur = promoted;
            self.retire(previous);
        }

        if changed & status::DONE != 0 {
            let cur = self.channel.cur.take();
            self.retire(cur);
        }

        if changed & status::OVERRUN != 0 {
            self.recover_overrun();
        }

        if self.channel.queue.is_none() {
            self.apply();
        }

        if self.channel.is_idle() {
            self.channel.state = ChannelState::Disabled;
        }

        irq
    }

    // =========================================================================
    // Deferred Release
    // =========================================================================

    /// Pop one framebuffer reference waiting to be released
    ///
    /// Call from thread context and drop the returned value there.
    pub fn take_released(&mut self) -> Option<F> {
        self.gc.pop()
    }

    /// Number of framebuffer references waiting to be released
    pub fn released_count(&self) -> usize {
        self.gc.len()
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Layer description
    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    /// True once [`init`](Self::init) succeeded
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// DMA channel state
    pub fn channel_state(&self) -> ChannelState {
        self.channel.state
    }

    /// Slot index of the committed, not yet applied update
    pub fn pending_index(&self) -> Option<usize> {
        self.pending
    }

    /// Slot index of the open transaction
    pub fn next_index(&self) -> Option<usize> {
        self.next
    }

    /// True if a flip is being scanned out
    pub fn has_current(&self) -> bool {
        self.channel.cur.is_some()
    }

    /// True if a flip has been handed to the hardware but not loaded yet
    pub fn has_queued(&self) -> bool {
        self.channel.queue.is_some()
    }

    /// Descriptor counts by lifecycle state
    pub fn pool_census(&self) -> PoolCensus {
        self.pool.census()
    }

    /// Number of overruns recovered since `init`
    pub fn overrun_count(&self) -> u32 {
        self.overruns
    }

    /// Interrupt sources enabled by `init`
    pub fn interrupt_mask(&self) -> InterruptMask {
        self.irq_mask
    }

    /// Register bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutable register bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_initialized(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ConfigError::NotInitialized.into())
        }
    }

    /// Flips that still hold descriptors (and possibly a framebuffer)
    fn live_flips(&self) -> usize {
        let in_slots = self.slots.iter().filter(|s| s.flip.is_some()).count();
        self.channel.live_flips() + in_slots
    }

    /// Release a flip's descriptors and queue its framebuffer for release
    fn retire(&mut self, flip: Option<FlipRequest<F>>) {
        let Some(mut flip) = flip else {
            return;
        };

        self.pool.release_set(&mut flip.dscrs);

        if let Some(fb) = flip.fb.take()
            && let Err(fb) = self.gc.push(fb)
        {
            #[cfg(feature = "log")]
            warn!(
                "{}: release queue full, dropping framebuffer inline",
                self.config.name
            );
            drop(fb);
        }
    }

    /// Reset the channel after an overflow and retire everything in flight
    fn recover_overrun(&mut self) {
        self.bus.write(self.regs.chdr(), CHDR_RST);

        if let Some(mut queued) = self.channel.queue.take() {
            queued.notify_finished();
            self.retire(Some(queued));
        }
        let cur = self.channel.cur.take();
        self.retire(cur);

        if self.channel.state != ChannelState::Disabling {
            self.channel.state = ChannelState::Disabled;
        }
        self.overruns = self.overruns.wrapping_add(1);

        #[cfg(feature = "log")]
        warn!(
            "{}: DMA overrun, channel reset (total {})",
            self.config.name, self.overruns
        );
    }

    /// Program the pending update into the hardware
    fn apply(&mut self) {
        let Some(pending) = self.pending else {
            return;
        };
        if self.channel.state == ChannelState::Disabling {
            return;
        }

        let nconfigs = self.config.nconfigs.min(MAX_CONFIGS);
        let mut action = 0;

        let slot = &mut self.slots[pending];
        for cfg in slot.updated.iter().filter(|&cfg| cfg < nconfigs) {
            self.bus.write(self.regs.cfg(cfg), slot.configs[cfg]);
            action |= CHER_UPDATE;
        }

        if let Some(mut flip) = slot.flip.take_if(|f| f.fb.is_some()) {
            let enable = self.channel.state == ChannelState::Disabled;

            for (i, idx) in flip.dscrs.iter().take(flip.ngems) {
                let Some(desc) = self.pool.get(idx) else {
                    continue;
                };
                desc.relink();
                if enable {
                    desc.set_ctrl(plane::CTRL_IMMEDIATE);
                    self.bus.write(self.regs.plane_addr(i), desc.addr());
                    self.bus.write(self.regs.plane_ctrl(i), desc.ctrl());
                    self.bus.write(self.regs.plane_next(i), desc.next());
                } else {
                    desc.set_ctrl(plane::CTRL_APPEND);
                    self.bus.write(self.regs.plane_head(i), desc.next());
                }
            }

            if enable {
                action |= CHER_DMA_CHAN;
                self.channel.state = ChannelState::Enabled;
            } else {
                action |= CHER_A2Q;
            }

            self.pool.release_from(&mut flip.dscrs, flip.ngems);
            self.channel.queue = Some(flip);
        }

        if action != 0 {
            self.bus.write(self.regs.cher(), action);
        }

        let leftover = self.slots[pending].reset();
        self.pending = None;
        self.retire(leftover);

        #[cfg(feature = "log")]
        debug!(
            "{}: applied slot {pending}, action {action:#x}",
            self.config.name
        );
    }
}
