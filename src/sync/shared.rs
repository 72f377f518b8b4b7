//! ISR-safe layer wrapper using critical sections.
//!
//! [`SharedLayer`] lets the update API run from thread context while the
//! LCDC interrupt handler drives the DMA state machine. Framebuffer
//! references released by either side are dropped outside the critical
//! section.

use embedded_hal::delay::DelayNs;

use super::primitives::CriticalSectionCell;
#[cfg(feature = "async")]
use super::primitives::ReleaseSignal;
use crate::driver::config::{ChannelState, LayerConfig};
use crate::driver::error::{DmaError, Error, IoError, Result};
use crate::driver::flip::Framebuffer;
use crate::driver::interrupt::InterruptStatus;
use crate::driver::layer::Layer;
use crate::hal::RegisterBus;
use crate::internal::constants::CHANNEL_POLL_INTERVAL_US;

/// ISR-safe layer wrapper.
///
/// All access goes through `critical_section::with()`, disabling interrupts
/// for the duration of the closure. The wrapper must not move while the
/// channel is running, which a `static` guarantees.
///
/// # Example
///
/// ```ignore
/// static BASE: SharedLayer<MmioBus, Fb> =
///     SharedLayer::new(unsafe { MmioBus::new(LCDC_BASE) }, BASE_LAYER);
///
/// fn page_flip(fb: &Fb, crtc: usize) -> Result<()> {
///     BASE.update_start()?;
///     BASE.update_set_fb(Some(fb), &[0]);
///     BASE.update_set_finished(flip_done, crtc);
///     BASE.update_commit();
///     Ok(())
/// }
///
/// #[interrupt]
/// fn LCDC() {
///     BASE.handle_interrupt();
/// }
/// ```
pub struct SharedLayer<B, F> {
    inner: CriticalSectionCell<Layer<B, F>>,
    #[cfg(feature = "async")]
    released: ReleaseSignal,
}

impl<B: RegisterBus, F: Framebuffer> SharedLayer<B, F> {
    /// Create a new shared layer (const, suitable for static initialization).
    pub const fn new(bus: B, config: LayerConfig) -> Self {
        Self {
            inner: CriticalSectionCell::new(Layer::new(bus, config)),
            #[cfg(feature = "async")]
            released: ReleaseSignal::new(),
        }
    }

    /// Execute a closure with exclusive access to the layer.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, G>(&self, f: G) -> R
    where
        G: FnOnce(&mut Layer<B, F>) -> R,
    {
        self.inner.with(f)
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    #[inline]
    pub fn try_with<R, G>(&self, f: G) -> Option<R>
    where
        G: FnOnce(&mut Layer<B, F>) -> R,
    {
        self.inner.try_with(f)
    }

    /// Initialize the layer (see [`Layer::init`]).
    pub fn init(&self) -> Result<()> {
        self.inner.with(Layer::init)
    }

    /// Tear the layer down and drop every framebuffer it held.
    ///
    /// Returns the number of references dropped.
    pub fn cleanup(&self) -> usize {
        self.inner.with(Layer::cleanup);
        self.collect_garbage()
    }

    /// Open an update transaction.
    ///
    /// When the release queue is what stands in the way, it is drained once
    /// and the start retried.
    pub fn update_start(&self) -> Result<()> {
        match self.inner.with(Layer::update_start) {
            Err(Error::Dma(DmaError::ReleaseQueueFull)) => {
                self.collect_garbage();
                self.inner.with(Layer::update_start)
            }
            result => result,
        }
    }

    /// Bind a framebuffer to the open transaction.
    ///
    /// The framebuffer it replaces is dropped after the lock is released.
    pub fn update_set_fb(&self, fb: Option<&F>, offsets: &[u32]) {
        let displaced = self.inner.with(|layer| layer.update_set_fb(fb, offsets));
        drop(displaced);
    }

    /// Read-modify-write one configuration register in the open transaction.
    pub fn update_cfg(&self, cfg: usize, mask: u32, value: u32) {
        self.inner.with(|layer| layer.update_cfg(cfg, mask, value));
    }

    /// Attach a completion callback to the open transaction.
    pub fn update_set_finished(&self, func: fn(usize), arg: usize) {
        self.inner
            .with(|layer| layer.update_set_finished(func, arg));
    }

    /// Publish the open transaction.
    pub fn update_commit(&self) {
        self.inner.with(Layer::update_commit);
        self.collect_garbage();
    }

    /// Discard the open transaction.
    pub fn update_rollback(&self) {
        self.inner.with(Layer::update_rollback);
        self.collect_garbage();
    }

    /// Stop fetching (see [`Layer::disable`]).
    pub fn disable(&self) -> Result<()> {
        let result = self.inner.with(Layer::disable);
        self.collect_garbage();
        result
    }

    /// Poll until the channel stops, taking the lock only for each read.
    pub fn wait_channel_idle<D: DelayNs>(&self, delay: &mut D, timeout_us: u32) -> Result<()> {
        let max_iterations = timeout_us / CHANNEL_POLL_INTERVAL_US;
        for _ in 0..=max_iterations {
            if !self.inner.with(Layer::channel_running) {
                return Ok(());
            }
            delay.delay_us(CHANNEL_POLL_INTERVAL_US);
        }

        Err(IoError::Timeout.into())
    }

    /// Run the layer interrupt handler.
    ///
    /// With the `async` feature, a task waiting in
    /// [`wait_released`](Self::wait_released) is woken when framebuffers
    /// were released.
    pub fn handle_interrupt(&self) -> InterruptStatus {
        let status = self.inner.with(Layer::handle_interrupt);

        #[cfg(feature = "async")]
        if self.inner.with(|layer| layer.released_count() > 0) {
            self.released.signal();
        }

        status
    }

    /// Drop every released framebuffer reference, one lock at a time.
    ///
    /// Returns the number of references dropped.
    pub fn collect_garbage(&self) -> usize {
        let mut count = 0;
        while let Some(fb) = self.inner.with(Layer::take_released) {
            drop(fb);
            count += 1;
        }
        count
    }

    /// Wait until the interrupt handler releases framebuffers, then drop them.
    ///
    /// Returns the number of references dropped.
    #[cfg(feature = "async")]
    pub async fn wait_released(&self) -> usize {
        use core::future::poll_fn;
        use core::task::Poll;

        poll_fn(|cx| {
            self.released.register(cx.waker());
            match self.collect_garbage() {
                0 => Poll::Pending,
                count => {
                    self.released.take();
                    Poll::Ready(count)
                }
            }
        })
        .await
    }

    /// DMA channel state.
    pub fn channel_state(&self) -> ChannelState {
        self.inner.with(|layer| layer.channel_state())
    }
}
