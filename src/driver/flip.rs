//! Framebuffer flips.
//!
//! A flip binds one framebuffer to the descriptors that will fetch it. It is
//! created by `update_start`, handed to the channel on apply and retired once
//! the hardware has moved past it.

use crate::internal::dma::DescriptorSet;

/// A buffer the layer can scan out.
///
/// Cloning takes a new reference on the underlying memory and dropping
/// releases it, so an `Arc` around a driver-side buffer object is the usual
/// implementation. The layer only keeps references for as long as the
/// hardware may read the memory.
pub trait Framebuffer: Clone {
    /// Number of color planes (1 for packed RGB, up to 3 for planar YUV)
    fn num_planes(&self) -> usize;

    /// Bus address of the first byte of `plane`
    fn plane_addr(&self, plane: usize) -> u32;
}

/// Completion callback invoked when a flip has been loaded by the hardware.
///
/// Runs in interrupt context with the layer locked, so it must not call back
/// into the layer.
#[derive(Debug, Clone, Copy)]
pub struct FinishedCallback {
    func: fn(usize),
    arg: usize,
}

impl FinishedCallback {
    /// Bundle a function with its opaque argument
    pub const fn new(func: fn(usize), arg: usize) -> Self {
        Self { func, arg }
    }

    /// Opaque argument passed to the function
    pub const fn arg(&self) -> usize {
        self.arg
    }

    /// Invoke the callback
    #[inline]
    pub fn call(self) {
        (self.func)(self.arg);
    }
}

/// One framebuffer assignment travelling through the update pipeline.
pub(crate) struct FlipRequest<F> {
    /// Scanned-out buffer; `None` for configuration-only updates
    pub fb: Option<F>,
    /// One descriptor per plane
    pub dscrs: DescriptorSet,
    /// Number of planes of `fb`
    pub ngems: usize,
    finished: Option<FinishedCallback>,
    /// Descriptor status bits reported so far (see `dma::status`)
    pub status: u32,
}

impl<F> FlipRequest<F> {
    /// Create an empty flip owning `dscrs`
    pub const fn new(dscrs: DescriptorSet) -> Self {
        Self {
            fb: None,
            dscrs,
            ngems: 0,
            finished: None,
            status: 0,
        }
    }

    /// Attach (or replace) the completion callback
    pub fn set_finished(&mut self, callback: FinishedCallback) {
        self.finished = Some(callback);
    }

    /// Fire the completion callback; later calls are no-ops
    pub fn notify_finished(&mut self) {
        if let Some(callback) = self.finished.take() {
            callback.call();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn bump(arg: usize) {
        CALLS.fetch_add(arg, Ordering::SeqCst);
    }

    #[test]
    fn new_flip_is_empty() {
        let flip: FlipRequest<u32> = FlipRequest::new(DescriptorSet::EMPTY);
        assert!(flip.fb.is_none());
        assert_eq!(flip.ngems, 0);
        assert_eq!(flip.status, 0);
    }

    #[test]
    fn finished_callback_fires_once() {
        let mut flip: FlipRequest<u32> = FlipRequest::new(DescriptorSet::EMPTY);
        flip.set_finished(FinishedCallback::new(bump, 5));

        let before = CALLS.load(Ordering::SeqCst);
        flip.notify_finished();
        flip.notify_finished();

        assert_eq!(CALLS.load(Ordering::SeqCst) - before, 5);
    }

    #[test]
    fn callback_keeps_argument() {
        let cb = FinishedCallback::new(bump, 42);
        assert_eq!(cb.arg(), 42);
    }
}
