//! Layer DMA channel bookkeeping.
//!
//! Tracks what the hardware is doing with the flips handed to it: `cur` is
//! being scanned out, `queue` has been handed over but not loaded yet.

use crate::driver::config::ChannelState;
use crate::driver::flip::FlipRequest;

/// Software view of one layer DMA channel.
pub(crate) struct DmaChannel<F> {
    /// Channel state
    pub state: ChannelState,
    /// Flip currently scanned out
    pub cur: Option<FlipRequest<F>>,
    /// Flip handed to the hardware, waiting to be loaded
    pub queue: Option<FlipRequest<F>>,
}

impl<F> DmaChannel<F> {
    /// Create a disabled channel (const, suitable for static initialization)
    pub const fn new() -> Self {
        Self {
            state: ChannelState::Disabled,
            cur: None,
            queue: None,
        }
    }

    /// Flip the hardware is reporting on: `queue` if present, else `cur`
    pub fn active_mut(&mut self) -> Option<&mut FlipRequest<F>> {
        match self.queue {
            Some(ref mut flip) => Some(flip),
            None => self.cur.as_mut(),
        }
    }

    /// True if neither a current nor a queued flip exists
    pub fn is_idle(&self) -> bool {
        self.cur.is_none() && self.queue.is_none()
    }

    /// Number of flips owned by the channel
    pub fn live_flips(&self) -> usize {
        usize::from(self.cur.is_some()) + usize::from(self.queue.is_some())
    }
}

impl<F> Default for DmaChannel<F> {
    fn default() -> Self {
        Self::new()
    }
}
