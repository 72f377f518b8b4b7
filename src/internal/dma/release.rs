//! Deferred release queue.
//!
//! Framebuffer references retired from interrupt context are parked here and
//! dropped later from thread context. The queue is a fixed-capacity FIFO ring.

use crate::internal::constants::RELEASE_QUEUE_DEPTH;

/// Bounded FIFO of values awaiting release.
pub(crate) struct ReleaseQueue<T, const N: usize = RELEASE_QUEUE_DEPTH> {
    entries: [Option<T>; N],
    /// Index of the oldest entry
    head: usize,
    /// Number of queued entries
    len: usize,
}

impl<T, const N: usize> ReleaseQueue<T, N> {
    /// Create an empty queue (const, suitable for static initialization)
    pub const fn new() -> Self {
        Self {
            entries: [const { None }; N],
            head: 0,
            len: 0,
        }
    }

    /// Number of queued entries
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Number of free entries
    #[inline]
    pub const fn free(&self) -> usize {
        N - self.len
    }

    /// Append a value, handing it back if the queue is full
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.len == N {
            return Err(value);
        }
        let tail = (self.head + self.len) % N;
        self.entries[tail] = Some(value);
        self.len += 1;
        Ok(())
    }

    /// Remove the oldest value
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.entries[self.head].take();
        self.head = (self.head + 1) % N;
        self.len -= 1;
        value
    }
}

impl<T, const N: usize> Default for ReleaseQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
