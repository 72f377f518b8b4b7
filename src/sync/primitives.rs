//! Synchronization primitives for ISR-safe access.
//!
//! Low-level building blocks of [`SharedLayer`](super::SharedLayer).

use core::cell::RefCell;
#[cfg(feature = "async")]
use core::task::Waker;
use critical_section::Mutex;

/// Cell providing interior mutability with critical section protection.
///
/// Combines `critical_section::Mutex` with `RefCell` so that the layer can be
/// reached from both thread context and the LCDC interrupt handler.
pub struct CriticalSectionCell<T> {
    inner: Mutex<RefCell<T>>,
}

impl<T> CriticalSectionCell<T> {
    /// Create a new cell (const, suitable for static initialization).
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    /// Execute a closure with exclusive mutable access.
    ///
    /// Interrupts are disabled for the duration of the closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            let mut value = self.inner.borrow_ref_mut(cs);
            f(&mut value)
        })
    }

    /// Try to execute a closure, returning `None` if already borrowed.
    ///
    /// Use from interrupt handlers that may preempt a `with` on the same cell
    /// on platforms where the critical section does not mask them.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow_mut()
                .ok()
                .map(|mut value| f(&mut value))
        })
    }
}

// SAFETY: the value is only reached through a critical section, so at most
// one context holds it at a time.
unsafe impl<T: Send> Sync for CriticalSectionCell<T> {}

/// Level-triggered wakeup from interrupt to task.
///
/// [`signal`](Self::signal) wakes the registered task, or remembers the
/// event if no task is waiting yet, so a release raised between a check and
/// the waker registration is never lost.
#[cfg(feature = "async")]
pub struct ReleaseSignal {
    state: CriticalSectionCell<SignalState>,
}

#[cfg(feature = "async")]
struct SignalState {
    waker: Option<Waker>,
    raised: bool,
}

#[cfg(feature = "async")]
impl ReleaseSignal {
    /// Create an idle signal (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            state: CriticalSectionCell::new(SignalState {
                waker: None,
                raised: false,
            }),
        }
    }

    /// Register the task to wake on the next [`signal`](Self::signal).
    pub fn register(&self, waker: &Waker) {
        self.state.with(|state| match &state.waker {
            Some(existing) if existing.will_wake(waker) => {}
            _ => state.waker = Some(waker.clone()),
        });
    }

    /// Raise the signal and wake the registered task, if any.
    pub fn signal(&self) {
        let waker = self.state.with(|state| {
            state.raised = true;
            state.waker.take()
        });
        if let Some(waker) = waker {
            waker.wake();
        }
    }

    /// Consume a raised signal, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.state.with(|state| core::mem::take(&mut state.raised))
    }

    /// True if a task is waiting.
    pub fn is_registered(&self) -> bool {
        self.state.with(|state| state.waker.is_some())
    }
}

#[cfg(feature = "async")]
impl Default for ReleaseSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn cell_with_mutates_and_returns() {
        let cell = CriticalSectionCell::new(21u32);
        let doubled = cell.with(|v| {
            *v *= 2;
            *v
        });
        assert_eq!(doubled, 42);
        assert_eq!(cell.with(|v| *v), 42);
    }

    #[test]
    fn cell_try_with_fails_while_borrowed() {
        let cell = CriticalSectionCell::new(0u32);
        let nested = cell.with(|_| cell.try_with(|v| *v));
        assert_eq!(nested, None);
        assert_eq!(cell.try_with(|v| *v), Some(0));
    }

    #[test]
    fn cell_in_static() {
        static CELL: CriticalSectionCell<u32> = CriticalSectionCell::new(0);
        CELL.with(|v| *v = 100);
        assert_eq!(CELL.with(|v| *v), 100);
    }

    #[cfg(feature = "async")]
    mod signal {
        extern crate std;

        use super::*;
        use core::task::Waker;
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::task::Wake;

        #[derive(Default)]
        struct WakeCounter(AtomicUsize);

        impl Wake for WakeCounter {
            fn wake(self: Arc<Self>) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn waker() -> (Arc<WakeCounter>, Waker) {
            let counter = Arc::new(WakeCounter::default());
            (counter.clone(), Waker::from(counter))
        }

        #[test]
        fn signal_wakes_registered_task_once() {
            let signal = ReleaseSignal::new();
            let (counter, waker) = waker();

            signal.register(&waker);
            assert!(signal.is_registered());
            signal.signal();
            signal.signal();

            assert_eq!(counter.0.load(Ordering::SeqCst), 1);
            assert!(!signal.is_registered());
        }

        #[test]
        fn signal_before_register_is_remembered() {
            let signal = ReleaseSignal::new();
            signal.signal();

            assert!(signal.take());
            assert!(!signal.take());
        }

        #[test]
        fn register_replaces_other_waker() {
            let signal = ReleaseSignal::new();
            let (first, first_waker) = waker();
            let (second, second_waker) = waker();

            signal.register(&first_waker);
            signal.register(&second_waker);
            signal.signal();

            assert_eq!(first.0.load(Ordering::SeqCst), 0);
            assert_eq!(second.0.load(Ordering::SeqCst), 1);
        }
    }
}
