//! Synchronization and Concurrency Support
//!
//! This module provides the pieces needed to share a layer between thread
//! context and the LCDC interrupt handler:
//!
//! - **Primitives** (`primitives`): Low-level synchronization types
//!   - [`CriticalSectionCell`] - ISR-safe interior mutability
//!   - [`ReleaseSignal`] - Interrupt-to-task release notification (`async`)
//!
//! - **Shared Wrapper** (`shared`): ISR-safe layer wrapper
//!   - [`SharedLayer`] - Critical-section protected layer that drops
//!     released framebuffers outside the lock
//!
//! # Feature Flags
//!
//! - `critical-section`: Enables this module
//! - `async`: Adds [`ReleaseSignal`] and `SharedLayer::wait_released`
//!
//! # Example
//!
//! ```ignore
//! use ph_hlcdc_layer::sync::SharedLayer;
//!
//! static HEO: SharedLayer<MmioBus, Fb> =
//!     SharedLayer::new(unsafe { MmioBus::new(LCDC_BASE) }, HEO_LAYER);
//!
//! fn main() {
//!     HEO.init().unwrap();
//! }
//!
//! #[interrupt]
//! fn LCDC() {
//!     HEO.handle_interrupt();
//! }
//! ```

mod primitives;

#[cfg(feature = "async")]
pub use primitives::ReleaseSignal;
pub use primitives::CriticalSectionCell;

mod shared;

pub use shared::SharedLayer;
