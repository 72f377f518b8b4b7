//! Atmel HLCDC Layer Engine
//!
//! A `no_std`, `no_alloc` Rust implementation of the per-layer DMA and update
//! engine of the Atmel/Microchip HLCDC display controller (SAMA5D2/D3/D4,
//! SAM9X5).
//!
//! Each hardware layer fetches its planes through a chain of DMA
//! descriptors. This crate manages those descriptors, double-buffers layer
//! configuration so that register changes land together with the matching
//! framebuffer flip, and runs the interrupt-driven state machine that
//! retires flips the hardware has moved past.
//!
//! # Architecture
//!
//! 1. **Layer Engine** ([`driver::layer`]): update transactions, apply and
//!    interrupt handling
//! 2. **HAL** ([`hal`]): register bus abstraction and memory-mapped access
//! 3. **Sync** (`sync`): critical-section wrapper shared with the interrupt
//!    handler
//!
//! Framebuffers are opaque to the engine: anything implementing
//! [`Framebuffer`] (typically an `Arc` around a buffer object) can be
//! flipped. References are never dropped in interrupt context; they wait in
//! a release queue until collected.
//!
//! # Features
//!
//! - `critical-section` (default): Enable the ISR-safe `SharedLayer` wrapper
//! - `async`: Enable waker-driven collection of released framebuffers
//! - `defmt`: Enable defmt formatting for public types
//! - `log`: Enable diagnostics through the `log` facade
//!
//! # Example
//!
//! ```ignore
//! use ph_hlcdc_layer::{LayerConfig, MmioBus, SharedLayer};
//!
//! const BASE_LAYER: LayerConfig = LayerConfig::new()
//!     .with_name("base")
//!     .with_regs_offset(0x40)
//!     .with_max_planes(1)
//!     .with_nconfigs(7);
//!
//! static BASE: SharedLayer<MmioBus, Fb> =
//!     SharedLayer::new(unsafe { MmioBus::new(LCDC_BASE) }, BASE_LAYER);
//!
//! BASE.init().unwrap();
//!
//! // Page flip with a new position
//! BASE.update_start()?;
//! BASE.update_set_fb(Some(&fb), &[0]);
//! BASE.update_cfg(2, 0xFFFF_FFFF, pos);
//! BASE.update_set_finished(flip_done, 0);
//! BASE.update_commit();
//! ```
//!
//! # Memory Requirements
//!
//! Per layer: `max_planes * 4` descriptors of 16 bytes, two update slots of
//! 32 configuration words, and a release queue of 8 framebuffer handles.
//! The descriptors must sit in memory the LCDC can read.

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels mirror the [lints] tables in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements,
    clippy::let_underscore_future
)]

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod hal;

// Internal implementation details (pub(crate) only)
mod internal;

#[cfg(feature = "critical-section")]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::{ChannelState, LayerConfig};
pub use driver::error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, IoError, IoResult, Result,
};
pub use driver::flip::{FinishedCallback, Framebuffer};
pub use driver::interrupt::{InterruptMask, InterruptStatus, PlaneStatus};
pub use driver::layer::Layer;
pub use driver::update::ConfigMask;
pub use hal::{MmioBus, RegisterBus};
pub use internal::dma::{DescriptorState, PoolCensus};

// Re-export sync types when critical-section is enabled
#[cfg(feature = "critical-section")]
pub use sync::SharedLayer;

/// Low-level register layout for advanced use.
///
/// Offsets are relative to a layer block; most users never need them since
/// [`Layer`] computes every address from its [`LayerConfig`].
pub mod registers {
    pub use crate::internal::register::layer::{
        CHDR_DMA_CHAN, CHDR_OFFSET, CHDR_RST, CHER_A2Q, CHER_DMA_CHAN, CHER_OFFSET, CHER_UPDATE,
        CHSR_DMA_CHAN, CHSR_OFFSET, IDR_OFFSET, IER_OFFSET, IMR_OFFSET, ISR_OFFSET, LayerRegs,
        plane,
    };
}

/// Shared driver constants.
pub mod constants {
    pub use crate::internal::constants::{
        // Timing
        CHANNEL_IDLE_TIMEOUT_US,
        CHANNEL_POLL_INTERVAL_US,
        // Pool sizing
        DESCRIPTORS_PER_PLANE,
        // Hardware limits
        MAX_CONFIGS,
        MAX_DESCRIPTORS,
        MAX_PLANES,
        // Release queue
        RELEASE_QUEUE_DEPTH,
        UPDATE_SLOTS,
    };
}
