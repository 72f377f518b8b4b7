//! Core driver components for an HLCDC layer.
//!
//! This module contains the building blocks for driving one layer of the
//! LCD controller:
//!
//! - [`config`] - Layer description and channel state
//! - [`error`] - Error types and result aliases
//! - [`flip`] - Framebuffer trait and completion callbacks
//! - [`interrupt`] - Interrupt mask and status decoding
//! - [`update`] - Dirty configuration register tracking
//! - [`layer`] - The layer DMA and update engine
//!
//! # Example
//!
//! ```ignore
//! use ph_hlcdc_layer::driver::{Layer, LayerConfig};
//!
//! let config = LayerConfig::new()
//!     .with_name("base")
//!     .with_regs_offset(0x40)
//!     .with_max_planes(1)
//!     .with_nconfigs(7);
//! ```

// Submodules
pub mod config;
pub mod error;
pub mod flip;
pub mod interrupt;
pub mod layer;
pub mod update;

// Re-exports for convenience
pub use config::{ChannelState, LayerConfig};
pub use error::{ConfigError, ConfigResult, DmaError, DmaResult, Error, IoError, IoResult, Result};
pub use flip::{FinishedCallback, Framebuffer};
pub use interrupt::{InterruptMask, InterruptStatus, PlaneStatus};
pub use layer::Layer;
pub use update::ConfigMask;
