//! Hardware Abstraction Layer
//!
//! Register access for the layer engine goes through the [`RegisterBus`]
//! trait, so the same driver runs against memory-mapped hardware
//! ([`MmioBus`]) or a host-side mock.
//!
//! # Delay Integration
//!
//! Operations that poll the hardware take an `embedded_hal::delay::DelayNs`
//! directly. Pass any delay implementation from your HAL.

pub mod regmap;

pub use regmap::{MmioBus, RegisterBus};
