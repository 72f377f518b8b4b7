//! Layer configuration types
//!
//! A [`LayerConfig`] describes one hardware layer of the controller: where its
//! register block lives and how many planes and configuration registers it
//! has. Descriptions are normally `const` tables built with the `with_*`
//! builder methods.

use super::error::{ConfigError, ConfigResult};
use crate::internal::constants::{DESCRIPTORS_PER_PLANE, MAX_CONFIGS, MAX_PLANES};

// =============================================================================
// Layer Description
// =============================================================================

/// Static description of one HLCDC layer
///
/// # Example
///
/// ```ignore
/// const HEO: LayerConfig = LayerConfig::new()
///     .with_name("high-end-overlay")
///     .with_regs_offset(0x340)
///     .with_max_planes(3)
///     .with_nconfigs(17);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LayerConfig {
    /// Name used in diagnostics
    pub name: &'static str,
    /// Offset of the layer register block inside the controller
    pub regs_offset: usize,
    /// Number of color planes the layer can fetch (1..=3)
    pub max_planes: usize,
    /// Number of configuration registers (1..=32)
    pub nconfigs: usize,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerConfig {
    /// Create a single-plane layer description at offset 0
    #[must_use]
    pub const fn new() -> Self {
        Self {
            name: "layer",
            regs_offset: 0,
            max_planes: 1,
            nconfigs: 1,
        }
    }

    // =========================================================================
    // Builder Methods
    // =========================================================================

    /// Set the diagnostic name
    #[must_use]
    pub const fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Set the register block offset
    #[must_use]
    pub const fn with_regs_offset(mut self, offset: usize) -> Self {
        self.regs_offset = offset;
        self
    }

    /// Set the number of color planes
    #[must_use]
    pub const fn with_max_planes(mut self, planes: usize) -> Self {
        self.max_planes = planes;
        self
    }

    /// Set the number of configuration registers
    #[must_use]
    pub const fn with_nconfigs(mut self, nconfigs: usize) -> Self {
        self.nconfigs = nconfigs;
        self
    }

    // =========================================================================
    // Derived Values
    // =========================================================================

    /// Number of descriptors the layer pool uses
    #[must_use]
    pub const fn pool_size(&self) -> usize {
        self.max_planes * DESCRIPTORS_PER_PLANE
    }

    /// Check the description against the hardware limits
    pub const fn validate(&self) -> ConfigResult<()> {
        if self.max_planes == 0 || self.max_planes > MAX_PLANES {
            return Err(ConfigError::InvalidPlaneCount);
        }
        if self.nconfigs == 0 || self.nconfigs > MAX_CONFIGS {
            return Err(ConfigError::InvalidConfigCount);
        }
        Ok(())
    }
}

// =============================================================================
// Channel State
// =============================================================================

/// State of a layer DMA channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelState {
    /// Not fetching; the next flip enables the channel
    #[default]
    Disabled,
    /// Fetching; new flips are appended to the running queue
    Enabled,
    /// Stop requested; waiting for the hardware to drain
    Disabling,
}

impl ChannelState {
    /// True while the hardware may still be fetching
    pub const fn is_active(&self) -> bool {
        !matches!(self, ChannelState::Disabled)
    }
}
