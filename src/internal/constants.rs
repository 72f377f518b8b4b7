//! Centralized Constants
//!
//! This module provides a single source of truth for the hardware limits and
//! sizing constants used throughout the layer engine.
//!
//! # Organization
//!
//! Constants are grouped by category:
//! - **Hardware limits**: planes per layer, configuration registers
//! - **Pool sizing**: descriptors per plane, update slots, release queue depth
//! - **Timing**: channel idle polling
//!
//! # Note
//!
//! Register offsets and bit definitions remain in `register/layer.rs` as they
//! are specific to the layer register block.

// =============================================================================
// Hardware Limits
// =============================================================================

/// Maximum number of color planes a layer can fetch (Y, Cb, Cr)
pub const MAX_PLANES: usize = 3;

/// Maximum number of configuration registers per layer
///
/// Bounded by the width of the dirty-register bitset.
pub const MAX_CONFIGS: usize = 32;

// =============================================================================
// Pool Sizing
// =============================================================================

/// Number of DMA descriptors reserved per plane in the layer pool
pub const DESCRIPTORS_PER_PLANE: usize = 4;

/// Capacity of the per-layer descriptor pool
pub const MAX_DESCRIPTORS: usize = MAX_PLANES * DESCRIPTORS_PER_PLANE;

/// Number of double-buffered update slots per layer
pub const UPDATE_SLOTS: usize = 2;

/// Depth of the deferred framebuffer release queue
///
/// At most four flips are alive at once (next, pending, queued, current), so
/// this leaves room for one full generation of retirements before the
/// background release has to run.
pub const RELEASE_QUEUE_DEPTH: usize = 8;

// =============================================================================
// Timing Constants
// =============================================================================

/// Default timeout when waiting for a channel to stop, in microseconds
///
/// Two frames at 30 Hz.
pub const CHANNEL_IDLE_TIMEOUT_US: u32 = 66_000;

/// Polling interval while waiting for a channel to stop, in microseconds
pub const CHANNEL_POLL_INTERVAL_US: u32 = 100;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_holds_four_descriptors_per_plane() {
        assert_eq!(MAX_DESCRIPTORS, 12);
    }

    #[test]
    fn release_queue_covers_all_live_flips() {
        // next + pending + queue + cur, plus the flip being created
        assert!(RELEASE_QUEUE_DEPTH > 4);
    }

    #[test]
    fn dirty_bitset_fits_in_u32() {
        assert!(MAX_CONFIGS <= u32::BITS as usize);
    }
}
