//! Layer DMA internals
//!
//! - `DmaDescriptor`: hardware descriptor with software lifecycle status
//! - [`DescriptorPool`]: fixed per-layer descriptor pool
//! - [`DmaChannel`]: current/queued flip bookkeeping
//! - [`ReleaseQueue`]: deferred framebuffer release

mod channel;
mod descriptor;
mod pool;
mod release;

pub(crate) use channel::DmaChannel;
pub use descriptor::DescriptorState;
pub(crate) use descriptor::status;
pub(crate) use pool::{DescriptorPool, DescriptorSet};
pub use pool::PoolCensus;
pub(crate) use release::ReleaseQueue;
