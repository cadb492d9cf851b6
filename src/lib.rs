pub mod arena;
pub mod corridor;
pub mod error;
pub mod extent;
pub mod graph;
pub mod layout;
pub mod manifest;
pub mod map_types;
pub mod nav;
pub mod occupancy;
pub mod placement;
pub mod pool;
pub mod room;
pub mod sampling;

mod symmetric_map;

use serde::{Deserialize, Serialize};

/// Opaque token for one instance handed out by a [`PooledFactory`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct InstanceHandle(pub u64);

/// Implement this to allow the procedural generation algorithms to pull tiles and props out of your
/// object pools. The generator never owns pool lifetime; it only acquires, and releases what it
/// acquired when a level is thrown away.
pub trait PooledFactory {
    fn acquire(&mut self, tag: &str) -> InstanceHandle;

    fn release(&mut self, tag: &str, handle: InstanceHandle);
}
