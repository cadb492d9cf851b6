use crate::{InstanceHandle, PooledFactory};

use fnv::FnvHashMap;

/// An in-memory [`PooledFactory`] with a free list per tag.
#[derive(Debug, Default)]
pub struct ObjectPool {
    next_handle: u64,
    free: FnvHashMap<String, Vec<InstanceHandle>>,
    live: FnvHashMap<String, usize>,
}

impl ObjectPool {
    pub fn live_count(&self, tag: &str) -> usize {
        self.live.get(tag).copied().unwrap_or(0)
    }

    pub fn total_live(&self) -> usize {
        self.live.values().sum()
    }

    /// Instances ever created, live or pooled.
    pub fn created(&self) -> u64 {
        self.next_handle
    }
}

impl PooledFactory for ObjectPool {
    fn acquire(&mut self, tag: &str) -> InstanceHandle {
        let handle = match self.free.get_mut(tag).and_then(|f| f.pop()) {
            Some(h) => h,
            None => {
                let h = InstanceHandle(self.next_handle);
                self.next_handle += 1;
                h
            }
        };
        *self.live.entry(tag.to_string()).or_insert(0) += 1;

        handle
    }

    fn release(&mut self, tag: &str, handle: InstanceHandle) {
        if let Some(n) = self.live.get_mut(tag) {
            *n = n.saturating_sub(1);
        }
        self.free.entry(tag.to_string()).or_default().push(handle);
    }
}
