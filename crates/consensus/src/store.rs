//! Read access to synchronized data

use crate::types::SynchronizedData;
use parking_lot::RwLock;
use std::sync::Arc;

/// Source of the current synchronized data snapshot.
///
/// Reads never suspend and always return the whole snapshot.
pub trait SynchronizedDataSource: Send + Sync {
    fn synchronized_data(&self) -> SynchronizedData;
}

/// Snapshot holder updated by the round engine between rounds
#[derive(Clone, Default)]
pub struct SharedSynchronizedData {
    inner: Arc<RwLock<SynchronizedData>>,
}

impl SharedSynchronizedData {
    pub fn new(data: SynchronizedData) -> Self {
        Self {
            inner: Arc::new(RwLock::new(data)),
        }
    }

    /// Replace the snapshot (round engine only)
    pub fn update(&self, data: SynchronizedData) {
        *self.inner.write() = data;
    }
}

impl SynchronizedDataSource for SharedSynchronizedData {
    fn synchronized_data(&self) -> SynchronizedData {
        self.inner.read().clone()
    }
}
