//! Per-interpreter advisory locks.
//!
//! Serializes writers of one interpreter's state inside this process.
//! Cross-process safety still comes from the store's version check and slot
//! guard; this only keeps local writers from racing into retries.

use std::collections::HashMap;
use std::sync::Arc;

use booking_core::types::InterpreterId;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

const PRUNE_ABOVE: usize = 1_024;

#[derive(Clone, Default)]
pub struct InterpreterLocks {
    inner: Arc<Mutex<HashMap<InterpreterId, Arc<AsyncMutex<()>>>>>,
}

impl InterpreterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `interpreter_id`; released on drop.
    pub async fn acquire(&self, interpreter_id: InterpreterId) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock();
            if map.len() > PRUNE_ABOVE {
                // Only the map holds an idle entry.
                map.retain(|_, m| Arc::strong_count(m) > 1);
            }
            map.entry(interpreter_id).or_default().clone()
        };
        slot.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
