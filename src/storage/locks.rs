use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::WalletId;

/// Guard proving exclusive access to one wallet's read-modify-write cycle.
pub type WalletGuard = OwnedMutexGuard<()>;

/// Per-wallet mutual exclusion.
///
/// Locks are created on demand and dropped from the table once nobody holds
/// or waits on them. Operations on different wallets never contend.
#[derive(Default)]
pub struct WalletLocks {
    slots: Mutex<HashMap<WalletId, Arc<AsyncMutex<()>>>>,
}

impl WalletLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `id` is free and take it.
    pub async fn acquire(&self, id: WalletId) -> WalletGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            // A slot referenced only by the table is idle
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(id).or_default())
        };
        slot.lock_owned().await
    }

    /// Number of wallets currently locked or awaited.
    #[cfg(test)]
    fn active(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .values()
            .filter(|slot| Arc::strong_count(slot) > 1)
            .count()
    }
}
