//! crates/clinic_scheduling_core/src/locks.rs
//!
//! Per-dentist mutual exclusion for the check-then-write sequences.
//! Operations for different dentists proceed in parallel; two concurrent
//! requests touching the same dentist's interval set serialize here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// A shared registry of one async mutex per dentist, created lazily.
/// Cloning the registry shares the underlying lock table, so the
/// availability manager and the scheduling engine serialize against
/// each other for the same dentist.
#[derive(Clone, Default)]
pub struct DentistLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl DentistLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for one dentist, waiting if another operation
    /// for that dentist is in flight. The guard is owned so it can be
    /// held across await points for the whole read-validate-write
    /// sequence.
    pub async fn acquire(&self, dentist_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(table.entry(dentist_id).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_dentist_serializes() {
        let locks = DentistLocks::new();
        let dentist = Uuid::new_v4();
        let guard = locks.acquire(dentist).await;
        assert!(locks.inner.lock().unwrap().contains_key(&dentist));
        // A second acquire for the same dentist must not complete while
        // the first guard is held.
        let second = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            locks.acquire(dentist),
        )
        .await;
        assert!(second.is_err());
        drop(guard);
        let third = locks.acquire(dentist).await;
        drop(third);
    }

    #[tokio::test]
    async fn different_dentists_are_independent() {
        let locks = DentistLocks::new();
        let _guard = locks.acquire(Uuid::new_v4()).await;
        // Unrelated dentist acquires immediately.
        let other = locks.acquire(Uuid::new_v4()).await;
        drop(other);
    }
}
