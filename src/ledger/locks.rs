//! Per-entity mutual exclusion for rating read-modify-write cycles

use crate::types::EntityId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Lazily created async lock per entity id
///
/// Locks are always taken in sorted id order, so two votes touching the same
/// pair of entities in opposite roles cannot deadlock.
#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: Mutex<HashMap<EntityId, Arc<AsyncMutex<()>>>>,
}

/// Held lock scope; dropping it releases every entity it covers
#[derive(Debug)]
pub struct LockScope {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the locks for every id in `ids`
    pub async fn acquire(&self, ids: &[&str]) -> LockScope {
        let mut sorted: Vec<&str> = ids.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let handles: Vec<Arc<AsyncMutex<()>>> = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            sorted
                .iter()
                .map(|id| locks.entry((*id).to_string()).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }

        LockScope { _guards: guards }
    }

    /// Number of entities that have ever been locked
    pub fn tracked(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_overlapping_scopes_serialize() {
        let locks = Arc::new(EntityLocks::new());
        let scope = locks.acquire(&["b", "a"]).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _scope = locks.acquire(&["a", "c"]).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(scope);
        contender.await.unwrap();
        assert_eq!(locks.tracked(), 3);
    }

    #[tokio::test]
    async fn test_disjoint_scopes_do_not_block() {
        let locks = EntityLocks::new();
        let _first = locks.acquire(&["a", "b"]).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&["c", "d"])).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_ids_in_one_scope() {
        let locks = EntityLocks::new();
        let scope = tokio::time::timeout(Duration::from_millis(50), locks.acquire(&["a", "a"])).await;
        assert!(scope.is_ok());
    }
}
