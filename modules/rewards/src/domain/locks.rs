use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = DashMap<Uuid, Arc<Mutex<()>>>;

/// In-process per-user mutual exclusion. Different users never contend.
/// An entry lives only while someone holds or waits for the user's lock.
#[derive(Default)]
pub struct UserLocks {
    inner: Arc<LockMap>,
}

/// Held for the duration of a per-user critical section.
pub struct UserLockGuard {
    map: Arc<LockMap>,
    user_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map's own Arc left: nobody holds or waits for this user.
        // Cloning in `acquire` happens under the same shard lock, so this cannot race it.
        self.map
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: Uuid) -> UserLockGuard {
        // Clone the Arc out so the shard guard is released before awaiting
        let lock = self.inner.entry(user_id).or_default().clone();
        let guard = lock.lock_owned().await;
        UserLockGuard {
            map: self.inner.clone(),
            user_id,
            guard: Some(guard),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
