//! Per-lesson single-flight guard
//!
//! Overlapping conversions of the same lesson would race on asset
//! create/update, so each lesson gets an async mutex for the duration of an
//! operation. Entries are dropped once nobody holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Debug, Default)]
pub(crate) struct LessonLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl LessonLocks {
    /// Wait until no other operation holds `lesson_id`
    pub(crate) async fn acquire(&self, lesson_id: Uuid) -> LessonGuard<'_> {
        let lock = {
            let mut locks = self.table();
            locks.entry(lesson_id).or_default().clone()
        };
        let guard = lock.lock_owned().await;

        LessonGuard {
            owner: self,
            lesson_id,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<AsyncMutex<()>>>> {
        // Entries are plain Arcs, so a poisoned table is still consistent.
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub(crate) struct LessonGuard<'a> {
    owner: &'a LessonLocks,
    lesson_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for LessonGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self.owner.table();
        // Only the table's own reference left: no holder, no waiter.
        if locks
            .get(&self.lesson_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.lesson_id);
        }
    }
}
