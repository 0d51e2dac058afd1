use std::time::Duration;

use lootsync_types::{NotificationDraft, NotificationId};

use super::store::NotificationStore;
use crate::scheduler::SharedScheduler;

/// Reveals a batch of notifications one at a time.
///
/// Every item of a batch is staged immediately, so ids are known up front.
/// A detached task then reveals them in order with `stagger` between each,
/// so the batch completes even if the caller is dropped.
#[derive(Clone)]
pub struct NotificationSequencer {
    store: NotificationStore,
    scheduler: SharedScheduler,
    stagger: Duration,
}

impl NotificationSequencer {
    pub fn new(store: NotificationStore, scheduler: SharedScheduler, stagger: Duration) -> Self {
        Self {
            store,
            scheduler,
            stagger,
        }
    }

    pub fn present(&self, drafts: Vec<NotificationDraft>) -> Vec<NotificationId> {
        if drafts.is_empty() {
            return Vec::new();
        }

        let ids: Vec<NotificationId> = drafts.into_iter().map(|d| self.store.stage(d)).collect();
        tracing::debug!(count = ids.len(), "Staged notification batch");

        let store = self.store.clone();
        let scheduler = self.scheduler.clone();
        let stagger = self.stagger;
        let batch = ids.clone();
        self.scheduler.spawn(Box::pin(async move {
            for (i, id) in batch.into_iter().enumerate() {
                if i > 0 {
                    scheduler.sleep(stagger).await;
                }
                if !store.reveal(id) {
                    tracing::debug!(%id, "Dismissed before it was shown");
                }
            }
        }));

        ids
    }
}
