use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use lootsync_types::{
    DismissReason, Notification, NotificationDraft, NotificationId, NotificationState,
};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::scheduler::SharedScheduler;

/// How many retired ids are remembered for [`NotificationStore::state`].
const RETIRED_HISTORY: usize = 256;

#[derive(Debug)]
struct Shown {
    notification: Notification,
    visible_since: Instant,
}

#[derive(Debug, Default)]
struct StoreState {
    pending: HashMap<NotificationId, Notification>,
    visible: Vec<Shown>,
    retired: VecDeque<(NotificationId, DismissReason)>,
}

impl StoreState {
    fn visible_list(&self) -> Vec<Notification> {
        self.visible.iter().map(|s| s.notification.clone()).collect()
    }

    fn remember(&mut self, id: NotificationId, reason: DismissReason) {
        self.retired.push_back((id, reason));
        while self.retired.len() > RETIRED_HISTORY {
            self.retired.pop_front();
        }
    }
}

struct StoreShared {
    state: Mutex<StoreState>,
    next_id: AtomicU64,
    lifetime: Duration,
    scheduler: SharedScheduler,
    visible_tx: watch::Sender<Vec<Notification>>,
}

impl StoreShared {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide store of user-facing notifications.
///
/// Cheap to clone; all clones share one queue. Not tied to any view, so
/// timers and staged batches keep running when the caller goes away.
#[derive(Clone)]
pub struct NotificationStore {
    shared: Arc<StoreShared>,
}

impl NotificationStore {
    pub fn new(scheduler: SharedScheduler, lifetime: Duration) -> Self {
        let (visible_tx, _) = watch::channel(Vec::new());
        Self {
            shared: Arc::new(StoreShared {
                state: Mutex::new(StoreState::default()),
                next_id: AtomicU64::new(1),
                lifetime,
                scheduler,
                visible_tx,
            }),
        }
    }

    /// Show a notification now. It expires after the configured lifetime.
    pub fn enqueue(&self, draft: NotificationDraft) -> NotificationId {
        let id = self.stage(draft);
        self.reveal(id);
        id
    }

    /// Register a notification without showing it yet.
    pub fn stage(&self, draft: NotificationDraft) -> NotificationId {
        let id = NotificationId(self.shared.next_id.fetch_add(1, Ordering::Relaxed));
        let notification = Notification::from_draft(id, draft, self.shared.scheduler.wall_clock());
        self.shared.lock().pending.insert(id, notification);
        id
    }

    /// Move a staged notification to visible and arm its expiry timer.
    ///
    /// Returns `false` if `id` is not pending (already shown, dismissed, or
    /// unknown).
    pub fn reveal(&self, id: NotificationId) -> bool {
        let visible = {
            let mut state = self.shared.lock();
            let Some(notification) = state.pending.remove(&id) else {
                return false;
            };
            tracing::debug!(%id, title = %notification.title, "Notification visible");
            state.visible.push(Shown {
                notification,
                visible_since: self.shared.scheduler.now(),
            });
            state.visible_list()
        };
        self.shared.visible_tx.send_replace(visible);
        self.arm_expiry(id);
        true
    }

    fn arm_expiry(&self, id: NotificationId) {
        let weak: Weak<StoreShared> = Arc::downgrade(&self.shared);
        let sleep = self.shared.scheduler.sleep(self.shared.lifetime);
        self.shared.scheduler.spawn(Box::pin(async move {
            sleep.await;
            if let Some(shared) = weak.upgrade() {
                NotificationStore { shared }.retire(id, DismissReason::Expired);
            }
        }));
    }

    /// Dismiss a pending or visible notification.
    ///
    /// Idempotent: returns `false` and does nothing when the notification is
    /// already gone, whether it expired or was dismissed before.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        self.retire(id, DismissReason::Manual)
    }

    fn retire(&self, id: NotificationId, reason: DismissReason) -> bool {
        let visible = {
            let mut state = self.shared.lock();
            if state.pending.remove(&id).is_some() {
                state.remember(id, reason);
                None
            } else if let Some(pos) = state.visible.iter().position(|s| s.notification.id == id) {
                state.visible.remove(pos);
                state.remember(id, reason);
                Some(state.visible_list())
            } else {
                return false;
            }
        };
        tracing::debug!(%id, ?reason, "Notification dismissed");
        if let Some(visible) = visible {
            self.shared.visible_tx.send_replace(visible);
        }
        true
    }

    /// Dismiss everything, staged notifications included.
    pub fn clear(&self) {
        {
            let mut state = self.shared.lock();
            let pending: Vec<_> = state.pending.drain().map(|(id, _)| id).collect();
            let visible: Vec<_> = state
                .visible
                .drain(..)
                .map(|s| s.notification.id)
                .collect();
            for id in pending.into_iter().chain(visible) {
                state.remember(id, DismissReason::Manual);
            }
        }
        self.shared.visible_tx.send_replace(Vec::new());
    }

    /// Currently visible notifications, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.shared.lock().visible_list()
    }

    /// Reactive view of [`Self::notifications`].
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.shared.visible_tx.subscribe()
    }

    /// `None` for ids never issued, or retired too long ago to remember.
    pub fn state(&self, id: NotificationId) -> Option<NotificationState> {
        let state = self.shared.lock();
        if state.pending.contains_key(&id) {
            return Some(NotificationState::Pending);
        }
        if state.visible.iter().any(|s| s.notification.id == id) {
            return Some(NotificationState::Visible);
        }
        state
            .retired
            .iter()
            .rev()
            .find(|(retired, _)| *retired == id)
            .map(|(_, reason)| NotificationState::Dismissed(*reason))
    }

    /// When `id` became visible, if it still is.
    pub fn visible_since(&self, id: NotificationId) -> Option<Instant> {
        self.shared
            .lock()
            .visible
            .iter()
            .find(|s| s.notification.id == id)
            .map(|s| s.visible_since)
    }

    pub fn lifetime(&self) -> Duration {
        self.shared.lifetime
    }
}
