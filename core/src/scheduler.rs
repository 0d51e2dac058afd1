//! Time and task spawning behind one seam.
//!
//! Expiry timers, stagger delays and the settle wait all go through a
//! [`Scheduler`]. The tokio implementation reads tokio's clock, so tests
//! running with `#[tokio::test(start_paused = true)]` advance virtual time
//! deterministically.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use tokio::time::Instant;

pub trait Scheduler: Send + Sync + 'static {
    /// Monotonic now.
    fn now(&self) -> Instant;

    /// Wall-clock now, for display timestamps.
    fn wall_clock(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;

    /// Run `task` detached. It keeps running after the caller returns.
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

pub type SharedScheduler = Arc<dyn Scheduler>;

/// Scheduler on the ambient tokio runtime.
///
/// Wall-clock time is derived from the monotonic clock so both advance
/// together under a paused test clock.
#[derive(Debug, Clone, Copy)]
pub struct TokioScheduler {
    origin: Instant,
    origin_wall: DateTime<Utc>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_wall: Utc::now(),
        }
    }

    pub fn shared() -> SharedScheduler {
        Arc::new(Self::new())
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let elapsed = Instant::now().saturating_duration_since(self.origin);
        chrono::Duration::from_std(elapsed)
            .map(|d| self.origin_wall + d)
            .unwrap_or_else(|_| Utc::now())
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }

    fn spawn(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}
