//! Single-flight clock synchronization
//!
//! Every session wants the trusted time, but the underlying sync must run at
//! most once per process. The coordinator gates the [`TrustedClock::sync`]
//! call behind a `tokio::sync::OnceCell`: the first caller starts the
//! attempt, everyone else awaits the same outcome, and the result (success
//! or failure) is never revisited.

use crate::trusted::TrustedClock;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

/// Lifecycle of the shared clock state.
///
/// `Unsynced → Syncing → Synced(offset)`; once `Synced` it never regresses.
/// A failed attempt reports `Unsynced` again - callers cannot distinguish
/// "failed" from "never attempted", and neither triggers a second attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Unsynced,
    Syncing,
    Synced(Duration),
}

/// Process-wide single-flight gate over a [`TrustedClock`].
///
/// Create one coordinator per process and share it (via `Arc`) with every
/// session that generates rotating codes.
pub struct ClockSyncCoordinator {
    clock: Arc<dyn TrustedClock>,
    outcome: OnceCell<Option<Duration>>,
    attempted: AtomicBool,
}

impl ClockSyncCoordinator {
    pub fn new(clock: Arc<dyn TrustedClock>) -> Self {
        Self {
            clock,
            outcome: OnceCell::new(),
            attempted: AtomicBool::new(false),
        }
    }

    /// Await the shared sync outcome.
    ///
    /// The first caller triggers the underlying `sync` exactly once; callers
    /// arriving during the attempt block on the same future and observe the
    /// same result. Once settled, this returns immediately. `None` means the
    /// one attempt failed and local time remains in effect.
    pub async fn ensure_synced(&self) -> Option<Duration> {
        self.attempted.store(true, Ordering::Release);
        let clock = Arc::clone(&self.clock);
        *self
            .outcome
            .get_or_init(|| async move {
                info!("starting trusted clock sync");
                match clock.sync().await {
                    Ok(offset) => {
                        info!(offset_ms = offset.num_milliseconds(), "trusted clock synced");
                        Some(offset)
                    }
                    Err(e) => {
                        warn!("trusted clock sync failed, staying on local time: {}", e);
                        None
                    }
                }
            })
            .await
    }

    /// Current lifecycle state, without blocking.
    pub fn state(&self) -> ClockState {
        match self.outcome.get() {
            Some(Some(offset)) => ClockState::Synced(*offset),
            // A settled failure is indistinguishable from "never attempted".
            Some(None) => ClockState::Unsynced,
            None if self.attempted.load(Ordering::Acquire) => ClockState::Syncing,
            None => ClockState::Unsynced,
        }
    }

    /// Whether a trusted offset is in effect.
    pub fn is_synced(&self) -> bool {
        matches!(self.state(), ClockState::Synced(_))
    }

    /// The current time: network-corrected when synced, local otherwise.
    pub fn now(&self) -> DateTime<Utc> {
        match self.state() {
            ClockState::Synced(offset) => self.clock.now() + offset,
            _ => self.clock.now(),
        }
    }

    /// The current epoch second, for code generation.
    pub fn timestamp(&self) -> i64 {
        self.now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trusted::ClockError;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;

    /// Deterministic clock: fixed local time, configurable sync behavior.
    struct FakeClock {
        syncs: AtomicUsize,
        offset: Option<Duration>,
        delay: std::time::Duration,
    }

    impl FakeClock {
        fn succeeding(offset_secs: i64) -> Self {
            Self {
                syncs: AtomicUsize::new(0),
                offset: Some(Duration::seconds(offset_secs)),
                delay: std::time::Duration::ZERO,
            }
        }

        fn failing() -> Self {
            Self {
                syncs: AtomicUsize::new(0),
                offset: None,
                delay: std::time::Duration::ZERO,
            }
        }

        fn slow(offset_secs: i64, delay: std::time::Duration) -> Self {
            Self {
                delay,
                ..Self::succeeding(offset_secs)
            }
        }

        fn sync_count(&self) -> usize {
            self.syncs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TrustedClock for FakeClock {
        async fn sync(&self) -> Result<Duration, ClockError> {
            self.syncs.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.offset
                .ok_or_else(|| ClockError::Unreachable("no route to time pool".into()))
        }

        fn now(&self) -> DateTime<Utc> {
            Utc.timestamp_opt(1_000_000, 0).unwrap()
        }
    }

    #[tokio::test]
    async fn test_sync_runs_exactly_once_for_concurrent_callers() {
        let clock = Arc::new(FakeClock::slow(120, std::time::Duration::from_millis(50)));
        let coordinator = Arc::new(ClockSyncCoordinator::new(clock.clone()));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let coordinator = Arc::clone(&coordinator);
            tasks.push(tokio::spawn(
                async move { coordinator.ensure_synced().await },
            ));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), Some(Duration::seconds(120)));
        }
        assert_eq!(clock.sync_count(), 1);
        assert_eq!(coordinator.state(), ClockState::Synced(Duration::seconds(120)));
    }

    #[tokio::test]
    async fn test_failed_sync_is_not_retried() {
        let clock = Arc::new(FakeClock::failing());
        let coordinator = ClockSyncCoordinator::new(clock.clone());

        assert_eq!(coordinator.ensure_synced().await, None);
        assert_eq!(coordinator.ensure_synced().await, None);
        assert_eq!(clock.sync_count(), 1);

        // A settled failure reads as "never attempted".
        assert_eq!(coordinator.state(), ClockState::Unsynced);
        assert!(!coordinator.is_synced());
    }

    #[tokio::test]
    async fn test_state_reports_syncing_while_in_flight() {
        let clock = Arc::new(FakeClock::slow(0, std::time::Duration::from_secs(60)));
        let coordinator = Arc::new(ClockSyncCoordinator::new(clock));
        assert_eq!(coordinator.state(), ClockState::Unsynced);

        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.ensure_synced().await })
        };
        // Let the sync attempt start.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(coordinator.state(), ClockState::Syncing);

        waiter.abort();
    }

    #[tokio::test]
    async fn test_timestamp_applies_offset_once_synced() {
        let clock = Arc::new(FakeClock::succeeding(500));
        let coordinator = ClockSyncCoordinator::new(clock);

        // Before sync: local time.
        assert_eq!(coordinator.timestamp(), 1_000_000);

        coordinator.ensure_synced().await;
        assert_eq!(coordinator.timestamp(), 1_000_500);
    }
}
