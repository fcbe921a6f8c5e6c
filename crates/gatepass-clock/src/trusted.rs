//! Trusted clock capability

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Clock synchronization errors
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("time source unreachable: {0}")]
    Unreachable(String),

    #[error("time sync did not complete: {0}")]
    SyncFailed(String),
}

/// A time source that can be corrected against a trusted reference.
///
/// `sync` performs one round of network time synchronization and reports the
/// offset between the local clock and the trusted reference; it may fail or
/// never complete. `now` is the local wall clock and is always available.
///
/// The sync wire protocol (NTP or otherwise) is the implementor's concern;
/// Gatepass only consumes the resulting offset.
#[async_trait]
pub trait TrustedClock: Send + Sync {
    /// Perform one synchronization round, returning the local-to-trusted
    /// offset.
    async fn sync(&self) -> Result<Duration, ClockError>;

    /// The local wall clock.
    fn now(&self) -> DateTime<Utc>;
}

/// Trusted clock backed by the local system time.
///
/// Reports a zero offset: suitable for hosts that keep the device clock
/// disciplined by other means, and for tests. Venue deployments should
/// provide an NTP-backed implementation instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl TrustedClock for SystemClock {
    async fn sync(&self) -> Result<Duration, ClockError> {
        Ok(Duration::zero())
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
