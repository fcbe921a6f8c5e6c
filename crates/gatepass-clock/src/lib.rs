//! Gatepass Clock - Trusted time for rotating entry codes
//!
//! Rotating barcodes are only scannable if the device and the venue agree on
//! the time, so code generation runs against a network-corrected clock when
//! one is available. This crate provides the [`TrustedClock`] capability
//! trait and the process-wide [`ClockSyncCoordinator`] that guarantees the
//! underlying sync runs at most once, no matter how many sessions ask.

pub mod sync;
pub mod trusted;

pub use sync::{ClockState, ClockSyncCoordinator};
pub use trusted::{ClockError, SystemClock, TrustedClock};
