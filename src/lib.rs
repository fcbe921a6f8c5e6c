//! Gatepass - Rotating entry barcode core
//!
//! Gatepass is the decision core of a secure ticket view: it classifies
//! opaque entry tokens, derives the rotating one-time codes that defeat
//! screenshot replay, and runs the tick-driven state machine that decides
//! what the host renders each second. Pixels, layout, and animation stay on
//! the host side; Gatepass hands it a single [`RenderState`] to draw.
//!
//! # Example
//!
//! ```no_run
//! use gatepass::{ClockSyncCoordinator, EntrySession, QrImageCodec, SessionConfig, SystemClock};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // One coordinator per process: the clock sync runs at most once.
//!     let clock = Arc::new(ClockSyncCoordinator::new(Arc::new(SystemClock)));
//!
//!     let session = EntrySession::spawn(
//!         Arc::new(QrImageCodec),
//!         Arc::clone(&clock),
//!         SessionConfig::default(),
//!     );
//!
//!     session.set_token("eyJiIjoiNDg2ODg2OTg3Nzc1MTAwOWEifQ==", None).await;
//!
//!     let mut states = session.subscribe();
//!     while states.changed().await.is_ok() {
//!         let state = states.borrow_and_update().clone();
//!         // Hand the state to the view layer.
//!         println!("{:?}", state);
//!     }
//! }
//! ```

pub mod session;

pub use gatepass_clock::{ClockError, ClockState, ClockSyncCoordinator, SystemClock, TrustedClock};
pub use gatepass_core::{EntryDescriptor, Otp, OtpAlgorithm, OtpConfig, OtpError, OtpGenerator};
pub use gatepass_render::{
    BarcodeCodec, BarcodeImage, CodecError, ErrorDisplay, ErrorIcon, QrImageCodec, RenderState,
    Symbology, DEFAULT_ERROR_TEXT, ERROR_TEXT_MAX_CHARS,
};
pub use session::{EntrySession, SessionConfig, DEFAULT_TICK_INTERVAL, DEFAULT_TOGGLE_REVERT};
