//! Gatepass Render - What the ticket view shows, and when
//!
//! The render state machine turns classified tokens and generated codes into
//! a single authoritative [`RenderState`]: the barcode image on screen, the
//! error panel, or the loading placeholder. Transitions are pure functions
//! so every fallback path (PDF417 → backup QR → error) is directly testable;
//! the owning session serializes them against ticks and user events.

pub mod codec;
pub mod state;

pub use codec::{BarcodeCodec, BarcodeImage, CodecError, QrImageCodec, Symbology};
pub use state::{
    ErrorDisplay, ErrorIcon, RenderState, DEFAULT_ERROR_TEXT, ERROR_TEXT_MAX_CHARS,
};
