//! Barcode image generation capability
//!
//! Rendering a message string into barcode pixels is a host concern: the
//! state machine only needs to know whether it succeeded. The bundled
//! [`QrImageCodec`] covers QR via the `qrcode` crate; PDF417 rasterization
//! is left to the embedding platform's encoder.

use image::GrayImage;
use qrcode::{EcLevel, QrCode};
use std::fmt;
use thiserror::Error;

/// Rendered barcode pixels, 8-bit grayscale
pub type BarcodeImage = GrayImage;

/// Supported 2D symbologies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    Qr,
    Pdf417,
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbology::Qr => write!(f, "QR"),
            Symbology::Pdf417 => write!(f, "PDF417"),
        }
    }
}

/// Barcode encoding errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{0} encoding is not supported by this codec")]
    Unsupported(Symbology),

    #[error("{symbology} encoding failed: {reason}")]
    Encode {
        symbology: Symbology,
        reason: String,
    },
}

/// Turns a message string into a rendered barcode image, or fails.
///
/// Failures are recoverable: the state machine falls back along the chain
/// described in [`RenderState`](crate::RenderState) rather than surfacing
/// codec errors to the host.
pub trait BarcodeCodec: Send + Sync {
    fn encode(&self, symbology: Symbology, message: &str) -> Result<BarcodeImage, CodecError>;
}

/// Reference codec backed by the `qrcode` crate.
///
/// Encodes QR symbols at correction level Q (the level scanners at venue
/// gates are tuned for). PDF417 is reported as unsupported, which routes
/// rotating tickets through the QR fallback; hosts with a native PDF417
/// encoder should wrap it in their own [`BarcodeCodec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QrImageCodec;

impl BarcodeCodec for QrImageCodec {
    fn encode(&self, symbology: Symbology, message: &str) -> Result<BarcodeImage, CodecError> {
        match symbology {
            Symbology::Qr => {
                let code = QrCode::with_error_correction_level(message.as_bytes(), EcLevel::Q)
                    .map_err(|e| CodecError::Encode {
                        symbology,
                        reason: e.to_string(),
                    })?;
                Ok(code.render::<image::Luma<u8>>().build())
            }
            Symbology::Pdf417 => Err(CodecError::Unsupported(symbology)),
        }
    }
}
