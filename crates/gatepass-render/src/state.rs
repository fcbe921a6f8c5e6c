//! Render state machine
//!
//! One value answers "what is on screen right now". States are replaced
//! wholesale on every transition; there is no partial mutation. Each
//! transition takes the codec it needs and resolves encoding failures
//! internally through the fallback chain, so callers never see a half
//! rendered state.

use crate::codec::{BarcodeCodec, BarcodeImage, Symbology};
use tracing::{debug, warn};

/// Error text shown when the caller supplies none
pub const DEFAULT_ERROR_TEXT: &str = "Reload ticket";

/// Displayed error text is cut at this many characters
pub const ERROR_TEXT_MAX_CHARS: usize = 60;

/// Icon shown on the error panel.
///
/// The library ships no image assets; `Alert` tells the host to use its
/// default alert artwork.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ErrorIcon {
    #[default]
    Alert,
    Custom(BarcodeImage),
}

/// Message and icon for an error panel, truncated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDisplay {
    pub message: String,
    pub icon: ErrorIcon,
}

impl ErrorDisplay {
    pub fn new(message: &str, icon: ErrorIcon) -> Self {
        Self {
            message: truncate_display_text(message),
            icon,
        }
    }
}

impl Default for ErrorDisplay {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_TEXT, ErrorIcon::Alert)
    }
}

/// Truncate panel text to [`ERROR_TEXT_MAX_CHARS`] characters, marking the
/// cut with an ellipsis.
pub fn truncate_display_text(text: &str) -> String {
    if text.chars().count() > ERROR_TEXT_MAX_CHARS {
        let truncated: String = text.chars().take(ERROR_TEXT_MAX_CHARS).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

/// The authoritative "what is on screen" value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RenderState {
    /// Nothing to show; no token has been supplied (or it was cleared)
    #[default]
    None,
    /// Placeholder while the first clock sync is still in flight
    Loading,
    /// Static QR barcode
    QrCode {
        barcode: String,
        image: BarcodeImage,
        subtitle: String,
    },
    /// Static PDF417 barcode
    StaticPdf417 {
        barcode: String,
        image: BarcodeImage,
        subtitle: String,
    },
    /// Live rotating PDF417
    RotatingPdf417 {
        /// The encoded rotating payload (`token::[eventCode::]customerCode`)
        rotating_message: String,
        /// Static backup barcode, if the token carried one
        barcode: Option<String>,
        image: BarcodeImage,
        subtitle: String,
        /// Alternates on each successful regeneration; purely cosmetic
        flipped: bool,
        /// User is viewing the backup static code instead of the live one
        toggled: bool,
    },
    /// Automatic failure (classification or exhausted fallbacks)
    Error { message: String, icon: ErrorIcon },
    /// Caller-supplied failure; never overwritten by ticks
    CustomError { message: String, icon: ErrorIcon },
}

impl RenderState {
    /// The idle state, re-entered when the token is cleared.
    pub fn reset() -> Self {
        RenderState::None
    }

    /// Automatic error panel.
    pub fn show_error(&self, error: &ErrorDisplay) -> Self {
        RenderState::Error {
            message: error.message.clone(),
            icon: error.icon.clone(),
        }
    }

    /// Caller-requested error panel.
    pub fn show_custom_error(&self, error: &ErrorDisplay) -> Self {
        RenderState::CustomError {
            message: error.message.clone(),
            icon: error.icon.clone(),
        }
    }

    /// Render a static QR barcode; encoding failure exhausts the chain.
    pub fn show_qr_code(
        &self,
        codec: &dyn BarcodeCodec,
        barcode: &str,
        subtitle: &str,
        error: &ErrorDisplay,
    ) -> Self {
        match codec.encode(Symbology::Qr, barcode) {
            Ok(image) => RenderState::QrCode {
                barcode: barcode.to_string(),
                image,
                subtitle: subtitle.to_string(),
            },
            Err(e) => {
                warn!("QR encoding failed: {}", e);
                self.show_error(error)
            }
        }
    }

    /// Render a static PDF417 barcode, falling back to a QR of the same
    /// value if the PDF417 encoder fails.
    pub fn show_static_pdf417(
        &self,
        codec: &dyn BarcodeCodec,
        barcode: &str,
        pdf417_subtitle: &str,
        qr_subtitle: &str,
        error: &ErrorDisplay,
    ) -> Self {
        match codec.encode(Symbology::Pdf417, barcode) {
            Ok(image) => RenderState::StaticPdf417 {
                barcode: barcode.to_string(),
                image,
                subtitle: pdf417_subtitle.to_string(),
            },
            Err(e) => {
                warn!("PDF417 encoding failed, falling back to QR: {}", e);
                self.show_qr_code(codec, barcode, qr_subtitle, error)
            }
        }
    }

    /// Render the live rotating PDF417 payload.
    ///
    /// On encoder failure the backup barcode (when present) is rendered as a
    /// QR instead; only the exhaustion of both yields the error panel. Each
    /// successful render flips the cosmetic `flipped` flag relative to the
    /// previous rotating state.
    pub fn show_rotating_pdf417(
        &self,
        codec: &dyn BarcodeCodec,
        rotating_message: &str,
        barcode: Option<&str>,
        pdf417_subtitle: &str,
        qr_subtitle: &str,
        error: &ErrorDisplay,
    ) -> Self {
        match codec.encode(Symbology::Pdf417, rotating_message) {
            Ok(image) => RenderState::RotatingPdf417 {
                rotating_message: rotating_message.to_string(),
                barcode: barcode.map(str::to_string),
                image,
                subtitle: pdf417_subtitle.to_string(),
                flipped: !self.rotating_flipped(),
                toggled: false,
            },
            Err(e) => match barcode {
                Some(barcode) => {
                    warn!("rotating PDF417 encoding failed, falling back to QR: {}", e);
                    self.show_qr_code(codec, barcode, qr_subtitle, error)
                }
                None => {
                    warn!("rotating PDF417 encoding failed with no backup barcode: {}", e);
                    self.show_error(error)
                }
            },
        }
    }

    /// Switch a live rotating state to its backup QR.
    ///
    /// Valid only for `RotatingPdf417` with a present backup barcode and
    /// `toggled == false`; anywhere else this is a no-op. If the backup QR
    /// itself fails to encode, the live code stays up. Reverting (user
    /// toggle or expiry) goes through [`show_rotating_pdf417`] so the codes
    /// are regenerated fresh.
    ///
    /// [`show_rotating_pdf417`]: RenderState::show_rotating_pdf417
    pub fn toggle_to_backup(&self, codec: &dyn BarcodeCodec, qr_subtitle: &str) -> Self {
        match self {
            RenderState::RotatingPdf417 {
                rotating_message,
                barcode: Some(barcode),
                flipped,
                toggled: false,
                ..
            } => match codec.encode(Symbology::Qr, barcode) {
                Ok(image) => RenderState::RotatingPdf417 {
                    rotating_message: rotating_message.clone(),
                    barcode: Some(barcode.clone()),
                    image,
                    subtitle: qr_subtitle.to_string(),
                    flipped: *flipped,
                    toggled: true,
                },
                Err(e) => {
                    warn!("backup QR encoding failed, staying on the live code: {}", e);
                    self.clone()
                }
            },
            _ => {
                debug!("toggle ignored in the current state");
                self.clone()
            }
        }
    }

    /// Whether this state accepts a toggle request.
    pub fn can_toggle(&self) -> bool {
        matches!(
            self,
            RenderState::RotatingPdf417 {
                barcode: Some(_),
                ..
            }
        )
    }

    /// Whether the backup code is currently shown.
    pub fn is_toggled(&self) -> bool {
        matches!(self, RenderState::RotatingPdf417 { toggled: true, .. })
    }

    fn rotating_flipped(&self) -> bool {
        matches!(self, RenderState::RotatingPdf417 { flipped: true, .. })
    }
}
