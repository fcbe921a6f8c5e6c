//! Entry token classification
//!
//! Tokens arrive as either a bare digit barcode or a base64-wrapped JSON
//! envelope carrying a static barcode and/or rotating-symbology key material.
//! Classification is total: anything unusable comes back as
//! [`EntryDescriptor::Invalid`] rather than an error.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use tracing::debug;

/// Explicit render-type hint forcing the rotating symbology
const RENDER_TYPE_ROTATING: &str = "rotating_symbology";
/// Explicit render-type hint forcing the static barcode
const RENDER_TYPE_BARCODE: &str = "barcode";

/// JSON envelope carried inside a base64 token
///
/// All fields are optional; which ones are present (and usable) decides the
/// descriptor variant.
#[derive(Debug, Clone, Default, Deserialize)]
struct EntryPayload {
    /// Static barcode value
    b: Option<String>,
    /// Rotating entry token
    t: Option<String>,
    /// Customer key, hex-encoded
    ck: Option<String>,
    /// Event key, hex-encoded
    ek: Option<String>,
    /// Explicit render-type hint
    rt: Option<String>,
}

/// Classified form of an entry token
///
/// Immutable result of [`EntryDescriptor::classify`]; the session caches it
/// per raw token and re-parses only when the input value changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDescriptor {
    /// Token was unparsable or semantically empty
    Invalid,
    /// Static QR barcode
    QrCode { barcode: String },
    /// Static PDF417 barcode
    StaticPdf417 { barcode: String },
    /// Rotating PDF417 with OTP key material
    RotatingPdf417 {
        /// Rotating entry token, first segment of the PDF417 payload
        token: String,
        /// Customer OTP secret, always non-empty
        customer_key: Vec<u8>,
        /// Event OTP secret, only if supplied and decodable
        event_key: Option<Vec<u8>>,
        /// Static backup barcode, only if supplied and non-empty
        barcode: Option<String>,
    },
}

impl EntryDescriptor {
    /// Classify a raw entry token.
    ///
    /// Never fails; worst case is [`EntryDescriptor::Invalid`]. A token is
    /// first treated as a base64 JSON envelope; if that fails at any layer
    /// (base64, UTF-8, JSON) it is matched against the bare barcode pattern
    /// of 12 to 18 ASCII digits with an optional trailing letter.
    pub fn classify(raw: &str) -> Self {
        let payload = match decode_envelope(raw) {
            Some(payload) => payload,
            None => {
                if is_bare_barcode(raw) {
                    debug!("token matched the bare digit-barcode pattern");
                    return EntryDescriptor::QrCode {
                        barcode: raw.to_string(),
                    };
                }
                debug!("token is neither a JSON envelope nor a bare barcode");
                return EntryDescriptor::Invalid;
            }
        };

        payload.into_descriptor()
    }

    /// Whether this descriptor can be rendered at all
    pub fn is_valid(&self) -> bool {
        !matches!(self, EntryDescriptor::Invalid)
    }

    /// The static barcode value, if one was supplied
    pub fn barcode(&self) -> Option<&str> {
        match self {
            EntryDescriptor::Invalid => None,
            EntryDescriptor::QrCode { barcode } | EntryDescriptor::StaticPdf417 { barcode } => {
                Some(barcode)
            }
            EntryDescriptor::RotatingPdf417 { barcode, .. } => barcode.as_deref(),
        }
    }

    /// The rotating entry token, for rotating descriptors
    pub fn rotating_token(&self) -> Option<&str> {
        match self {
            EntryDescriptor::RotatingPdf417 { token, .. } => Some(token),
            _ => None,
        }
    }

    /// Decoded customer OTP secret, for rotating descriptors
    pub fn customer_key(&self) -> Option<&[u8]> {
        match self {
            EntryDescriptor::RotatingPdf417 { customer_key, .. } => Some(customer_key),
            _ => None,
        }
    }

    /// Decoded event OTP secret, if one was supplied
    pub fn event_key(&self) -> Option<&[u8]> {
        match self {
            EntryDescriptor::RotatingPdf417 { event_key, .. } => event_key.as_deref(),
            _ => None,
        }
    }
}

impl EntryPayload {
    /// Resolve the payload fields into a descriptor.
    ///
    /// An explicit `rt` hint takes precedence over field-based inference;
    /// a rotating hint without usable keys degrades to a static PDF417
    /// rather than `Invalid` so the ticket stays scannable.
    fn into_descriptor(self) -> EntryDescriptor {
        let barcode = self.b.unwrap_or_default();
        let token = self.t.unwrap_or_default();
        let customer_key = self.ck.as_deref().and_then(decode_key);
        let event_key = self.ek.as_deref().and_then(decode_key);

        let has_barcode = !barcode.is_empty();
        let rotating_pair = if token.is_empty() {
            None
        } else {
            customer_key
        };

        match self.rt.as_deref() {
            Some(RENDER_TYPE_ROTATING) => match rotating_pair {
                Some(customer_key) => EntryDescriptor::RotatingPdf417 {
                    token,
                    customer_key,
                    event_key,
                    barcode: has_barcode.then_some(barcode),
                },
                // Explicit rotating intent without usable keys: degrade to a
                // static symbol instead of refusing to render.
                None => EntryDescriptor::StaticPdf417 { barcode },
            },
            Some(RENDER_TYPE_BARCODE) => EntryDescriptor::QrCode { barcode },
            _ => match rotating_pair {
                Some(customer_key) => EntryDescriptor::RotatingPdf417 {
                    token,
                    customer_key,
                    event_key,
                    barcode: has_barcode.then_some(barcode),
                },
                None if has_barcode => EntryDescriptor::QrCode { barcode },
                None => EntryDescriptor::Invalid,
            },
        }
    }
}

/// Decode the base64 JSON envelope, if the token is one.
fn decode_envelope(raw: &str) -> Option<EntryPayload> {
    let bytes = BASE64.decode(raw).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Decode hex key material.
///
/// Odd-length or non-hex input invalidates the key entirely (treated as
/// absent), as does an empty string.
fn decode_key(hex_str: &str) -> Option<Vec<u8>> {
    if hex_str.is_empty() {
        return None;
    }
    match hex::decode(hex_str) {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        Ok(_) => None,
        Err(e) => {
            debug!("discarding malformed hex key material: {}", e);
            None
        }
    }
}

/// Test for the bare barcode pattern `^[0-9]{12,18}[A-Za-z]?$`.
fn is_bare_barcode(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if !(12..=18).contains(&digits) {
        return false;
    }
    match bytes.len() - digits {
        0 => true,
        1 => bytes[digits].is_ascii_alphabetic(),
        _ => false,
    }
}
