//! Gatepass Core - Token classification and one-time-code generation
//!
//! This crate holds the pure decision logic of Gatepass: turning an opaque
//! entry token into a typed [`EntryDescriptor`], and deriving the rotating
//! one-time codes that feed the PDF417 payload. It performs no I/O; the
//! caller supplies the (network-corrected) timestamp.

pub mod error;
pub mod otp;
pub mod token;

pub use error::OtpError;
pub use otp::{Otp, OtpAlgorithm, OtpConfig, OtpGenerator};
pub use token::EntryDescriptor;
