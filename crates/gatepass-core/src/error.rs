//! Error types for Gatepass core logic

use thiserror::Error;

/// One-time-code configuration errors
///
/// Classification never fails (it degrades to [`EntryDescriptor::Invalid`]
/// instead), so the only hard failure in this crate is a misconfigured
/// [`OtpConfig`], which is rejected at construction time.
///
/// [`EntryDescriptor::Invalid`]: crate::EntryDescriptor::Invalid
/// [`OtpConfig`]: crate::OtpConfig
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("digit count {digits} outside the supported range 6-8")]
    InvalidDigits { digits: u32 },

    #[error("code period must be greater than zero")]
    InvalidPeriod,
}
