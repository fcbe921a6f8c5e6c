//! Time-based one-time codes for the rotating PDF417 payload
//!
//! HOTP per RFC 4226, TOTP per RFC 6238. The generator is pure: the caller
//! supplies the epoch timestamp (network-corrected when the trusted clock is
//! synced, local otherwise), so code derivation is deterministic and
//! testable against the published RFC vectors.

use crate::error::OtpError;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha256, Sha512};

/// Hash algorithm used for the HOTP HMAC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OtpAlgorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

/// Validated one-time-code parameters
///
/// Construction fails fast on a digit count outside 6-8 or a zero period;
/// generation itself cannot fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpConfig {
    digits: u32,
    period: u64,
    algorithm: OtpAlgorithm,
}

impl OtpConfig {
    /// Default digit count used by rotating entry tokens
    pub const DEFAULT_DIGITS: u32 = 6;
    /// Default rotation period in seconds used by rotating entry tokens
    pub const DEFAULT_PERIOD: u64 = 15;

    /// Create a validated configuration.
    pub fn new(digits: u32, period: u64, algorithm: OtpAlgorithm) -> Result<Self, OtpError> {
        if !(6..=8).contains(&digits) {
            return Err(OtpError::InvalidDigits { digits });
        }
        if period == 0 {
            return Err(OtpError::InvalidPeriod);
        }
        Ok(Self {
            digits,
            period,
            algorithm,
        })
    }

    /// Number of decimal digits in each code
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Seconds each code stays valid
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Hash algorithm for the HMAC
    pub fn algorithm(&self) -> OtpAlgorithm {
        self.algorithm
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            digits: Self::DEFAULT_DIGITS,
            period: Self::DEFAULT_PERIOD,
            algorithm: OtpAlgorithm::Sha1,
        }
    }
}

/// A generated code and the epoch second its validity window opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Otp {
    /// Zero-padded decimal code of exactly `digits` characters
    pub code: String,
    /// `counter * period`, for cross-device agreement windows and tests
    pub period_start: i64,
}

/// Stateless TOTP generator
#[derive(Debug, Clone, Copy)]
pub struct OtpGenerator {
    config: OtpConfig,
}

impl OtpGenerator {
    pub fn new(config: OtpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Generate the code valid at `timestamp` (epoch seconds).
    ///
    /// Pre-epoch timestamps clamp the counter to zero rather than erroring;
    /// they only occur on a badly wound local clock.
    pub fn generate(&self, secret: &[u8], timestamp: i64) -> Otp {
        let period = self.config.period as i64;
        let counter = timestamp.max(0) / period;
        let code = hotp(
            secret,
            counter as u64,
            self.config.algorithm,
            self.config.digits,
        );
        Otp {
            code,
            period_start: counter * period,
        }
    }
}

/// HOTP per RFC 4226: HMAC over the big-endian 64-bit counter, dynamic
/// truncation, zero-padded decimal rendering.
fn hotp(secret: &[u8], counter: u64, algorithm: OtpAlgorithm, digits: u32) -> String {
    let moving_factor = counter.to_be_bytes();
    let digest = match algorithm {
        OtpAlgorithm::Sha1 => {
            let mut mac =
                Hmac::<Sha1>::new_from_slice(secret).expect("HMAC accepts keys of any length");
            mac.update(&moving_factor);
            mac.finalize().into_bytes().to_vec()
        }
        OtpAlgorithm::Sha256 => {
            let mut mac =
                Hmac::<Sha256>::new_from_slice(secret).expect("HMAC accepts keys of any length");
            mac.update(&moving_factor);
            mac.finalize().into_bytes().to_vec()
        }
        OtpAlgorithm::Sha512 => {
            let mut mac =
                Hmac::<Sha512>::new_from_slice(secret).expect("HMAC accepts keys of any length");
            mac.update(&moving_factor);
            mac.finalize().into_bytes().to_vec()
        }
    };

    // Dynamic truncation: low nibble of the last byte picks a 31-bit window.
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset],
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]) & 0x7fff_ffff;

    let code = binary % 10u32.pow(digits);
    format!("{code:0width$}", width = digits as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // Shared secrets from the RFC 6238 appendix, per algorithm.
    const SHA1_SECRET: &[u8] = b"12345678901234567890";
    const SHA256_SECRET: &[u8] = b"12345678901234567890123456789012";
    const SHA512_SECRET: &[u8] = b"1234567890123456789012345678901234567890123456789012345678901234";

    fn generator(digits: u32, period: u64, algorithm: OtpAlgorithm) -> OtpGenerator {
        OtpGenerator::new(OtpConfig::new(digits, period, algorithm).unwrap())
    }

    #[test]
    fn test_digit_count_is_validated_at_construction() {
        for digits in [0, 5, 9, 12] {
            assert_eq!(
                OtpConfig::new(digits, 30, OtpAlgorithm::Sha1),
                Err(OtpError::InvalidDigits { digits })
            );
        }
        for digits in 6..=8 {
            assert!(OtpConfig::new(digits, 30, OtpAlgorithm::Sha1).is_ok());
        }
    }

    #[test]
    fn test_zero_period_is_rejected() {
        assert_eq!(
            OtpConfig::new(6, 0, OtpAlgorithm::Sha1),
            Err(OtpError::InvalidPeriod)
        );
    }

    #[test]
    fn test_rfc_4226_hotp_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        for (counter, want) in expected.iter().enumerate() {
            assert_eq!(
                hotp(SHA1_SECRET, counter as u64, OtpAlgorithm::Sha1, 6),
                *want,
                "HOTP mismatch at counter {counter}"
            );
        }
    }

    #[test]
    fn test_rfc_6238_totp_vectors() {
        let cases: [(OtpAlgorithm, &[u8], i64, &str); 9] = [
            (OtpAlgorithm::Sha1, SHA1_SECRET, 59, "94287082"),
            (OtpAlgorithm::Sha1, SHA1_SECRET, 1111111109, "07081804"),
            (OtpAlgorithm::Sha1, SHA1_SECRET, 1234567890, "89005924"),
            (OtpAlgorithm::Sha256, SHA256_SECRET, 59, "46119246"),
            (OtpAlgorithm::Sha256, SHA256_SECRET, 1111111109, "68084774"),
            (OtpAlgorithm::Sha256, SHA256_SECRET, 1234567890, "91819424"),
            (OtpAlgorithm::Sha512, SHA512_SECRET, 59, "90693936"),
            (OtpAlgorithm::Sha512, SHA512_SECRET, 1111111109, "25091201"),
            (OtpAlgorithm::Sha512, SHA512_SECRET, 1234567890, "93441116"),
        ];
        for (algorithm, secret, timestamp, want) in cases {
            let otp = generator(8, 30, algorithm).generate(secret, timestamp);
            assert_eq!(otp.code, want, "TOTP mismatch at t={timestamp}");
        }
    }

    #[test]
    fn test_codes_are_stable_within_a_period() {
        let generator = generator(6, 15, OtpAlgorithm::Sha1);
        let first = generator.generate(SHA1_SECRET, 900);
        for timestamp in 900..915 {
            assert_eq!(generator.generate(SHA1_SECRET, timestamp), first);
        }
        assert_ne!(generator.generate(SHA1_SECRET, 915).period_start, first.period_start);
    }

    #[test]
    fn test_period_start_is_the_window_open() {
        let generator = generator(6, 15, OtpAlgorithm::Sha1);
        assert_eq!(generator.generate(SHA1_SECRET, 907).period_start, 900);
        assert_eq!(generator.generate(SHA1_SECRET, 915).period_start, 915);
        assert_eq!(generator.generate(SHA1_SECRET, 0).period_start, 0);
    }

    #[test]
    fn test_pre_epoch_timestamps_clamp_to_counter_zero() {
        let generator = generator(6, 15, OtpAlgorithm::Sha1);
        assert_eq!(
            generator.generate(SHA1_SECRET, -100),
            generator.generate(SHA1_SECRET, 0)
        );
    }

    proptest! {
        #[test]
        fn prop_code_is_exactly_digits_decimal_chars(
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            timestamp in 0i64..4_000_000_000,
            digits in 6u32..=8,
        ) {
            let generator = generator(digits, 30, OtpAlgorithm::Sha1);
            let otp = generator.generate(&secret, timestamp);
            prop_assert_eq!(otp.code.len(), digits as usize);
            prop_assert!(otp.code.chars().all(|c| c.is_ascii_digit()));
            prop_assert!(otp.period_start <= timestamp);
            prop_assert!(timestamp - otp.period_start < 30);
        }
    }
}
