//! Time-based one-time passwords (RFC 6238 over HMAC-SHA1).
//!
//! 30-second steps, 6-digit codes, base32 secrets. Verification accepts the
//! current step plus one step either side; the tolerance is a constant, not
//! configuration.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha1::Sha1;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Length of one code window in seconds.
pub const STEP_SECONDS: u64 = 30;

/// Digits per code.
pub const DIGITS: u32 = 6;

/// Accepted clock skew, in steps, on either side of now.
pub const SKEW_STEPS: i64 = 1;

const SECRET_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotpError {
    #[error("secret is not valid base32")]
    InvalidSecret,
}

/// A decoded TOTP secret.
#[derive(Clone)]
pub struct Totp {
    secret: Vec<u8>,
}

impl Totp {
    /// Decode a base32 secret (padded or not, any case).
    pub fn from_base32(encoded: &str) -> Result<Self, TotpError> {
        let normalized = encoded.trim().trim_end_matches('=').to_uppercase();
        if normalized.is_empty() {
            return Err(TotpError::InvalidSecret);
        }
        let secret = base32::decode(base32::Alphabet::RFC4648 { padding: false }, &normalized)
            .ok_or(TotpError::InvalidSecret)?;
        Ok(Self { secret })
    }

    /// The code for the step containing `unix_seconds`.
    pub fn code_at(&self, unix_seconds: u64) -> String {
        self.code_for_step(unix_seconds / STEP_SECONDS)
    }

    /// Verify a code against the step containing `unix_seconds`, tolerating
    /// `SKEW_STEPS` steps of drift either side.
    pub fn verify_at(&self, code: &str, unix_seconds: u64) -> bool {
        let code = code.trim();
        if code.len() != DIGITS as usize || !code.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        let step = (unix_seconds / STEP_SECONDS) as i64;
        (-SKEW_STEPS..=SKEW_STEPS).any(|offset| {
            let candidate = step + offset;
            candidate >= 0 && self.code_for_step(candidate as u64) == code
        })
    }

    /// Verify a code against the device clock.
    pub fn verify_now(&self, code: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.verify_at(code, now)
    }

    fn code_for_step(&self, step: u64) -> String {
        let mut mac = match HmacSha1::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            // HMAC accepts keys of any length; unreachable with a decoded secret.
            Err(_) => return String::new(),
        };
        mac.update(&step.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        // Dynamic truncation (RFC 4226 §5.4).
        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = (u32::from(digest[offset] & 0x7f) << 24)
            | (u32::from(digest[offset + 1]) << 16)
            | (u32::from(digest[offset + 2]) << 8)
            | u32::from(digest[offset + 3]);
        let code = binary % 10u32.pow(DIGITS);
        format!("{code:0width$}", width = DIGITS as usize)
    }
}

impl core::fmt::Debug for Totp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never expose secret material through Debug.
        f.write_str("Totp")
    }
}

/// Generate a fresh 20-byte secret, base32-encoded for enrollment QR codes.
pub fn generate_secret() -> String {
    use rand::RngCore;

    let mut bytes = [0u8; SECRET_LEN];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    base32::encode(base32::Alphabet::RFC4648 { padding: false }, &bytes)
}
