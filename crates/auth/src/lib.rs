//! `jjcims-auth` — credential encryption and TOTP verification.
//!
//! Stored passwords and 2FA secrets are ciphertext only; plaintext exists
//! transiently inside a verification call. The symmetric key is configured
//! at deployment and treated as read-only for the process lifetime.

pub mod cipher;
pub mod totp;

pub use cipher::{CipherError, SecretCipher};
pub use totp::{Totp, TotpError, generate_secret};
