//! Domain error model.

use thiserror::Error;

/// Result type used across the domain operations layer.
pub type OpsResult<T> = Result<T, OpsError>;

/// Domain-level error surfaced at the operations boundary.
///
/// Keep this focused on deterministic business failures (validation,
/// collisions, auth). Transport and lock retries live in the store layer;
/// what escapes it arrives here as `Backend`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OpsError {
    /// A required field was missing or a value failed to parse.
    #[error("invalid input: {0}")]
    Input(String),

    /// An item name or username collided with an existing row.
    #[error("already exists: {0}")]
    Uniqueness(String),

    /// Password or TOTP verification failed.
    ///
    /// Deliberately carries no detail; callers show a single generic message.
    #[error("authentication failed")]
    Auth,

    /// A requested item/employee/draft does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage backend failed after retries were exhausted.
    #[error("storage failure: {0}")]
    Backend(String),
}

impl OpsError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    pub fn uniqueness(msg: impl Into<String>) -> Self {
        Self::Uniqueness(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Non-fatal degradation reported alongside a successful operation.
///
/// Mutations succeed even when these occur; the UI surfaces them so the
/// operator knows the record trail is incomplete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The audit append failed; the primary mutation still committed.
    Audit(String),
    /// Derived columns (STATUS/DEFICIT) could not be written back.
    Derivation(String),
}

impl core::fmt::Display for Warning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Warning::Audit(msg) => write!(f, "audit append failed: {msg}"),
            Warning::Derivation(msg) => write!(f, "derived columns not written: {msg}"),
        }
    }
}
