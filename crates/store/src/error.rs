//! Connector-level error model.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage/transport failure below the operations layer.
///
/// Transient variants (`Locked`, `Transport`, and server-side `Http`) are
/// candidates for the connector's bounded retry; everything else surfaces
/// immediately.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The local artifact was held by another writer.
    #[error("database is locked: {0}")]
    Locked(String),

    /// The request never produced a response (connect, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote API answered with a non-success status other than 404.
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },

    /// The statement shape has no translation on this backend.
    #[error("operation '{op}' is not supported by the {backend} backend")]
    NotSupported {
        backend: &'static str,
        op: &'static str,
    },

    /// A mutation matched no row.
    #[error("no matching row")]
    Missing,

    /// Anything else the backend reported.
    #[error("storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, StoreError::Locked(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, StoreError::Transport(_))
    }

    /// Retry predicate for remote reads: transport failures and non-404
    /// error statuses.
    pub fn is_retryable_read(&self) -> bool {
        matches!(self, StoreError::Transport(_) | StoreError::Http { .. })
    }
}
