//! Warning-carrying results for mutating operations.

use jjcims_core::{OpsError, Warning};

/// Result of a mutation: the primary effect either failed, or succeeded
/// possibly with non-fatal degradations attached.
pub type OpResult<T> = Result<Outcome<T>, OpsError>;

/// A successful operation plus any best-effort failures along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
