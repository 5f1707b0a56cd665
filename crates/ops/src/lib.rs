//! `jjcims-ops` — the typed operations facade.
//!
//! Every UI action lands here: item mutations with status recomputation,
//! employee/credential management, audit log access, and drafts. Business
//! errors pass through unchanged; transient storage errors are retried one
//! layer down; audit and derived-column failures degrade to warnings on an
//! otherwise successful outcome.

use std::sync::Arc;

use jjcims_auth::SecretCipher;
use jjcims_core::{LogEntry, OpsError, Warning};
use jjcims_store::{Config, Store, StoreError, open_store};

mod drafts;
mod employees;
mod items;
mod logs;
mod outcome;

pub use outcome::{OpResult, Outcome};

/// The query facade: one value per logical client, sharing a store.
#[derive(Clone)]
pub struct Ops {
    store: Arc<dyn Store>,
    cipher: SecretCipher,
}

impl Ops {
    pub fn new(store: Arc<dyn Store>, cipher: SecretCipher) -> Self {
        Self { store, cipher }
    }

    /// Wire up the configured backend and credential key. This is the
    /// startup path, so process-wide tracing comes up here too.
    pub fn from_config(config: &Config) -> Result<Self, OpsError> {
        jjcims_observability::init();
        let key = config
            .fernet_key
            .as_deref()
            .ok_or_else(|| OpsError::input("credential key is not configured"))?;
        let cipher = SecretCipher::from_key_b64(key)
            .map_err(|e| OpsError::input(format!("credential key: {e}")))?;
        let store = open_store(config).map_err(|e| OpsError::backend(e.to_string()))?;
        Ok(Self::new(Arc::from(store), cipher))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    fn now(&self) -> chrono::NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    /// Best-effort admin audit append; failures become warnings.
    fn audit_admin(&self, actor: &str, details: String, warnings: &mut Vec<Warning>) {
        let entry = LogEntry::at(self.now(), actor, details);
        if let Err(err) = self.store.insert_adm_log(&entry) {
            tracing::warn!(error = %err, "admin audit append failed");
            warnings.push(Warning::Audit(err.to_string()));
        }
    }

    /// Best-effort employee audit append; failures become warnings.
    fn audit_employee(&self, actor: &str, details: String, warnings: &mut Vec<Warning>) {
        let entry = LogEntry::at(self.now(), actor, details);
        if let Err(err) = self.store.insert_emp_log(&entry) {
            tracing::warn!(error = %err, "employee audit append failed");
            warnings.push(Warning::Audit(err.to_string()));
        }
    }
}

/// Map a connector error, naming what the operation was after.
fn store_err(err: StoreError, what: &str) -> OpsError {
    match err {
        StoreError::Missing => OpsError::not_found(what.to_string()),
        other => OpsError::backend(other.to_string()),
    }
}
