//! Add-item drafts: saved mid-entry, consumed on a successful add.

use jjcims_core::{Draft, NewDraft, OpsError, OpsResult};
use jjcims_store::Store;

use crate::{Ops, store_err};

impl Ops {
    /// Persist a partially entered item. Drafts are not validated; they
    /// capture whatever was typed so far.
    pub fn save_draft(&self, draft: NewDraft) -> OpsResult<i64> {
        self.store
            .insert_draft(&draft)
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    pub fn list_drafts(&self) -> OpsResult<Vec<Draft>> {
        self.store
            .fetch_drafts()
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    pub fn delete_draft(&self, id: i64) -> OpsResult<()> {
        self.store
            .delete_draft(id)
            .map_err(|e| store_err(e, &format!("draft {id}")))
    }
}
