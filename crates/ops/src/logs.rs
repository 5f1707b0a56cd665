//! Direct audit log access: append, fetch (ordered), clear.

use chrono::NaiveDateTime;

use jjcims_core::{LogEntry, OpsError, OpsResult};
use jjcims_store::Store;

use crate::Ops;

impl Ops {
    /// Append an employee log entry. `when` defaults to local now; explicit
    /// timestamps are accepted as-is (truncated to seconds).
    pub fn insert_emp_log(
        &self,
        actor: &str,
        details: &str,
        when: Option<NaiveDateTime>,
    ) -> OpsResult<()> {
        let entry = LogEntry::at(when.unwrap_or_else(|| self.now()), actor, details);
        self.store
            .insert_emp_log(&entry)
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    /// Append an admin log entry. Same timestamp rules as [`Self::insert_emp_log`].
    pub fn insert_admin_log(
        &self,
        actor: &str,
        details: &str,
        when: Option<NaiveDateTime>,
    ) -> OpsResult<()> {
        let entry = LogEntry::at(when.unwrap_or_else(|| self.now()), actor, details);
        self.store
            .insert_adm_log(&entry)
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    /// Employee logs, DATE desc then TIME desc. The ordering is enforced
    /// here even if a backend returns rows loosely ordered.
    pub fn fetch_emp_logs(&self) -> OpsResult<Vec<LogEntry>> {
        let mut logs = self
            .store
            .fetch_emp_logs()
            .map_err(|e| OpsError::backend(e.to_string()))?;
        logs.sort_by(LogEntry::descending);
        Ok(logs)
    }

    /// Admin logs, DATE desc then TIME desc.
    pub fn fetch_admin_logs(&self) -> OpsResult<Vec<LogEntry>> {
        let mut logs = self
            .store
            .fetch_adm_logs()
            .map_err(|e| OpsError::backend(e.to_string()))?;
        logs.sort_by(LogEntry::descending);
        Ok(logs)
    }

    pub fn clear_emp_logs(&self) -> OpsResult<()> {
        self.store
            .clear_emp_logs()
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    pub fn clear_admin_logs(&self) -> OpsResult<()> {
        self.store
            .clear_adm_logs()
            .map_err(|e| OpsError::backend(e.to_string()))
    }
}
