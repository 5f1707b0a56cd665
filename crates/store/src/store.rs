//! The connector contract.

use rust_decimal::Decimal;

use jjcims_core::{
    DashboardRow, Draft, Employee, EmployeePatch, Item, ItemPatch, ItemSummary, LogEntry,
    NewDraft, StockStatus,
};

use crate::error::StoreResult;

/// Uniform query/mutation surface over a storage backend.
///
/// One method per recognized operation; nothing resembling raw SQL crosses
/// this boundary, which keeps the remote backend's finite endpoint set and
/// the local backend from drifting apart.
///
/// Every call is synchronous, blocking, and independent: implementations
/// hold no storage handle between calls, so a single store value may be
/// shared across worker threads. A backend without a translation for some
/// operation fails fast with [`StoreError::NotSupported`].
///
/// [`StoreError::NotSupported`]: crate::StoreError::NotSupported
pub trait Store: Send + Sync {
    /// Short backend label for logs and error messages.
    fn backend_name(&self) -> &'static str;

    // ── Items ────────────────────────────────────────────────────────────

    fn fetch_items(&self) -> StoreResult<Vec<Item>>;
    fn fetch_dashboard(&self) -> StoreResult<Vec<DashboardRow>>;
    fn fetch_items_by_type(&self, category: &str) -> StoreResult<Vec<ItemSummary>>;
    /// Case-insensitive name lookup.
    fn fetch_item_by_name(&self, name: &str) -> StoreResult<Option<Item>>;
    fn fetch_item_by_id(&self, id: i64) -> StoreResult<Option<Item>>;
    fn unit_of_measure(&self, name: &str) -> StoreResult<Option<String>>;
    /// Insert a fully materialized row; returns the assigned id.
    fn insert_item(&self, item: &Item) -> StoreResult<i64>;
    /// Write only the columns carried by the patch.
    fn update_item(&self, id: i64, patch: &ItemPatch) -> StoreResult<()>;
    fn delete_item_by_name(&self, name: &str) -> StoreResult<()>;
    fn delete_item_by_id(&self, id: i64) -> StoreResult<()>;
    /// Increase OUT and decrease BALANCE by `qty` in one write.
    fn increment_out(&self, name: &str, qty: i64) -> StoreResult<()>;
    /// Write back the derived columns after a stock-affecting mutation.
    /// Backends whose server derives these may treat this as a no-op.
    fn write_derived(
        &self,
        name: &str,
        status: StockStatus,
        deficit: i64,
        cost: Decimal,
    ) -> StoreResult<()>;

    // ── Logs ─────────────────────────────────────────────────────────────

    fn insert_emp_log(&self, entry: &LogEntry) -> StoreResult<()>;
    fn insert_adm_log(&self, entry: &LogEntry) -> StoreResult<()>;
    /// Ordered DATE desc, TIME desc.
    fn fetch_emp_logs(&self) -> StoreResult<Vec<LogEntry>>;
    /// Ordered DATE desc, TIME desc.
    fn fetch_adm_logs(&self) -> StoreResult<Vec<LogEntry>>;
    fn clear_emp_logs(&self) -> StoreResult<()>;
    fn clear_adm_logs(&self) -> StoreResult<()>;

    // ── Employees ────────────────────────────────────────────────────────

    fn fetch_employees(&self) -> StoreResult<Vec<Employee>>;
    /// Exact-case lookup.
    fn fetch_employee(&self, username: &str) -> StoreResult<Option<Employee>>;
    /// Case-insensitive lookup; callers pass the lowercased username.
    fn fetch_employee_ci(&self, username_lower: &str) -> StoreResult<Option<Employee>>;
    /// The login fast path: 2FA secret ciphertext plus access level.
    fn employee_2fa_and_access(
        &self,
        username_lower: &str,
    ) -> StoreResult<Option<(Option<String>, jjcims_core::AccessLevel)>>;
    fn insert_employee(&self, employee: &Employee) -> StoreResult<i64>;
    fn update_employee(&self, username: &str, patch: &EmployeePatch) -> StoreResult<()>;
    fn delete_employee(&self, username: &str) -> StoreResult<()>;

    // ── Drafts ───────────────────────────────────────────────────────────

    fn insert_draft(&self, draft: &NewDraft) -> StoreResult<i64>;
    fn fetch_drafts(&self) -> StoreResult<Vec<Draft>>;
    fn delete_draft(&self, id: i64) -> StoreResult<()>;
}
