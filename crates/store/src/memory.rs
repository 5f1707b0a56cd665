//! In-memory backend.
//!
//! Intended for tests and development. Mirrors the storage semantics of the
//! local backend: case-insensitive name/username uniqueness, descending log
//! order, and `Missing` on mutations that match nothing.

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;

use jjcims_core::{
    AccessLevel, DashboardRow, Draft, Employee, EmployeePatch, Item, ItemPatch, ItemSummary,
    LogEntry, NewDraft, StockStatus,
};

use crate::error::{StoreError, StoreResult};
use crate::store::Store;

#[derive(Debug, Default)]
struct Inner {
    items: Vec<Item>,
    next_item_id: i64,
    employees: Vec<Employee>,
    next_employee_id: i64,
    emp_logs: Vec<LogEntry>,
    adm_logs: Vec<LogEntry>,
    drafts: Vec<Draft>,
    next_draft_id: i64,
}

/// In-memory store for tests/dev. Not optimized for volume.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    fail_next_log_append: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next log append fail once, for exercising the best-effort
    /// audit path.
    pub fn fail_next_log_append(&self) {
        self.fail_next_log_append.store(true, Ordering::SeqCst);
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))
    }

    fn take_log_failure(&self) -> bool {
        self.fail_next_log_append.swap(false, Ordering::SeqCst)
    }
}

fn sorted_by_name<T: Clone>(rows: Vec<T>, name: impl Fn(&T) -> String) -> Vec<T> {
    let mut rows = rows;
    rows.sort_by_key(|r| name(r).to_lowercase());
    rows
}

fn sorted_desc(logs: &[LogEntry]) -> Vec<LogEntry> {
    let mut logs = logs.to_vec();
    logs.sort_by(LogEntry::descending);
    logs
}

impl Store for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn fetch_items(&self) -> StoreResult<Vec<Item>> {
        Ok(sorted_by_name(self.read()?.items.clone(), |i| i.name.clone()))
    }

    fn fetch_dashboard(&self) -> StoreResult<Vec<DashboardRow>> {
        let items = self.fetch_items()?;
        Ok(items.iter().map(DashboardRow::from).collect())
    }

    fn fetch_items_by_type(&self, category: &str) -> StoreResult<Vec<ItemSummary>> {
        let items = self.fetch_items()?;
        Ok(items
            .iter()
            .filter(|i| i.item_type == category && i.status != StockStatus::OutOfStock)
            .map(ItemSummary::from)
            .collect())
    }

    fn fetch_item_by_name(&self, name: &str) -> StoreResult<Option<Item>> {
        Ok(self
            .read()?
            .items
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn fetch_item_by_id(&self, id: i64) -> StoreResult<Option<Item>> {
        Ok(self.read()?.items.iter().find(|i| i.id == id).cloned())
    }

    fn unit_of_measure(&self, name: &str) -> StoreResult<Option<String>> {
        Ok(self
            .fetch_item_by_name(name)?
            .map(|i| i.unit_of_measure))
    }

    fn insert_item(&self, item: &Item) -> StoreResult<i64> {
        let mut inner = self.write()?;
        if inner
            .items
            .iter()
            .any(|i| i.name.eq_ignore_ascii_case(&item.name))
        {
            return Err(StoreError::backend("UNIQUE constraint failed: ITEMSDB.NAME"));
        }
        inner.next_item_id += 1;
        let id = inner.next_item_id;
        let mut stored = item.clone();
        stored.id = id;
        inner.items.push(stored);
        Ok(id)
    }

    fn update_item(&self, id: i64, patch: &ItemPatch) -> StoreResult<()> {
        let mut inner = self.write()?;
        let item = inner
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(StoreError::Missing)?;

        // Only the patched columns change here; derived columns arrive via
        // write_derived, exactly like the local backend.
        if let Some(v) = &patch.name {
            item.name = v.clone();
        }
        if let Some(v) = &patch.brand {
            item.brand = v.clone();
        }
        if let Some(v) = &patch.item_type {
            item.item_type = v.clone();
        }
        if let Some(v) = &patch.location {
            item.location = v.clone();
        }
        if let Some(v) = &patch.unit_of_measure {
            item.unit_of_measure = v.clone();
        }
        if let Some(v) = patch.stock_in {
            item.stock_in = v;
        }
        if let Some(v) = patch.stock_out {
            item.stock_out = v;
        }
        if patch.stock_in.is_some() || patch.stock_out.is_some() {
            item.balance = item.stock_in - item.stock_out;
        }
        if let Some(v) = patch.min_stock {
            item.min_stock = v;
        }
        if let Some(v) = patch.price_per_unit {
            item.price_per_unit = v;
        }
        if let Some(v) = patch.last_po {
            item.last_po = Some(v);
        }
        if let Some(v) = &patch.supplier {
            item.supplier = v.clone();
        }
        Ok(())
    }

    fn delete_item_by_name(&self, name: &str) -> StoreResult<()> {
        let mut inner = self.write()?;
        let before = inner.items.len();
        inner.items.retain(|i| !i.name.eq_ignore_ascii_case(name));
        if inner.items.len() == before {
            return Err(StoreError::Missing);
        }
        Ok(())
    }

    fn delete_item_by_id(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.write()?;
        let before = inner.items.len();
        inner.items.retain(|i| i.id != id);
        if inner.items.len() == before {
            return Err(StoreError::Missing);
        }
        Ok(())
    }

    fn increment_out(&self, name: &str, qty: i64) -> StoreResult<()> {
        let mut inner = self.write()?;
        let item = inner
            .items
            .iter_mut()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .ok_or(StoreError::Missing)?;
        item.stock_out += qty;
        item.balance -= qty;
        Ok(())
    }

    fn write_derived(
        &self,
        name: &str,
        status: StockStatus,
        deficit: i64,
        cost: Decimal,
    ) -> StoreResult<()> {
        let mut inner = self.write()?;
        let item = inner
            .items
            .iter_mut()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .ok_or(StoreError::Missing)?;
        item.status = status;
        item.deficit = deficit;
        item.cost = Some(cost);
        Ok(())
    }

    // ── Logs ─────────────────────────────────────────────────────────────

    fn insert_emp_log(&self, entry: &LogEntry) -> StoreResult<()> {
        if self.take_log_failure() {
            return Err(StoreError::backend("log sink unavailable"));
        }
        self.write()?.emp_logs.push(entry.clone());
        Ok(())
    }

    fn insert_adm_log(&self, entry: &LogEntry) -> StoreResult<()> {
        if self.take_log_failure() {
            return Err(StoreError::backend("log sink unavailable"));
        }
        self.write()?.adm_logs.push(entry.clone());
        Ok(())
    }

    fn fetch_emp_logs(&self) -> StoreResult<Vec<LogEntry>> {
        Ok(sorted_desc(&self.read()?.emp_logs))
    }

    fn fetch_adm_logs(&self) -> StoreResult<Vec<LogEntry>> {
        Ok(sorted_desc(&self.read()?.adm_logs))
    }

    fn clear_emp_logs(&self) -> StoreResult<()> {
        self.write()?.emp_logs.clear();
        Ok(())
    }

    fn clear_adm_logs(&self) -> StoreResult<()> {
        self.write()?.adm_logs.clear();
        Ok(())
    }

    // ── Employees ────────────────────────────────────────────────────────

    fn fetch_employees(&self) -> StoreResult<Vec<Employee>> {
        Ok(sorted_by_name(self.read()?.employees.clone(), |e| {
            e.username.clone()
        }))
    }

    fn fetch_employee(&self, username: &str) -> StoreResult<Option<Employee>> {
        Ok(self
            .read()?
            .employees
            .iter()
            .find(|e| e.username == username)
            .cloned())
    }

    fn fetch_employee_ci(&self, username_lower: &str) -> StoreResult<Option<Employee>> {
        Ok(self
            .read()?
            .employees
            .iter()
            .find(|e| e.username.eq_ignore_ascii_case(username_lower))
            .cloned())
    }

    fn employee_2fa_and_access(
        &self,
        username_lower: &str,
    ) -> StoreResult<Option<(Option<String>, AccessLevel)>> {
        Ok(self
            .fetch_employee_ci(username_lower)?
            .map(|e| (e.totp_secret, e.access_level)))
    }

    fn insert_employee(&self, employee: &Employee) -> StoreResult<i64> {
        let mut inner = self.write()?;
        if inner
            .employees
            .iter()
            .any(|e| e.username.eq_ignore_ascii_case(&employee.username))
        {
            return Err(StoreError::backend(
                "UNIQUE constraint failed: emp_list.Username",
            ));
        }
        inner.next_employee_id += 1;
        let id = inner.next_employee_id;
        let mut stored = employee.clone();
        stored.id = id;
        inner.employees.push(stored);
        Ok(id)
    }

    fn update_employee(&self, username: &str, patch: &EmployeePatch) -> StoreResult<()> {
        let mut inner = self.write()?;
        let employee = inner
            .employees
            .iter_mut()
            .find(|e| e.username.eq_ignore_ascii_case(username))
            .ok_or(StoreError::Missing)?;
        patch.apply_to(employee);
        Ok(())
    }

    fn delete_employee(&self, username: &str) -> StoreResult<()> {
        let mut inner = self.write()?;
        let before = inner.employees.len();
        inner
            .employees
            .retain(|e| !e.username.eq_ignore_ascii_case(username));
        if inner.employees.len() == before {
            return Err(StoreError::Missing);
        }
        Ok(())
    }

    // ── Drafts ───────────────────────────────────────────────────────────

    fn insert_draft(&self, draft: &NewDraft) -> StoreResult<i64> {
        let mut inner = self.write()?;
        inner.next_draft_id += 1;
        let id = inner.next_draft_id;
        inner.drafts.push(draft.clone().into_draft(id));
        Ok(id)
    }

    fn fetch_drafts(&self) -> StoreResult<Vec<Draft>> {
        Ok(self.read()?.drafts.clone())
    }

    fn delete_draft(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.write()?;
        let before = inner.drafts.len();
        inner.drafts.retain(|d| d.id != id);
        if inner.drafts.len() == before {
            return Err(StoreError::Missing);
        }
        Ok(())
    }
}
