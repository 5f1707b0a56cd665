//! Item operations: listings, stock movements, admin edits, and the
//! dashboard aggregates.

use jjcims_core::{
    DashboardRow, InventoryStats, Item, ItemPatch, ItemSummary, NewItem, OpsError, OpsResult,
    restock_view,
};
use jjcims_store::Store;

use crate::outcome::{OpResult, Outcome};
use crate::{Ops, store_err};

impl Ops {
    // ── Listings ─────────────────────────────────────────────────────────

    pub fn list_items(&self) -> OpsResult<Vec<Item>> {
        self.store
            .fetch_items()
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    pub fn list_items_for_dashboard(&self) -> OpsResult<Vec<DashboardRow>> {
        self.store
            .fetch_dashboard()
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    /// Active rows of one category; Out of Stock rows are excluded.
    pub fn list_items_by_type(&self, category: &str) -> OpsResult<Vec<ItemSummary>> {
        self.store
            .fetch_items_by_type(category)
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    pub fn get_unit_of_measure(&self, name: &str) -> OpsResult<Option<String>> {
        self.store
            .unit_of_measure(name)
            .map_err(|e| OpsError::backend(e.to_string()))
    }

    pub fn stats(&self) -> OpsResult<InventoryStats> {
        Ok(InventoryStats::compute(&self.list_items()?))
    }

    /// Rows needing action, Out of Stock first, ties by name.
    pub fn restock_list(&self) -> OpsResult<Vec<Item>> {
        let items = self.list_items()?;
        Ok(restock_view(&items).into_iter().cloned().collect())
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Create an item with derived columns computed, appending an admin log
    /// entry. A draft id may be passed to consume the originating draft.
    pub fn add_item(
        &self,
        new: NewItem,
        actor: &str,
        draft_id: Option<i64>,
    ) -> OpResult<Item> {
        new.validate()?;
        if self
            .store
            .fetch_item_by_name(&new.name)
            .map_err(|e| OpsError::backend(e.to_string()))?
            .is_some()
        {
            return Err(OpsError::uniqueness(format!(
                "an item named '{}' already exists",
                new.name
            )));
        }

        let mut item = new.into_item(0);
        let id = self
            .store
            .insert_item(&item)
            .map_err(|e| OpsError::backend(e.to_string()))?;
        item.id = id;

        let mut warnings = Vec::new();
        self.audit_admin(
            actor,
            format!(
                "Added {}x of {} from {}",
                item.stock_in, item.name, item.supplier
            ),
            &mut warnings,
        );

        if let Some(draft_id) = draft_id {
            if let Err(err) = self.store.delete_draft(draft_id) {
                tracing::warn!(draft_id, error = %err, "draft cleanup after add failed");
            }
        }

        Ok(Outcome::with_warnings(item, warnings))
    }

    /// Partial update by id; recomputes derived columns and appends an admin
    /// log entry with the concise change list.
    pub fn update_item_by_id(&self, id: i64, patch: ItemPatch, actor: &str) -> OpResult<Item> {
        if patch.is_empty() {
            return Err(OpsError::input("no fields provided"));
        }
        patch.validate()?;

        let current = self
            .store
            .fetch_item_by_id(id)
            .map_err(|e| OpsError::backend(e.to_string()))?
            .ok_or_else(|| OpsError::not_found(format!("item id {id}")))?;

        if let Some(new_name) = &patch.name {
            let collision = self
                .store
                .fetch_item_by_name(new_name)
                .map_err(|e| OpsError::backend(e.to_string()))?;
            if collision.is_some_and(|other| other.id != id) {
                return Err(OpsError::uniqueness(format!(
                    "an item named '{new_name}' already exists"
                )));
            }
        }

        self.store
            .update_item(id, &patch)
            .map_err(|e| store_err(e, &format!("item id {id}")))?;

        // Recompute the derived columns against the patched row.
        let mut updated = current;
        patch.apply_to(&mut updated);

        let mut warnings = Vec::new();
        if let Err(err) = self.store.write_derived(
            &updated.name,
            updated.status,
            updated.deficit,
            updated.cost.unwrap_or_default(),
        ) {
            tracing::warn!(item = %updated.name, error = %err, "derived column write failed");
            warnings.push(jjcims_core::Warning::Derivation(err.to_string()));
        }

        self.audit_admin(
            actor,
            format!(
                "Updated {} ({})",
                updated.name,
                patch.changed_columns().join(", ")
            ),
            &mut warnings,
        );

        Ok(Outcome::with_warnings(updated, warnings))
    }

    pub fn delete_item_by_name(&self, name: &str, actor: &str) -> OpResult<()> {
        self.store
            .delete_item_by_name(name)
            .map_err(|e| store_err(e, &format!("item '{name}'")))?;

        let mut warnings = Vec::new();
        self.audit_admin(actor, format!("Deleted {name}"), &mut warnings);
        Ok(Outcome::with_warnings((), warnings))
    }

    /// Record a checkout: OUT grows by `qty`, BALANCE shrinks by `qty`,
    /// status is recomputed, and the employee log gets the checkout entry.
    /// Rejects quantities that would push BALANCE negative.
    pub fn increment_out(&self, name: &str, qty: i64, actor: &str) -> OpResult<Item> {
        if qty <= 0 {
            return Err(OpsError::input("quantity must be positive"));
        }

        let item = self
            .store
            .fetch_item_by_name(name)
            .map_err(|e| OpsError::backend(e.to_string()))?
            .ok_or_else(|| OpsError::not_found(format!("item '{name}'")))?;

        if qty > item.balance {
            return Err(OpsError::input(format!(
                "only {} {} of {} available",
                item.balance, item.unit_of_measure, item.name
            )));
        }

        self.store
            .increment_out(name, qty)
            .map_err(|e| store_err(e, &format!("item '{name}'")))?;

        let mut updated = item;
        updated.stock_out += qty;
        updated.balance -= qty;
        updated.recompute_derived();

        let mut warnings = Vec::new();
        if let Err(err) = self.store.write_derived(
            &updated.name,
            updated.status,
            updated.deficit,
            updated.cost.unwrap_or_default(),
        ) {
            tracing::warn!(item = %updated.name, error = %err, "derived column write failed");
            warnings.push(jjcims_core::Warning::Derivation(err.to_string()));
        }

        self.audit_employee(
            actor,
            format!(
                "Took {} {} of {} {} ({}) from {}",
                qty,
                updated.unit_of_measure,
                updated.brand,
                updated.name,
                updated.item_type,
                updated.location
            ),
            &mut warnings,
        );

        Ok(Outcome::with_warnings(updated, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{hex_bolt, ops};
    use jjcims_core::{StockStatus, Warning};
    use jjcims_store::Store;
    use rust_decimal::Decimal;

    #[test]
    fn add_item_appears_on_dashboard_with_derived_columns() {
        let (_store, ops) = ops();
        let outcome = ops.add_item(hex_bolt(), "boss", None).unwrap();
        assert!(!outcome.has_warnings());
        assert_eq!(outcome.value.status, StockStatus::InStock);
        assert_eq!(outcome.value.balance, 10);

        let dashboard = ops.list_items_for_dashboard().unwrap();
        assert!(dashboard.iter().any(|r| r.name == "Hex Bolt M8"));

        let adm = ops.fetch_admin_logs().unwrap();
        assert_eq!(adm[0].details, "Added 10x of Hex Bolt M8 from Acme");
        assert_eq!(adm[0].actor, "boss");
    }

    #[test]
    fn duplicate_add_is_a_uniqueness_error() {
        let (_store, ops) = ops();
        ops.add_item(hex_bolt(), "boss", None).unwrap();
        let mut again = hex_bolt();
        again.name = "HEX BOLT M8".to_string();
        assert!(matches!(
            ops.add_item(again, "boss", None),
            Err(OpsError::Uniqueness(_))
        ));
    }

    #[test]
    fn add_item_rejects_missing_fields() {
        let (_store, ops) = ops();
        let mut new = hex_bolt();
        new.supplier = String::new();
        assert!(matches!(
            ops.add_item(new, "boss", None),
            Err(OpsError::Input(_))
        ));
    }

    #[test]
    fn checkout_updates_stock_status_and_employee_log() {
        let (_store, ops) = ops();
        ops.add_item(hex_bolt(), "boss", None).unwrap();

        let outcome = ops.increment_out("Hex Bolt M8", 5, "jdoe").unwrap();
        assert_eq!(outcome.value.stock_out, 5);
        assert_eq!(outcome.value.balance, 5);
        assert_eq!(outcome.value.status, StockStatus::LowInStock);

        let logs = ops.fetch_emp_logs().unwrap();
        assert_eq!(
            logs[0].details,
            "Took 5 pcs of X Hex Bolt M8 (Fastener) from A1"
        );
    }

    #[test]
    fn checkout_twice_accumulates_and_rederives() {
        let (_store, ops) = ops();
        ops.add_item(hex_bolt(), "boss", None).unwrap();
        ops.increment_out("Hex Bolt M8", 4, "jdoe").unwrap();
        let outcome = ops.increment_out("hex bolt m8", 6, "jdoe").unwrap();
        assert_eq!(outcome.value.stock_out, 10);
        assert_eq!(outcome.value.balance, 0);
        assert_eq!(outcome.value.status, StockStatus::OutOfStock);
    }

    #[test]
    fn checkout_rejects_overdraw_and_non_positive_qty() {
        let (_store, ops) = ops();
        ops.add_item(hex_bolt(), "boss", None).unwrap();
        assert!(matches!(
            ops.increment_out("Hex Bolt M8", 11, "jdoe"),
            Err(OpsError::Input(_))
        ));
        assert!(matches!(
            ops.increment_out("Hex Bolt M8", 0, "jdoe"),
            Err(OpsError::Input(_))
        ));
        // Nothing moved.
        let item = ops.store().fetch_item_by_name("Hex Bolt M8").unwrap().unwrap();
        assert_eq!(item.balance, 10);
    }

    #[test]
    fn raising_min_stock_flags_restock_without_touching_cost() {
        let (_store, ops) = ops();
        ops.add_item(hex_bolt(), "boss", None).unwrap();
        let before = ops.stats().unwrap();

        let patch = ItemPatch {
            min_stock: Some(12),
            ..Default::default()
        };
        let id = ops.store().fetch_item_by_name("Hex Bolt M8").unwrap().unwrap().id;
        let outcome = ops.update_item_by_id(id, patch, "boss").unwrap();
        assert_eq!(outcome.value.status, StockStatus::LowInStock);

        let restock = ops.restock_list().unwrap();
        assert_eq!(restock[0].name, "Hex Bolt M8");

        let after = ops.stats().unwrap();
        assert_eq!(before.total_cost, after.total_cost);

        let adm = ops.fetch_admin_logs().unwrap();
        assert_eq!(adm[0].details, "Updated Hex Bolt M8 (MIN STOCK)");
    }

    #[test]
    fn update_rejects_empty_patch_and_unknown_id() {
        let (_store, ops) = ops();
        assert!(matches!(
            ops.update_item_by_id(1, ItemPatch::default(), "boss"),
            Err(OpsError::Input(_))
        ));
        let patch = ItemPatch {
            min_stock: Some(1),
            ..Default::default()
        };
        assert!(matches!(
            ops.update_item_by_id(99, patch, "boss"),
            Err(OpsError::NotFound(_))
        ));
    }

    #[test]
    fn rename_collision_is_rejected() {
        let (_store, ops) = ops();
        ops.add_item(hex_bolt(), "boss", None).unwrap();
        let mut other = hex_bolt();
        other.name = "Washer M8".to_string();
        let id = ops.add_item(other, "boss", None).unwrap().value.id;

        let patch = ItemPatch {
            name: Some("hex bolt m8".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ops.update_item_by_id(id, patch, "boss"),
            Err(OpsError::Uniqueness(_))
        ));
    }

    #[test]
    fn delete_logs_and_reports_missing_rows() {
        let (_store, ops) = ops();
        ops.add_item(hex_bolt(), "boss", None).unwrap();
        ops.delete_item_by_name("Hex Bolt M8", "boss").unwrap();
        assert!(ops.list_items().unwrap().is_empty());
        assert!(matches!(
            ops.delete_item_by_name("Hex Bolt M8", "boss"),
            Err(OpsError::NotFound(_))
        ));
        let adm = ops.fetch_admin_logs().unwrap();
        assert_eq!(adm[0].details, "Deleted Hex Bolt M8");
    }

    #[test]
    fn audit_failure_degrades_to_warning() {
        let (store, ops) = ops();
        store.fail_next_log_append();
        let outcome = ops.add_item(hex_bolt(), "boss", None).unwrap();
        assert!(matches!(outcome.warnings.as_slice(), [Warning::Audit(_)]));

        // The sink recovered; the next mutation audits normally.
        let outcome = ops.increment_out("Hex Bolt M8", 1, "jdoe").unwrap();
        assert!(!outcome.has_warnings());
        assert_eq!(ops.fetch_emp_logs().unwrap().len(), 1);
    }

    #[test]
    fn balance_equal_to_min_stock_reads_low() {
        let (_store, ops) = ops();
        let mut new = hex_bolt();
        new.stock_in = 5;
        let outcome = ops.add_item(new, "boss", None).unwrap();
        assert_eq!(outcome.value.status, StockStatus::LowInStock);
        assert_eq!(outcome.value.cost, Some(Decimal::new(1250, 2)));
    }

    #[test]
    fn by_type_listing_hides_out_of_stock() {
        let (_store, ops) = ops();
        ops.add_item(hex_bolt(), "boss", None).unwrap();
        let mut empty = hex_bolt();
        empty.name = "Anchor".to_string();
        empty.stock_in = 0;
        ops.add_item(empty, "boss", None).unwrap();

        let rows = ops.list_items_by_type("Fastener").unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Hex Bolt M8"]);
    }
}
