//! Dashboard aggregates and the restock view.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::format::format_currency;
use crate::item::{Item, StockStatus};

/// Counters behind the restock badge: rows needing action, split by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockTotals {
    pub out_of_stock: usize,
    pub low_stock: usize,
    pub total: usize,
}

/// The five aggregates the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub total_items: usize,
    pub out_of_stock: usize,
    pub low_stock: usize,
    /// Sum of COST across rows; a missing cost counts as zero.
    pub total_cost: Decimal,
    pub restock: RestockTotals,
}

impl InventoryStats {
    pub fn compute(items: &[Item]) -> Self {
        let out_of_stock = items
            .iter()
            .filter(|i| i.status == StockStatus::OutOfStock)
            .count();
        let low_stock = items
            .iter()
            .filter(|i| i.status == StockStatus::LowInStock)
            .count();
        let total_cost = items
            .iter()
            .filter_map(|i| i.cost)
            .fold(Decimal::ZERO, |acc, c| acc + c);

        Self {
            total_items: items.len(),
            out_of_stock,
            low_stock,
            total_cost,
            restock: RestockTotals {
                out_of_stock,
                low_stock,
                total: out_of_stock + low_stock,
            },
        }
    }

    /// Total cost for display, two decimals with thousands separators.
    pub fn total_cost_display(&self) -> String {
        format_currency(self.total_cost)
    }
}

/// Rows needing action: Out of Stock first, then Low in Stock, ties broken
/// by name ascending (case-insensitive).
pub fn restock_view(items: &[Item]) -> Vec<&Item> {
    let mut rows: Vec<&Item> = items
        .iter()
        .filter(|i| matches!(i.status, StockStatus::OutOfStock | StockStatus::LowInStock))
        .collect();
    rows.sort_by(|a, b| {
        restock_rank(a.status)
            .cmp(&restock_rank(b.status))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    rows
}

fn restock_rank(status: StockStatus) -> u8 {
    match status {
        StockStatus::OutOfStock => 0,
        StockStatus::LowInStock => 1,
        StockStatus::InStock => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::NewItem;
    use proptest::prelude::*;

    fn item(name: &str, stock_in: i64, min_stock: i64, price: Decimal) -> Item {
        NewItem {
            name: name.to_string(),
            brand: "B".to_string(),
            item_type: "T".to_string(),
            location: "L".to_string(),
            unit_of_measure: "pcs".to_string(),
            stock_in,
            stock_out: 0,
            min_stock,
            price_per_unit: price,
            last_po: None,
            supplier: "S".to_string(),
        }
        .into_item(1)
    }

    #[test]
    fn stats_count_by_status_and_sum_cost() {
        let items = vec![
            item("a", 10, 5, Decimal::ONE),  // In Stock, cost 10
            item("b", 3, 5, Decimal::TWO),   // Low, cost 6
            item("c", 0, 5, Decimal::TEN),   // Out, cost 0
        ];
        let stats = InventoryStats::compute(&items);
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.out_of_stock, 1);
        assert_eq!(stats.low_stock, 1);
        assert_eq!(stats.total_cost, Decimal::from(16));
        assert_eq!(stats.total_cost_display(), "16.00");
        assert_eq!(stats.restock.total, 2);
    }

    #[test]
    fn missing_cost_counts_as_zero() {
        let mut broken = item("a", 10, 5, Decimal::ONE);
        broken.cost = None;
        let stats = InventoryStats::compute(&[broken]);
        assert_eq!(stats.total_cost, Decimal::ZERO);
    }

    #[test]
    fn restock_view_orders_out_before_low_then_by_name() {
        let items = vec![
            item("zinc plate", 3, 5, Decimal::ONE), // Low
            item("Anchor", 0, 5, Decimal::ONE),     // Out
            item("bracket", 10, 5, Decimal::ONE),   // In Stock, excluded
            item("bolt", 0, 5, Decimal::ONE),       // Out
            item("Washer", 2, 5, Decimal::ONE),     // Low
        ];
        let view = restock_view(&items);
        let names: Vec<&str> = view.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Anchor", "bolt", "Washer", "zinc plate"]);
    }

    proptest! {
        #[test]
        fn restock_view_never_contains_in_stock_rows(
            stocks in proptest::collection::vec((0i64..20, 1i64..10), 0..30)
        ) {
            let items: Vec<Item> = stocks
                .iter()
                .enumerate()
                .map(|(i, (stock_in, min))| item(&format!("item-{i}"), *stock_in, *min, Decimal::ONE))
                .collect();
            let view = restock_view(&items);
            prop_assert!(view.iter().all(|i| i.status != StockStatus::InStock));

            // Out of Stock rows always precede Low in Stock rows.
            let first_low = view.iter().position(|i| i.status == StockStatus::LowInStock);
            if let Some(pos) = first_low {
                prop_assert!(
                    view[pos..].iter().all(|i| i.status == StockStatus::LowInStock)
                );
            }
        }
    }
}
