//! Admin add-item drafts (`ANI_DRAFTS`).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A saved add-item draft: the item fields captured mid-entry plus the save
/// date. Append-only; removed on successful item save or explicit delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: i64,
    pub date: NaiveDate,
    pub name: String,
    pub brand: String,
    pub item_type: String,
    pub location: String,
    pub unit_of_measure: String,
    pub stock_in: i64,
    pub min_stock: i64,
    pub price_per_unit: Decimal,
    pub supplier: String,
}

/// Draft payload without the assigned row id. Fields may be blank: a draft
/// captures whatever was entered so far and is not validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDraft {
    pub date: NaiveDate,
    pub name: String,
    pub brand: String,
    pub item_type: String,
    pub location: String,
    pub unit_of_measure: String,
    pub stock_in: i64,
    pub min_stock: i64,
    pub price_per_unit: Decimal,
    pub supplier: String,
}

impl NewDraft {
    pub fn into_draft(self, id: i64) -> Draft {
        Draft {
            id,
            date: self.date,
            name: self.name,
            brand: self.brand,
            item_type: self.item_type,
            location: self.location,
            unit_of_measure: self.unit_of_measure,
            stock_in: self.stock_in,
            min_stock: self.min_stock,
            price_per_unit: self.price_per_unit,
            supplier: self.supplier,
        }
    }
}
