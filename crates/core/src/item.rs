//! Inventory item model and stock status derivation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::OpsError;
use crate::format::{format_currency, format_last_po, parse_last_po};

// ─────────────────────────────────────────────────────────────────────────────
// Stock Status
// ─────────────────────────────────────────────────────────────────────────────

/// Stock health of an item, derived from BALANCE vs MIN STOCK.
///
/// Persisted (and shipped over the wire) as the display strings; this enum is
/// the only source of those strings.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StockStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Low in Stock")]
    LowInStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In Stock",
            StockStatus::LowInStock => "Low in Stock",
            StockStatus::OutOfStock => "Out of Stock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "In Stock" => Some(StockStatus::InStock),
            "Low in Stock" => Some(StockStatus::LowInStock),
            "Out of Stock" => Some(StockStatus::OutOfStock),
            _ => None,
        }
    }
}

impl core::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derive stock status from the current balance and minimum stock threshold.
///
/// Returns `None` when either input is unknown; the stored status is then
/// left unchanged.
pub fn derive_status(balance: Option<i64>, min_stock: Option<i64>) -> Option<StockStatus> {
    let balance = balance?;
    let min_stock = min_stock?;
    Some(if balance <= 0 {
        StockStatus::OutOfStock
    } else if balance <= min_stock {
        StockStatus::LowInStock
    } else {
        StockStatus::InStock
    })
}

/// Positive shortage below the minimum stock threshold.
pub fn deficit(balance: i64, min_stock: i64) -> i64 {
    (min_stock - balance).max(0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Item
// ─────────────────────────────────────────────────────────────────────────────

/// A full inventory row (`ITEMSDB`).
///
/// Serde names match the storage columns, which the remote API mirrors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "BRAND")]
    pub brand: String,
    #[serde(rename = "TYPE")]
    pub item_type: String,
    #[serde(rename = "LOCATION")]
    pub location: String,
    #[serde(rename = "UNIT OF MEASURE")]
    pub unit_of_measure: String,
    #[serde(rename = "STATUS")]
    pub status: StockStatus,
    #[serde(rename = "IN")]
    pub stock_in: i64,
    #[serde(rename = "OUT")]
    pub stock_out: i64,
    #[serde(rename = "BALANCE")]
    pub balance: i64,
    #[serde(rename = "MIN STOCK")]
    pub min_stock: i64,
    #[serde(rename = "DEFICIT")]
    pub deficit: i64,
    #[serde(rename = "PRICE PER UNIT")]
    pub price_per_unit: Decimal,
    #[serde(rename = "COST")]
    pub cost: Option<Decimal>,
    #[serde(rename = "LAST PO")]
    pub last_po: Option<NaiveDate>,
    #[serde(rename = "SUPPLIER")]
    pub supplier: String,
}

impl Item {
    /// Recompute the derived columns in place. Balance and min stock are
    /// always known on a full row, so this cannot leave status unchanged.
    pub fn recompute_derived(&mut self) {
        if let Some(status) = derive_status(Some(self.balance), Some(self.min_stock)) {
            self.status = status;
        }
        self.deficit = deficit(self.balance, self.min_stock);
        self.cost = Some(self.price_per_unit * Decimal::from(self.balance));
    }

    /// PRICE PER UNIT for display, two decimals with thousands separators.
    pub fn price_display(&self) -> String {
        format_currency(self.price_per_unit)
    }

    /// COST for display; a missing cost shows as zero.
    pub fn cost_display(&self) -> String {
        format_currency(self.cost.unwrap_or_default())
    }

    /// LAST PO for display (YYYY/MM/DD).
    pub fn last_po_display(&self) -> Option<String> {
        self.last_po.map(format_last_po)
    }
}

/// Trimmed row for the employee dashboard list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardRow {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "SUPPLIER")]
    pub supplier: String,
    #[serde(rename = "LAST PO")]
    pub last_po: Option<NaiveDate>,
}

/// Row for the by-type listing (active views exclude Out of Stock).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSummary {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "BRAND")]
    pub brand: String,
    #[serde(rename = "TYPE")]
    pub item_type: String,
    #[serde(rename = "LOCATION")]
    pub location: String,
    #[serde(rename = "UNIT OF MEASURE")]
    pub unit_of_measure: String,
    #[serde(rename = "STATUS")]
    pub status: StockStatus,
    #[serde(rename = "BALANCE")]
    pub balance: i64,
}

impl DashboardRow {
    /// LAST PO for display (YYYY/MM/DD).
    pub fn last_po_display(&self) -> Option<String> {
        self.last_po.map(format_last_po)
    }
}

impl From<&Item> for DashboardRow {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            supplier: item.supplier.clone(),
            last_po: item.last_po,
        }
    }
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            brand: item.brand.clone(),
            item_type: item.item_type.clone(),
            location: item.location.clone(),
            unit_of_measure: item.unit_of_measure.clone(),
            status: item.status,
            balance: item.balance,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Creation / Patch payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Payload for creating an item. Derived columns are computed at save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub brand: String,
    pub item_type: String,
    pub location: String,
    pub unit_of_measure: String,
    pub stock_in: i64,
    pub stock_out: i64,
    pub min_stock: i64,
    pub price_per_unit: Decimal,
    pub last_po: Option<NaiveDate>,
    pub supplier: String,
}

impl NewItem {
    pub fn validate(&self) -> Result<(), OpsError> {
        for (field, value) in [
            ("NAME", &self.name),
            ("BRAND", &self.brand),
            ("TYPE", &self.item_type),
            ("LOCATION", &self.location),
            ("UNIT OF MEASURE", &self.unit_of_measure),
            ("SUPPLIER", &self.supplier),
        ] {
            if value.trim().is_empty() {
                return Err(OpsError::input(format!("{field} is required")));
            }
        }
        if self.stock_in < 0 || self.stock_out < 0 || self.min_stock < 0 {
            return Err(OpsError::input("IN, OUT and MIN STOCK must be non-negative"));
        }
        if self.stock_out > self.stock_in {
            return Err(OpsError::input("OUT cannot exceed IN"));
        }
        if self.price_per_unit.is_sign_negative() {
            return Err(OpsError::input("PRICE PER UNIT must be non-negative"));
        }
        Ok(())
    }

    pub fn balance(&self) -> i64 {
        self.stock_in - self.stock_out
    }

    /// Set LAST PO from operator input (`YYYY-MM-DD`, `MM/DD/YYYY`,
    /// `YYYY/MM/DD`, or a raw datetime).
    pub fn set_last_po_input(&mut self, input: &str) -> Result<(), OpsError> {
        self.last_po = Some(
            parse_last_po(input)
                .ok_or_else(|| OpsError::input(format!("unrecognized LAST PO date '{input}'")))?,
        );
        Ok(())
    }

    /// Materialize a full row with derived columns computed.
    pub fn into_item(self, id: i64) -> Item {
        let mut item = Item {
            id,
            name: self.name,
            brand: self.brand,
            item_type: self.item_type,
            location: self.location,
            unit_of_measure: self.unit_of_measure,
            status: StockStatus::InStock,
            stock_in: self.stock_in,
            stock_out: self.stock_out,
            balance: self.stock_in - self.stock_out,
            min_stock: self.min_stock,
            deficit: 0,
            price_per_unit: self.price_per_unit,
            cost: None,
            last_po: self.last_po,
            supplier: self.supplier,
        };
        item.recompute_derived();
        item
    }
}

/// Partial update of an item; only `Some` columns are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub item_type: Option<String>,
    pub location: Option<String>,
    pub unit_of_measure: Option<String>,
    pub stock_in: Option<i64>,
    pub stock_out: Option<i64>,
    pub min_stock: Option<i64>,
    pub price_per_unit: Option<Decimal>,
    pub last_po: Option<NaiveDate>,
    pub supplier: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.changed_columns().is_empty()
    }

    /// Column names carried by this patch, for the admin log change list.
    pub fn changed_columns(&self) -> Vec<&'static str> {
        let mut cols = Vec::new();
        if self.name.is_some() {
            cols.push("NAME");
        }
        if self.brand.is_some() {
            cols.push("BRAND");
        }
        if self.item_type.is_some() {
            cols.push("TYPE");
        }
        if self.location.is_some() {
            cols.push("LOCATION");
        }
        if self.unit_of_measure.is_some() {
            cols.push("UNIT OF MEASURE");
        }
        if self.stock_in.is_some() {
            cols.push("IN");
        }
        if self.stock_out.is_some() {
            cols.push("OUT");
        }
        if self.min_stock.is_some() {
            cols.push("MIN STOCK");
        }
        if self.price_per_unit.is_some() {
            cols.push("PRICE PER UNIT");
        }
        if self.last_po.is_some() {
            cols.push("LAST PO");
        }
        if self.supplier.is_some() {
            cols.push("SUPPLIER");
        }
        cols
    }

    pub fn validate(&self) -> Result<(), OpsError> {
        for (field, value) in [
            ("NAME", &self.name),
            ("BRAND", &self.brand),
            ("TYPE", &self.item_type),
            ("LOCATION", &self.location),
            ("UNIT OF MEASURE", &self.unit_of_measure),
            ("SUPPLIER", &self.supplier),
        ] {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(OpsError::input(format!("{field} cannot be blank")));
                }
            }
        }
        for (field, value) in [
            ("IN", self.stock_in),
            ("OUT", self.stock_out),
            ("MIN STOCK", self.min_stock),
        ] {
            if let Some(v) = value {
                if v < 0 {
                    return Err(OpsError::input(format!("{field} must be non-negative")));
                }
            }
        }
        if let Some(p) = self.price_per_unit {
            if p.is_sign_negative() {
                return Err(OpsError::input("PRICE PER UNIT must be non-negative"));
            }
        }
        Ok(())
    }

    /// Set LAST PO from operator input, as [`NewItem::set_last_po_input`].
    pub fn set_last_po_input(&mut self, input: &str) -> Result<(), OpsError> {
        self.last_po = Some(
            parse_last_po(input)
                .ok_or_else(|| OpsError::input(format!("unrecognized LAST PO date '{input}'")))?,
        );
        Ok(())
    }

    /// Apply the patch to a row, then recompute the derived columns.
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(v) = &self.name {
            item.name = v.clone();
        }
        if let Some(v) = &self.brand {
            item.brand = v.clone();
        }
        if let Some(v) = &self.item_type {
            item.item_type = v.clone();
        }
        if let Some(v) = &self.location {
            item.location = v.clone();
        }
        if let Some(v) = &self.unit_of_measure {
            item.unit_of_measure = v.clone();
        }
        if let Some(v) = self.stock_in {
            item.stock_in = v;
        }
        if let Some(v) = self.stock_out {
            item.stock_out = v;
        }
        if self.stock_in.is_some() || self.stock_out.is_some() {
            item.balance = item.stock_in - item.stock_out;
        }
        if let Some(v) = self.min_stock {
            item.min_stock = v;
        }
        if let Some(v) = self.price_per_unit {
            item.price_per_unit = v;
        }
        if let Some(v) = self.last_po {
            item.last_po = Some(v);
        }
        if let Some(v) = &self.supplier {
            item.supplier = v.clone();
        }
        item.recompute_derived();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
