//! # Inventory Snapshot
//!
//! Dashboard figures derived from a list of stock items. The snapshot is
//! rebuilt from the list every time; nothing is patched incrementally.
//!
//! ```text
//! Vec<StockItem> ──► InventorySnapshot::from_items()
//!                         ├── items
//!                         ├── low_stock_items   (current <= threshold)
//!                         └── total_stock_value (Σ current × unit price)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::StockItem;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub items: Vec<StockItem>,
    pub low_stock_items: Vec<StockItem>,
    pub total_stock_value_cents: i64,
}

impl InventorySnapshot {
    pub fn from_items(items: Vec<StockItem>) -> Self {
        let low_stock_items = items
            .iter()
            .filter(|item| item.is_low_stock())
            .cloned()
            .collect();
        let total = items
            .iter()
            .map(StockItem::stock_value)
            .fold(Money::zero(), |acc, value| acc.saturating_add(value));

        Self {
            items,
            low_stock_items,
            total_stock_value_cents: total.cents(),
        }
    }

    #[inline]
    pub fn total_stock_value(&self) -> Money {
        Money::from_cents(self.total_stock_value_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Department;
    use chrono::Utc;

    fn item(batch: &str, current: i64, threshold: i64, price: i64) -> StockItem {
        let now = Utc::now();
        StockItem {
            id: batch.to_lowercase(),
            batch_number: batch.to_string(),
            product_name: "Reagent".to_string(),
            product_type: "reagent".to_string(),
            specification: None,
            department: Department::Laboratory,
            current_quantity: current,
            original_quantity: 20,
            unit_price_cents: price,
            low_stock_threshold: threshold,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_snapshot() {
        let snap = InventorySnapshot::from_items(vec![]);
        assert!(snap.low_stock_items.is_empty());
        assert!(snap.total_stock_value().is_zero());
    }

    #[test]
    fn test_derived_figures() {
        let snap = InventorySnapshot::from_items(vec![
            item("LB-1", 10, 2, 150),
            item("LB-2", 2, 2, 1000),
            item("LB-3", 0, 0, 99),
        ]);

        assert_eq!(snap.items.len(), 3);
        let low: Vec<_> = snap.low_stock_items.iter().map(|i| i.batch_number.as_str()).collect();
        assert_eq!(low, ["LB-2", "LB-3"]);
        assert_eq!(snap.total_stock_value_cents, 1500 + 2000);
    }

    #[test]
    fn test_stock_value_clamps_instead_of_overflowing() {
        let snap = InventorySnapshot::from_items(vec![
            item("LB-1", 3, 0, i64::MAX / 2),
            item("LB-2", 1, 0, 100),
        ]);
        assert_eq!(snap.total_stock_value_cents, i64::MAX);
    }

    #[test]
    fn test_rebuild_matches_after_change() {
        let mut items = vec![item("LB-1", 10, 2, 100)];
        let before = InventorySnapshot::from_items(items.clone());
        items[0].current_quantity = 1;
        let after = InventorySnapshot::from_items(items);

        assert_eq!(before.total_stock_value_cents, 1000);
        assert_eq!(after.total_stock_value_cents, 100);
        assert_eq!(after.low_stock_items.len(), 1);
    }
}
