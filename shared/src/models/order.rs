//! Order and line item models

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// `Preparing` and `Served` are the open states and hold the table per the
/// table-exclusivity rule. `Paid` and `Cancelled` are terminal: such orders
/// are archival and never block a table from being reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Preparing,
    Served,
    Paid,
    Cancelled,
}

impl OrderStatus {
    pub fn is_open(self) -> bool {
        matches!(self, OrderStatus::Preparing | OrderStatus::Served)
    }

    pub fn is_terminal(self) -> bool {
        !self.is_open()
    }
}

/// Order entity (one tab against one table)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Free-text table label. Not unique globally, but unique among open
    /// orders.
    pub table_label: String,
    pub status: OrderStatus,
    pub created_at: i64,
    pub updated_at: i64,
    /// Set exactly once, at payment.
    pub paid_at: Option<i64>,
    /// Cached sum of the live line item totals. Maintained by the
    /// repository's recompute step as part of every mutating transaction;
    /// never written directly.
    pub total_amount: f64,
    pub payment_cash: f64,
    pub payment_online: f64,
}

/// Line item entity, exclusively owned by one order at a time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Store-assigned sequence value, unique across all orders.
    pub id: u64,
    pub order_id: String,
    /// Name snapshot taken at add time, not a live catalog reference.
    pub item_name: String,
    pub category_name: String,
    pub quantity: u32,
    /// Unit price at add time; may diverge from the catalog price if edited.
    pub rate: f64,
    /// Always `quantity * rate`.
    pub total: f64,
    /// Label of the table this item came from when it survived a merge.
    /// Never set on items created directly in their current order; a second
    /// merge overwrites it with the immediately preceding table only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_table: Option<String>,
}

/// An order together with its live line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<LineItem>,
}

/// Outcome of a table change: either a plain rename or a merge into the
/// open order already occupying the target table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeTableOutcome {
    pub merged: bool,
    pub resulting_order_id: String,
}

/// Kind of mutation carried by a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderChangeKind {
    Opened,
    Renamed,
    Merged,
    ItemsChanged,
    StatusChanged,
    Paid,
    Closed,
}

/// Change notification published after every committed mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderChange {
    pub order_id: String,
    pub kind: OrderChangeKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_statuses() {
        assert!(OrderStatus::Preparing.is_open());
        assert!(OrderStatus::Served.is_open());
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn original_table_skipped_when_absent() {
        let item = LineItem {
            id: 1,
            order_id: "o1".into(),
            item_name: "Coke".into(),
            category_name: "Drinks".into(),
            quantity: 2,
            rate: 2.5,
            total: 5.0,
            original_table: None,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("original_table"));
    }
}
