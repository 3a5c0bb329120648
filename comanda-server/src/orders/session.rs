//! Table session engine - the core order/table workflow
//!
//! Resolves a table label to its open order (create-if-absent), enforces
//! at-most-one-open-order-per-table, executes merges, and drives the
//! status/payment state machine. Single logical writer: one cooperative
//! caller issuing operations sequentially; atomicity comes from redb write
//! transactions, not from locks or retries.
//!
//! # Operation Flow
//!
//! ```text
//! operation(args)
//!     ├─ 1. Validate arguments
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Load and check the order (open? exists?)
//!     ├─ 4. Mutate items / order record
//!     ├─ 5. recompute_total (same transaction)
//!     ├─ 6. Commit
//!     └─ 7. Broadcast OrderChange
//! ```

use shared::models::{
    ChangeTableOutcome, LineItem, Order, OrderChange, OrderChangeKind, OrderDetail, OrderStatus,
};
use shared::util::now_millis;
use thiserror::Error;
use tokio::sync::broadcast;

use super::repository::OrderRepository;
use super::storage::StorageError;
use crate::utils::validation::MAX_TABLE_LABEL_LEN;

/// Change notification channel capacity
const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// Session engine errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Item not found: order={0}, item={1}")]
    ItemNotFound(String, u64),

    /// The order is Paid or Cancelled; no item mutation may reopen it.
    /// Further business on the table goes through a fresh `open_table`.
    #[error("{0}")]
    OrderClosed(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// The table session engine
///
/// Talks to the store only through [`OrderRepository`]. Constructed once at
/// startup with its repository injected; no ambient globals.
pub struct TableSessionEngine {
    repo: OrderRepository,
    change_tx: broadcast::Sender<OrderChange>,
}

impl TableSessionEngine {
    pub fn new(repo: OrderRepository) -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self { repo, change_tx }
    }

    pub fn repository(&self) -> &OrderRepository {
        &self.repo
    }

    /// Subscribe to change notifications (one message per committed
    /// mutation)
    pub fn subscribe(&self) -> broadcast::Receiver<OrderChange> {
        self.change_tx.subscribe()
    }

    fn notify(&self, order_id: &str, kind: OrderChangeKind) {
        // Delivery is best-effort; a lagging or absent subscriber never
        // affects engine state.
        let _ = self.change_tx.send(OrderChange {
            order_id: order_id.to_string(),
            kind,
        });
    }

    fn validate_table_label(label: &str) -> SessionResult<()> {
        if label.trim().is_empty() {
            return Err(SessionError::InvalidOperation(
                "table label must not be empty".to_string(),
            ));
        }
        if label.len() > MAX_TABLE_LABEL_LEN {
            return Err(SessionError::InvalidOperation(format!(
                "table label is too long ({} chars, max {MAX_TABLE_LABEL_LEN})",
                label.len()
            )));
        }
        Ok(())
    }

    fn ensure_open(order: &Order) -> SessionResult<()> {
        if order.status.is_terminal() {
            return Err(SessionError::OrderClosed(format!(
                "Order {} is closed ({:?}); open the table again for new business",
                order.id, order.status
            )));
        }
        Ok(())
    }

    // ========== Table resolution ==========

    /// Return the existing open order for a table, or create one.
    /// Used on table-tap.
    pub fn open_table(&self, table: &str) -> SessionResult<Order> {
        Self::validate_table_label(table)?;
        let order = self.repo.create_order(table)?;
        self.notify(&order.id, OrderChangeKind::Opened);
        Ok(order)
    }

    /// Move an order to another table.
    ///
    /// If the target table has no open order this is a plain rename. If it
    /// does, the two tabs merge: every source item is reassigned to the
    /// target with `original_table` stamped (unconditionally - provenance
    /// reflects only the immediately preceding table), the target total is
    /// recomputed, and the now-empty source order is hard-deleted. One
    /// transaction either way. Only an open source may move: a Paid or
    /// Cancelled order is settled history and is rejected with
    /// `OrderClosed`.
    ///
    /// Merging is a valid, common operation, not an error path; asking the
    /// operator "table 2 is occupied, merge?" is the caller's job, and the
    /// active-tables listing exists for exactly that. Once called, the
    /// engine merges unconditionally.
    ///
    /// Same-named rows from the two tabs stay separate after a merge; the
    /// `original_table` tag is what distinguishes them. Grouping them would
    /// erase provenance.
    pub fn change_table(
        &self,
        order_id: &str,
        new_table: &str,
    ) -> SessionResult<ChangeTableOutcome> {
        Self::validate_table_label(new_table)?;

        let txn = self.repo.begin_write()?;
        let mut source = self
            .repo
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| SessionError::OrderNotFound(order_id.to_string()))?;
        // A settled order is immutable history; moving or merging it would
        // re-bill its items and destroy the payment record.
        Self::ensure_open(&source)?;

        let target = self
            .repo
            .find_open_order_by_table_txn(&txn, new_table, Some(order_id))?;

        let Some(target) = target else {
            // Simple rename
            source.table_label = new_table.to_string();
            source.updated_at = now_millis();
            self.repo.put_order_txn(&txn, &source)?;
            txn.commit().map_err(StorageError::from)?;

            tracing::info!(order_id = %order_id, table = %new_table, "Order moved to free table");
            self.notify(order_id, OrderChangeKind::Renamed);
            return Ok(ChangeTableOutcome {
                merged: false,
                resulting_order_id: order_id.to_string(),
            });
        };

        // Merge: reassign every source item to the target. Item IDs are
        // globally unique, so re-keying under the target cannot collide.
        let moved = self.repo.remove_items_txn(&txn, &source.id)?;
        let moved_count = moved.len();
        for mut item in moved {
            item.order_id = target.id.clone();
            item.original_table = Some(source.table_label.clone());
            self.repo.put_item_txn(&txn, &item)?;
        }
        self.repo.recompute_total(&txn, &target.id)?;
        // Source owns zero items now; no cascade needed.
        self.repo.delete_order_in(&txn, &source.id)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            source = %source.id,
            target = %target.id,
            table = %new_table,
            items = moved_count,
            "Tables merged"
        );
        self.notify(&target.id, OrderChangeKind::Merged);
        self.notify(&source.id, OrderChangeKind::Closed);
        Ok(ChangeTableOutcome {
            merged: true,
            resulting_order_id: target.id,
        })
    }

    // ========== Status & items ==========

    /// Overwrite the serving status. Deliberately not monotonic: a served
    /// order can go back to Preparing (kitchen correction flow). Terminal
    /// statuses are not reachable here - payment and close have their own
    /// operations.
    pub fn set_status(&self, order_id: &str, next: OrderStatus) -> SessionResult<Order> {
        if !next.is_open() {
            return Err(SessionError::InvalidOperation(format!(
                "status {next:?} cannot be set directly; use payment or close"
            )));
        }

        let txn = self.repo.begin_write()?;
        let mut order = self
            .repo
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| SessionError::OrderNotFound(order_id.to_string()))?;
        Self::ensure_open(&order)?;

        order.status = next;
        order.updated_at = now_millis();
        self.repo.put_order_txn(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        self.notify(order_id, OrderChangeKind::StatusChanged);
        Ok(order)
    }

    /// Add one unit of an item to an order.
    ///
    /// Stacks onto an existing row with the same name and no
    /// `original_table` tag (quantity += 1 at that row's rate); merged-in
    /// rows never auto-stack since they carry distinct provenance.
    /// Otherwise inserts a fresh quantity-1 row at `rate`.
    ///
    /// Availability is the caller's concern and is checked against the
    /// catalog before this is invoked.
    pub fn add_item(
        &self,
        order_id: &str,
        name: &str,
        category_label: &str,
        rate: f64,
    ) -> SessionResult<(Order, LineItem)> {
        if name.trim().is_empty() {
            return Err(SessionError::InvalidOperation(
                "item name must not be empty".to_string(),
            ));
        }

        let txn = self.repo.begin_write()?;
        let order = self
            .repo
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| SessionError::OrderNotFound(order_id.to_string()))?;
        Self::ensure_open(&order)?;

        let existing = self
            .repo
            .items_txn(&txn, order_id)?
            .into_iter()
            .find(|i| i.item_name == name && i.original_table.is_none());

        let item = match existing {
            Some(mut item) => {
                item.quantity += 1;
                item.total = item.quantity as f64 * item.rate;
                self.repo.put_item_txn(&txn, &item)?;
                item
            }
            None => {
                let item = LineItem {
                    id: self.repo.next_item_id(&txn)?,
                    order_id: order_id.to_string(),
                    item_name: name.to_string(),
                    category_name: category_label.to_string(),
                    quantity: 1,
                    rate,
                    total: rate,
                    original_table: None,
                };
                self.repo.put_item_txn(&txn, &item)?;
                item
            }
        };

        let order = self.repo.recompute_total(&txn, order_id)?;
        txn.commit().map_err(StorageError::from)?;

        self.notify(order_id, OrderChangeKind::ItemsChanged);
        Ok((order, item))
    }

    /// Remove a line item, then recompute the order total.
    /// Removing a missing item is an error, not a silent no-op.
    pub fn remove_item(&self, order_id: &str, item_id: u64) -> SessionResult<Order> {
        let txn = self.repo.begin_write()?;
        let order = self
            .repo
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| SessionError::OrderNotFound(order_id.to_string()))?;
        Self::ensure_open(&order)?;

        if !self.repo.remove_item_txn(&txn, order_id, item_id)? {
            return Err(SessionError::ItemNotFound(order_id.to_string(), item_id));
        }
        let order = self.repo.recompute_total(&txn, order_id)?;
        txn.commit().map_err(StorageError::from)?;

        self.notify(order_id, OrderChangeKind::ItemsChanged);
        Ok(order)
    }

    /// Overwrite a line item's quantity and rate, then recompute totals.
    pub fn update_line_item(
        &self,
        order_id: &str,
        item_id: u64,
        quantity: u32,
        rate: f64,
    ) -> SessionResult<(Order, LineItem)> {
        if quantity == 0 {
            return Err(SessionError::InvalidOperation(
                "quantity must be a positive integer".to_string(),
            ));
        }

        let txn = self.repo.begin_write()?;
        let order = self
            .repo
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| SessionError::OrderNotFound(order_id.to_string()))?;
        Self::ensure_open(&order)?;

        let mut item = self
            .repo
            .get_item_txn(&txn, order_id, item_id)?
            .ok_or_else(|| SessionError::ItemNotFound(order_id.to_string(), item_id))?;
        item.quantity = quantity;
        item.rate = rate;
        item.total = quantity as f64 * rate;
        self.repo.put_item_txn(&txn, &item)?;

        let order = self.repo.recompute_total(&txn, order_id)?;
        txn.commit().map_err(StorageError::from)?;

        self.notify(order_id, OrderChangeKind::ItemsChanged);
        Ok((order, item))
    }

    // ========== Payment & close ==========

    /// Settle the order. Sets status Paid, stores the cash/online split,
    /// stamps `paid_at`, and marks the backup flag dirty in the same
    /// commit. Paid is terminal.
    ///
    /// The engine trusts the caller on amounts: the underpayment check
    /// (cash + online >= total - 0.5 rounding tolerance) happens at the API
    /// layer before this is called.
    pub fn process_payment(
        &self,
        order_id: &str,
        cash_amount: f64,
        online_amount: f64,
    ) -> SessionResult<Order> {
        let txn = self.repo.begin_write()?;
        let mut order = self
            .repo
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| SessionError::OrderNotFound(order_id.to_string()))?;
        if order.status == OrderStatus::Paid {
            return Err(SessionError::OrderClosed(format!(
                "Order {order_id} is already paid"
            )));
        }

        let now = now_millis();
        order.status = OrderStatus::Paid;
        order.payment_cash = cash_amount;
        order.payment_online = online_amount;
        order.paid_at = Some(now);
        order.updated_at = now;
        self.repo.put_order_txn(&txn, &order)?;
        // Dirty flag rides the same commit; the backup worker picks it up
        // after, never inside, the transactional unit.
        self.repo.mark_backup_pending(&txn)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            order_id = %order_id,
            table = %order.table_label,
            total = order.total_amount,
            cash = cash_amount,
            online = online_amount,
            "Payment processed"
        );
        self.notify(order_id, OrderChangeKind::Paid);
        Ok(order)
    }

    /// Close an abandoned session. An order with nothing on it is deleted
    /// outright so the empty tab does not keep the table occupied; an order
    /// with a balance is left alone.
    ///
    /// Returns whether the order was deleted.
    pub fn close_table(&self, order_id: &str) -> SessionResult<bool> {
        let order = self
            .repo
            .get_order(order_id)?
            .ok_or_else(|| SessionError::OrderNotFound(order_id.to_string()))?;
        if order.total_amount > 0.0 {
            return Ok(false);
        }

        self.repo.delete_order(order_id)?;
        tracing::debug!(order_id = %order_id, table = %order.table_label, "Empty order closed");
        self.notify(order_id, OrderChangeKind::Closed);
        Ok(true)
    }

    /// Hard-delete an order and its items.
    pub fn delete_order(&self, order_id: &str) -> SessionResult<()> {
        self.repo.delete_order(order_id)?;
        self.notify(order_id, OrderChangeKind::Closed);
        Ok(())
    }

    // ========== Read side ==========

    pub fn get_order(&self, order_id: &str) -> SessionResult<OrderDetail> {
        let order = self
            .repo
            .get_order(order_id)?
            .ok_or_else(|| SessionError::OrderNotFound(order_id.to_string()))?;
        let items = self.repo.items(order_id)?;
        Ok(OrderDetail { order, items })
    }

    pub fn open_orders(&self) -> SessionResult<Vec<OrderDetail>> {
        let mut details = Vec::new();
        for order in self.repo.open_orders()? {
            let items = self.repo.items(&order.id)?;
            details.push(OrderDetail { order, items });
        }
        Ok(details)
    }

    pub fn active_tables(&self) -> SessionResult<Vec<String>> {
        Ok(self.repo.active_tables()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::storage::PosStorage;

    fn engine() -> TableSessionEngine {
        let storage = PosStorage::open_in_memory().unwrap();
        TableSessionEngine::new(OrderRepository::new(storage))
    }

    fn item_total(engine: &TableSessionEngine, order_id: &str) -> f64 {
        engine
            .repository()
            .items(order_id)
            .unwrap()
            .iter()
            .map(|i| i.total)
            .sum()
    }

    #[test]
    fn test_open_table_twice_returns_same_order() {
        let engine = engine();
        let first = engine.open_table("5").unwrap();
        let second = engine.open_table("5").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(engine.active_tables().unwrap(), vec!["5"]);
    }

    #[test]
    fn test_open_table_rejects_blank_label() {
        let engine = engine();
        assert!(matches!(
            engine.open_table("  "),
            Err(SessionError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_total_tracks_item_mutations() {
        // Total consistency: stored total equals the live item sum after
        // every mutating call.
        let engine = engine();
        let order = engine.open_table("2").unwrap();

        let (order_after, item) = engine.add_item(&order.id, "Coke", "Drinks", 2.5).unwrap();
        assert_eq!(order_after.total_amount, 2.5);
        assert_eq!(order_after.total_amount, item_total(&engine, &order.id));

        let (order_after, _) = engine.add_item(&order.id, "Fries", "Sides", 4.0).unwrap();
        assert_eq!(order_after.total_amount, 6.5);
        assert_eq!(order_after.total_amount, item_total(&engine, &order.id));

        let (order_after, updated) = engine
            .update_line_item(&order.id, item.id, 3, 2.0)
            .unwrap();
        assert_eq!(updated.total, 6.0);
        assert_eq!(order_after.total_amount, 10.0);
        assert_eq!(order_after.total_amount, item_total(&engine, &order.id));

        let order_after = engine.remove_item(&order.id, item.id).unwrap();
        assert_eq!(order_after.total_amount, 4.0);
        assert_eq!(order_after.total_amount, item_total(&engine, &order.id));
    }

    #[test]
    fn test_add_item_stacks_same_name() {
        let engine = engine();
        let order = engine.open_table("2").unwrap();

        engine.add_item(&order.id, "Coke", "Drinks", 2.5).unwrap();
        let (order_after, item) = engine.add_item(&order.id, "Coke", "Drinks", 2.5).unwrap();

        assert_eq!(item.quantity, 2);
        assert_eq!(item.total, 5.0);
        assert_eq!(engine.repository().items(&order.id).unwrap().len(), 1);
        assert_eq!(order_after.total_amount, 5.0);
    }

    #[test]
    fn test_remove_missing_item_is_not_found() {
        let engine = engine();
        let order = engine.open_table("2").unwrap();
        assert!(matches!(
            engine.remove_item(&order.id, 999),
            Err(SessionError::ItemNotFound(_, 999))
        ));
    }

    #[test]
    fn test_rename_to_free_table() {
        let engine = engine();
        let order = engine.open_table("1").unwrap();
        engine.add_item(&order.id, "Tea", "Drinks", 1.5).unwrap();

        let outcome = engine.change_table(&order.id, "9").unwrap();
        assert!(!outcome.merged);
        assert_eq!(outcome.resulting_order_id, order.id);

        let detail = engine.get_order(&order.id).unwrap();
        assert_eq!(detail.order.table_label, "9");
        // Items untouched by a rename
        assert_eq!(detail.items.len(), 1);
        assert!(detail.items[0].original_table.is_none());
    }

    #[test]
    fn test_merge_conserves_items_and_total() {
        let engine = engine();
        let a = engine.open_table("1").unwrap();
        let b = engine.open_table("2").unwrap();
        engine.add_item(&a.id, "Coke", "Drinks", 2.5).unwrap();
        engine.add_item(&a.id, "Coke", "Drinks", 2.5).unwrap(); // qty 2
        engine.add_item(&b.id, "Fries", "Sides", 4.0).unwrap();

        let outcome = engine.change_table(&a.id, "2").unwrap();
        assert!(outcome.merged);
        assert_eq!(outcome.resulting_order_id, b.id);

        // Source is gone from storage
        assert!(engine.repository().get_order(&a.id).unwrap().is_none());
        assert!(engine.repository().items(&a.id).unwrap().is_empty());

        let detail = engine.get_order(&b.id).unwrap();
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.order.total_amount, 9.0);

        let moved = detail
            .items
            .iter()
            .find(|i| i.item_name == "Coke")
            .unwrap();
        assert_eq!(moved.original_table.as_deref(), Some("1"));
        assert_eq!(moved.quantity, 2);
        let native = detail
            .items
            .iter()
            .find(|i| i.item_name == "Fries")
            .unwrap();
        assert!(native.original_table.is_none());
    }

    #[test]
    fn test_merge_never_groups_same_name_rows() {
        let engine = engine();
        let a = engine.open_table("1").unwrap();
        let b = engine.open_table("2").unwrap();
        engine.add_item(&a.id, "Coke", "Drinks", 2.5).unwrap();
        engine.add_item(&b.id, "Coke", "Drinks", 2.5).unwrap();

        engine.change_table(&a.id, "2").unwrap();

        let items = engine.repository().items(&b.id).unwrap();
        let cokes: Vec<_> = items.iter().filter(|i| i.item_name == "Coke").collect();
        assert_eq!(cokes.len(), 2);
        assert_eq!(
            cokes.iter().filter(|i| i.original_table.is_some()).count(),
            1
        );
    }

    #[test]
    fn test_stacking_skips_merged_rows() {
        let engine = engine();
        let a = engine.open_table("1").unwrap();
        let b = engine.open_table("2").unwrap();
        engine.add_item(&a.id, "Coke", "Drinks", 2.5).unwrap();
        engine.change_table(&a.id, "2").unwrap();

        // The surviving order holds a tagged Coke row; a new add must open
        // a fresh untagged row instead of incrementing the merged one.
        let (_, item) = engine.add_item(&b.id, "Coke", "Drinks", 2.5).unwrap();
        assert_eq!(item.quantity, 1);
        assert!(item.original_table.is_none());

        let items = engine.repository().items(&b.id).unwrap();
        assert_eq!(items.len(), 2);

        // And a second add stacks onto the untagged row
        let (_, item) = engine.add_item(&b.id, "Coke", "Drinks", 2.5).unwrap();
        assert_eq!(item.quantity, 2);
        assert_eq!(engine.repository().items(&b.id).unwrap().len(), 2);
    }

    #[test]
    fn test_second_merge_overwrites_provenance() {
        // Provenance reflects only the immediately preceding table.
        let engine = engine();
        let a = engine.open_table("1").unwrap();
        let b = engine.open_table("2").unwrap();
        let c = engine.open_table("3").unwrap();
        engine.add_item(&a.id, "Coke", "Drinks", 2.5).unwrap();

        engine.change_table(&a.id, "2").unwrap();
        engine.change_table(&b.id, "3").unwrap();

        let items = engine.repository().items(&c.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].original_table.as_deref(), Some("2"));
    }

    #[test]
    fn test_paid_order_cannot_be_moved_or_merged() {
        // A settled order is immutable history: merging it away would
        // re-bill its items onto the target and erase the payment record.
        let engine = engine();
        let a = engine.open_table("1").unwrap();
        let b = engine.open_table("2").unwrap();
        engine.add_item(&a.id, "Coke", "Drinks", 2.5).unwrap();
        engine.add_item(&b.id, "Tea", "Drinks", 1.5).unwrap();
        engine.process_payment(&a.id, 2.5, 0.0).unwrap();

        assert!(matches!(
            engine.change_table(&a.id, "2"),
            Err(SessionError::OrderClosed(_))
        ));
        assert!(matches!(
            engine.change_table(&a.id, "9"),
            Err(SessionError::OrderClosed(_))
        ));

        // Payment record intact, target bill untouched
        let paid = engine.get_order(&a.id).unwrap();
        assert_eq!(paid.order.status, OrderStatus::Paid);
        assert_eq!(paid.order.total_amount, 2.5);
        assert_eq!(paid.items.len(), 1);
        let target = engine.get_order(&b.id).unwrap();
        assert_eq!(target.order.total_amount, 1.5);
        assert_eq!(target.items.len(), 1);
    }

    #[test]
    fn test_table_label_length_limit() {
        let engine = engine();
        let long = "x".repeat(crate::utils::validation::MAX_TABLE_LABEL_LEN + 1);

        assert!(matches!(
            engine.open_table(&long),
            Err(SessionError::InvalidOperation(_))
        ));

        let order = engine.open_table("5").unwrap();
        assert!(matches!(
            engine.change_table(&order.id, &long),
            Err(SessionError::InvalidOperation(_))
        ));
        // Unchanged after the rejected rename
        let detail = engine.get_order(&order.id).unwrap();
        assert_eq!(detail.order.table_label, "5");
    }

    #[test]
    fn test_change_table_missing_order() {
        let engine = engine();
        engine.open_table("2").unwrap();
        assert!(matches!(
            engine.change_table("ghost", "2"),
            Err(SessionError::OrderNotFound(_))
        ));
    }

    #[test]
    fn test_status_overwrite_is_not_monotonic() {
        let engine = engine();
        let order = engine.open_table("4").unwrap();

        let order = engine.set_status(&order.id, OrderStatus::Served).unwrap();
        assert_eq!(order.status, OrderStatus::Served);

        // Kitchen correction: back to Preparing is allowed
        let order = engine.set_status(&order.id, OrderStatus::Preparing).unwrap();
        assert_eq!(order.status, OrderStatus::Preparing);

        // Terminal statuses are not reachable through set_status
        assert!(matches!(
            engine.set_status(&order.id, OrderStatus::Paid),
            Err(SessionError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_payment_is_terminal() {
        let engine = engine();
        let order = engine.open_table("6").unwrap();
        engine.add_item(&order.id, "Coke", "Drinks", 2.5).unwrap();

        let paid = engine.process_payment(&order.id, 2.0, 0.5).unwrap();
        assert_eq!(paid.status, OrderStatus::Paid);
        assert_eq!(paid.payment_cash, 2.0);
        assert_eq!(paid.payment_online, 0.5);
        assert!(paid.paid_at.is_some());

        // No operation may reopen a paid order for item mutation
        assert!(matches!(
            engine.add_item(&order.id, "Coke", "Drinks", 2.5),
            Err(SessionError::OrderClosed(_))
        ));
        assert!(matches!(
            engine.process_payment(&order.id, 2.5, 0.0),
            Err(SessionError::OrderClosed(_))
        ));

        // The table is free again; a fresh session gets a fresh order
        let fresh = engine.open_table("6").unwrap();
        assert_ne!(fresh.id, order.id);
    }

    #[test]
    fn test_payment_sets_backup_flag() {
        let engine = engine();
        let order = engine.open_table("6").unwrap();
        engine.add_item(&order.id, "Coke", "Drinks", 2.5).unwrap();
        assert!(!engine.repository().storage().needs_backup().unwrap());

        engine.process_payment(&order.id, 2.5, 0.0).unwrap();
        assert!(engine.repository().storage().needs_backup().unwrap());
    }

    #[test]
    fn test_close_table_deletes_empty_order() {
        let engine = engine();
        let order = engine.open_table("8").unwrap();

        assert!(engine.close_table(&order.id).unwrap());
        assert!(engine.repository().get_order(&order.id).unwrap().is_none());

        // Table is free per exclusivity; reopening creates a new order
        let fresh = engine.open_table("8").unwrap();
        assert_ne!(fresh.id, order.id);
    }

    #[test]
    fn test_close_table_keeps_order_with_balance() {
        let engine = engine();
        let order = engine.open_table("8").unwrap();
        engine.add_item(&order.id, "Coke", "Drinks", 2.5).unwrap();

        assert!(!engine.close_table(&order.id).unwrap());
        assert!(engine.repository().get_order(&order.id).unwrap().is_some());
    }

    #[test]
    fn test_change_notifications() {
        let engine = engine();
        let mut rx = engine.subscribe();

        let order = engine.open_table("3").unwrap();
        engine.add_item(&order.id, "Coke", "Drinks", 2.5).unwrap();

        let change = rx.try_recv().unwrap();
        assert_eq!(change.kind, OrderChangeKind::Opened);
        assert_eq!(change.order_id, order.id);
        let change = rx.try_recv().unwrap();
        assert_eq!(change.kind, OrderChangeKind::ItemsChanged);
    }
}
