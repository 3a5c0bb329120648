//! Order repository - CRUD and query helpers over orders and line items
//!
//! The repository is the only path between the session engine and the
//! store. It owns the total-recomputation routine: every mutating operation
//! that touches line items must call [`OrderRepository::recompute_total`]
//! inside the same write transaction, which is what keeps the cached
//! `total_amount` equal to the sum of the live items at every observable
//! point between operations.

use redb::WriteTransaction;
use shared::models::{LineItem, Order, OrderStatus};
use shared::util::{new_id, now_millis};

use super::storage::{PosStorage, StorageResult};

/// CRUD + query helpers over Order and LineItem records
#[derive(Clone)]
pub struct OrderRepository {
    storage: PosStorage,
}

impl OrderRepository {
    pub fn new(storage: PosStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &PosStorage {
        &self.storage
    }

    /// Begin a write transaction for a composed atomic unit
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        self.storage.begin_write()
    }

    // ========== Queries ==========

    /// Find the open (Preparing or Served) order for a table label.
    ///
    /// Table exclusivity means at most one should exist; if corrupted data
    /// holds two, the first match in store key order is returned. That is a
    /// defect surface, not a silent fix - callers never see the duplicate.
    pub fn find_open_order_by_table(&self, table: &str) -> StorageResult<Option<Order>> {
        Ok(self
            .storage
            .get_all_orders()?
            .into_iter()
            .find(|o| o.status.is_open() && o.table_label == table))
    }

    /// Same lookup within a write transaction, optionally excluding one
    /// order ID (the order being moved during a table change).
    pub fn find_open_order_by_table_txn(
        &self,
        txn: &WriteTransaction,
        table: &str,
        exclude_order_id: Option<&str>,
    ) -> StorageResult<Option<Order>> {
        Ok(self
            .storage
            .get_all_orders_txn(txn)?
            .into_iter()
            .find(|o| {
                o.status.is_open()
                    && o.table_label == table
                    && exclude_order_id != Some(o.id.as_str())
            }))
    }

    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        self.storage.get_order(order_id)
    }

    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        self.storage.get_order_txn(txn, order_id)
    }

    pub fn items(&self, order_id: &str) -> StorageResult<Vec<LineItem>> {
        self.storage.items_for_order(order_id)
    }

    pub fn items_txn(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<Vec<LineItem>> {
        self.storage.items_for_order_txn(txn, order_id)
    }

    /// All open orders, in store key order
    pub fn open_orders(&self) -> StorageResult<Vec<Order>> {
        Ok(self
            .storage
            .get_all_orders()?
            .into_iter()
            .filter(|o| o.status.is_open())
            .collect())
    }

    /// Table labels currently held by an open order
    pub fn active_tables(&self) -> StorageResult<Vec<String>> {
        Ok(self.open_orders()?.into_iter().map(|o| o.table_label).collect())
    }

    // ========== Mutations ==========

    /// Return the existing open order for `table`, or create a fresh one
    /// with zero totals and status Preparing. Idempotent with respect to
    /// table exclusivity: calling this twice never creates a duplicate.
    pub fn create_order(&self, table: &str) -> StorageResult<Order> {
        let txn = self.begin_write()?;
        if let Some(existing) = self.find_open_order_by_table_txn(&txn, table, None)? {
            // No writes happened; dropping the transaction aborts it.
            return Ok(existing);
        }

        let now = now_millis();
        let order = Order {
            id: new_id(),
            table_label: table.to_string(),
            status: OrderStatus::Preparing,
            created_at: now,
            updated_at: now,
            paid_at: None,
            total_amount: 0.0,
            payment_cash: 0.0,
            payment_online: 0.0,
        };
        self.storage.put_order(&txn, &order)?;
        txn.commit()?;
        tracing::debug!(order_id = %order.id, table = %table, "Order created");
        Ok(order)
    }

    /// Delete an order and all line items it owns, as one atomic unit.
    pub fn delete_order(&self, order_id: &str) -> StorageResult<()> {
        let txn = self.begin_write()?;
        self.delete_order_in(&txn, order_id)?;
        txn.commit()?;
        Ok(())
    }

    /// Cascading delete within an existing transaction.
    pub fn delete_order_in(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        if !self.storage.remove_order(txn, order_id)? {
            return Err(super::storage::StorageError::OrderNotFound(
                order_id.to_string(),
            ));
        }
        let removed = self.storage.remove_items_for_order(txn, order_id)?;
        tracing::debug!(order_id = %order_id, items = removed.len(), "Order deleted");
        Ok(())
    }

    /// Re-sum all live line items for an order and persist the new
    /// `total_amount` plus a refreshed `updated_at`. Single choke point for
    /// total consistency; must run inside the transaction of the mutation
    /// that triggered it.
    pub fn recompute_total(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<Order> {
        let mut order = self
            .storage
            .get_order_txn(txn, order_id)?
            .ok_or_else(|| super::storage::StorageError::OrderNotFound(order_id.to_string()))?;

        let total: f64 = self
            .storage
            .items_for_order_txn(txn, order_id)?
            .iter()
            .map(|i| i.total)
            .sum();

        order.total_amount = total;
        order.updated_at = now_millis();
        self.storage.put_order(txn, &order)?;
        Ok(order)
    }

    // ========== Transaction-scoped pass-throughs for the engine ==========

    pub fn put_order_txn(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        self.storage.put_order(txn, order)
    }

    pub fn put_item_txn(&self, txn: &WriteTransaction, item: &LineItem) -> StorageResult<()> {
        self.storage.put_item(txn, item)
    }

    pub fn get_item_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        item_id: u64,
    ) -> StorageResult<Option<LineItem>> {
        self.storage.get_item_txn(txn, order_id, item_id)
    }

    pub fn remove_item_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        item_id: u64,
    ) -> StorageResult<bool> {
        self.storage.remove_item(txn, order_id, item_id)
    }

    pub fn remove_items_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Vec<LineItem>> {
        self.storage.remove_items_for_order(txn, order_id)
    }

    pub fn next_item_id(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        self.storage.next_item_id(txn)
    }

    pub fn mark_backup_pending(&self, txn: &WriteTransaction) -> StorageResult<()> {
        self.storage.set_needs_backup(txn)
    }
}
