//! redb-based storage layer for the POS store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order records |
//! | `order_items` | `(order_id, item_id)` | `LineItem` | Line items, range-scanned per order |
//! | `categories` | `category_id` | `Category` | Menu categories |
//! | `products` | `product_id` | `Product` | Menu products |
//! | `meta` | `&str` | `u64` | Item ID sequence + backup dirty flag |
//!
//! # Atomicity
//!
//! Every multi-record mutation (item change + total recompute, the merge
//! sequence, cascading deletes) runs inside a single [`WriteTransaction`].
//! Write helpers here take `&WriteTransaction` so callers can compose them
//! into one atomic unit; a half-applied state is never observable.
//!
//! # Durability
//!
//! redb commits are persistent as soon as `commit()` returns (copy-on-write
//! with atomic pointer swap), which matters for counter hardware that gets
//! power-cycled without warning.

use redb::{
    Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::models::{Category, LineItem, Order, Product};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Orders: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Line items: key = (order_id, item_id), value = JSON-serialized LineItem
const ORDER_ITEMS_TABLE: TableDefinition<(&str, u64), &[u8]> =
    TableDefinition::new("order_items");

/// Categories: key = category_id, value = JSON-serialized Category
const CATEGORIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("categories");

/// Products: key = product_id, value = JSON-serialized Product
const PRODUCTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("products");

/// Meta: item ID sequence counter and backup dirty flag
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const ITEM_SEQ_KEY: &str = "item_seq";
const NEEDS_BACKUP_KEY: &str = "needs_backup";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Order not found: {0}")]
    OrderNotFound(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// POS store backed by redb
#[derive(Clone)]
pub struct PosStorage {
    db: Arc<Database>,
}

impl PosStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_ITEMS_TABLE)?;
            let _ = write_txn.open_table(CATEGORIES_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;

            let mut meta = write_txn.open_table(META_TABLE)?;
            if meta.get(ITEM_SEQ_KEY)?.is_none() {
                meta.insert(ITEM_SEQ_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Item ID sequence ==========

    /// Increment and return the item ID sequence (within transaction).
    /// IDs are unique across all orders, so merge can move an item to a new
    /// owner without key collisions.
    pub fn next_item_id(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let mut meta = txn.open_table(META_TABLE)?;
        let current = meta.get(ITEM_SEQ_KEY)?.map(|g| g.value()).unwrap_or(0);
        let next = current + 1;
        meta.insert(ITEM_SEQ_KEY, next)?;
        Ok(next)
    }

    // ========== Order Operations ==========

    /// Insert or overwrite an order (within transaction)
    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// Get an order by ID (read-only)
    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Get an order by ID (within transaction)
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Remove an order record (within transaction). Does not touch its items.
    pub fn remove_order(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<bool> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        Ok(table.remove(order_id)?.is_some())
    }

    /// Get all orders, in store key order
    pub fn get_all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    /// Iterate all orders within a write transaction, in store key order
    pub fn get_all_orders_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;

        let mut orders = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            orders.push(serde_json::from_slice(value.value())?);
        }
        Ok(orders)
    }

    // ========== Line Item Operations ==========

    /// Insert or overwrite a line item under its owning order's key
    pub fn put_item(&self, txn: &WriteTransaction, item: &LineItem) -> StorageResult<()> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        let key = (item.order_id.as_str(), item.id);
        let value = serde_json::to_vec(item)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    /// Get a single line item (within transaction)
    pub fn get_item_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        item_id: u64,
    ) -> StorageResult<Option<LineItem>> {
        let table = txn.open_table(ORDER_ITEMS_TABLE)?;
        match table.get((order_id, item_id))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Remove a single line item. Returns whether it existed.
    pub fn remove_item(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
        item_id: u64,
    ) -> StorageResult<bool> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;
        Ok(table.remove((order_id, item_id))?.is_some())
    }

    /// Get all line items for an order (read-only)
    pub fn items_for_order(&self, order_id: &str) -> StorageResult<Vec<LineItem>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDER_ITEMS_TABLE)?;

        let mut items = Vec::new();
        let range_start = (order_id, 0u64);
        let range_end = (order_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }

    /// Get all line items for an order (within transaction)
    pub fn items_for_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Vec<LineItem>> {
        let table = txn.open_table(ORDER_ITEMS_TABLE)?;

        let mut items = Vec::new();
        let range_start = (order_id, 0u64);
        let range_end = (order_id, u64::MAX);
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            items.push(serde_json::from_slice(value.value())?);
        }
        Ok(items)
    }

    /// Remove all line items for an order and return them (for cascade
    /// deletes and merges)
    pub fn remove_items_for_order(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Vec<LineItem>> {
        let mut table = txn.open_table(ORDER_ITEMS_TABLE)?;

        let range_start = (order_id, 0u64);
        let range_end = (order_id, u64::MAX);

        let mut items = Vec::new();
        let mut keys_to_remove: Vec<(String, u64)> = Vec::new();

        // Collect first, then remove, to avoid iterating a table being mutated
        for result in table.range(range_start..=range_end)? {
            let (key, value) = result?;
            let item: LineItem = serde_json::from_slice(value.value())?;
            items.push(item);
            let key_value = key.value();
            keys_to_remove.push((key_value.0.to_string(), key_value.1));
        }

        for (oid, item_id) in &keys_to_remove {
            table.remove((oid.as_str(), *item_id))?;
        }

        Ok(items)
    }

    // ========== Category Operations ==========

    pub fn put_category(&self, txn: &WriteTransaction, category: &Category) -> StorageResult<()> {
        let mut table = txn.open_table(CATEGORIES_TABLE)?;
        let value = serde_json::to_vec(category)?;
        table.insert(category.id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_category(&self, category_id: &str) -> StorageResult<Option<Category>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATEGORIES_TABLE)?;
        match table.get(category_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn get_all_categories(&self) -> StorageResult<Vec<Category>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CATEGORIES_TABLE)?;

        let mut categories = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            categories.push(serde_json::from_slice(value.value())?);
        }
        Ok(categories)
    }

    // ========== Product Operations ==========

    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        let value = serde_json::to_vec(product)?;
        table.insert(product.id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn get_product(&self, product_id: &str) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;
        match table.get(product_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn remove_product(&self, txn: &WriteTransaction, product_id: &str) -> StorageResult<bool> {
        let mut table = txn.open_table(PRODUCTS_TABLE)?;
        Ok(table.remove(product_id)?.is_some())
    }

    pub fn get_all_products(&self) -> StorageResult<Vec<Product>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PRODUCTS_TABLE)?;

        let mut products = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            products.push(serde_json::from_slice(value.value())?);
        }
        Ok(products)
    }

    // ========== Backup Flag ==========
    // Two-state reconciliation flag: set inside the same transaction as the
    // local commit that made the data dirty, cleared only after the exporter
    // confirms. Not a consensus protocol.

    /// Mark that a backup is pending (within transaction)
    pub fn set_needs_backup(&self, txn: &WriteTransaction) -> StorageResult<()> {
        let mut meta = txn.open_table(META_TABLE)?;
        meta.insert(NEEDS_BACKUP_KEY, 1u64)?;
        Ok(())
    }

    /// Clear the backup flag after a confirmed export
    pub fn clear_needs_backup(&self) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut meta = txn.open_table(META_TABLE)?;
            meta.insert(NEEDS_BACKUP_KEY, 0u64)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Whether a backup attempt is pending
    pub fn needs_backup(&self) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let meta = read_txn.open_table(META_TABLE)?;
        Ok(meta.get(NEEDS_BACKUP_KEY)?.map(|g| g.value()).unwrap_or(0) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OrderStatus;
    use shared::util::now_millis;

    fn test_order(id: &str, table: &str) -> Order {
        Order {
            id: id.to_string(),
            table_label: table.to_string(),
            status: OrderStatus::Preparing,
            created_at: now_millis(),
            updated_at: now_millis(),
            paid_at: None,
            total_amount: 0.0,
            payment_cash: 0.0,
            payment_online: 0.0,
        }
    }

    fn test_item(id: u64, order_id: &str, name: &str) -> LineItem {
        LineItem {
            id,
            order_id: order_id.to_string(),
            item_name: name.to_string(),
            category_name: "Manual".to_string(),
            quantity: 1,
            rate: 2.5,
            total: 2.5,
            original_table: None,
        }
    }

    #[test]
    fn test_order_roundtrip() {
        let storage = PosStorage::open_in_memory().unwrap();
        let order = test_order("order-1", "5");

        let txn = storage.begin_write().unwrap();
        storage.put_order(&txn, &order).unwrap();
        txn.commit().unwrap();

        let loaded = storage.get_order("order-1").unwrap().unwrap();
        assert_eq!(loaded.table_label, "5");
        assert_eq!(loaded.status, OrderStatus::Preparing);

        assert!(storage.get_order("missing").unwrap().is_none());
    }

    #[test]
    fn test_item_id_sequence() {
        let storage = PosStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        let a = storage.next_item_id(&txn).unwrap();
        let b = storage.next_item_id(&txn).unwrap();
        txn.commit().unwrap();

        assert_eq!(a, 1);
        assert_eq!(b, 2);

        // Sequence survives across transactions
        let txn = storage.begin_write().unwrap();
        let c = storage.next_item_id(&txn).unwrap();
        txn.commit().unwrap();
        assert_eq!(c, 3);
    }

    #[test]
    fn test_items_range_scan_is_per_order() {
        let storage = PosStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.put_item(&txn, &test_item(1, "order-a", "Coke")).unwrap();
        storage.put_item(&txn, &test_item(2, "order-b", "Tea")).unwrap();
        storage.put_item(&txn, &test_item(3, "order-a", "Fries")).unwrap();
        txn.commit().unwrap();

        let items = storage.items_for_order("order-a").unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.order_id == "order-a"));

        let items = storage.items_for_order("order-b").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].item_name, "Tea");
    }

    #[test]
    fn test_remove_items_for_order_returns_removed() {
        let storage = PosStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.put_item(&txn, &test_item(1, "order-a", "Coke")).unwrap();
        storage.put_item(&txn, &test_item(2, "order-a", "Fries")).unwrap();
        storage.put_item(&txn, &test_item(3, "order-b", "Tea")).unwrap();
        txn.commit().unwrap();

        let txn = storage.begin_write().unwrap();
        let removed = storage.remove_items_for_order(&txn, "order-a").unwrap();
        txn.commit().unwrap();

        assert_eq!(removed.len(), 2);
        assert!(storage.items_for_order("order-a").unwrap().is_empty());
        // Other order untouched
        assert_eq!(storage.items_for_order("order-b").unwrap().len(), 1);
    }

    #[test]
    fn test_remove_item_reports_existence() {
        let storage = PosStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.put_item(&txn, &test_item(1, "order-a", "Coke")).unwrap();
        assert!(storage.remove_item(&txn, "order-a", 1).unwrap());
        assert!(!storage.remove_item(&txn, "order-a", 1).unwrap());
        txn.commit().unwrap();
    }

    #[test]
    fn test_backup_flag() {
        let storage = PosStorage::open_in_memory().unwrap();
        assert!(!storage.needs_backup().unwrap());

        let txn = storage.begin_write().unwrap();
        storage.set_needs_backup(&txn).unwrap();
        txn.commit().unwrap();
        assert!(storage.needs_backup().unwrap());

        storage.clear_needs_backup().unwrap();
        assert!(!storage.needs_backup().unwrap());
    }

    #[test]
    fn test_uncommitted_transaction_is_invisible() {
        let storage = PosStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage.put_order(&txn, &test_order("order-1", "5")).unwrap();
        drop(txn); // abort

        assert!(storage.get_order("order-1").unwrap().is_none());
    }
}
