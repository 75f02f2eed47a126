//! redb-based document store for orders
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order documents (`orders/{id}`) |
//! | `inventory` | `plant_id` | `InventoryRecord` | Stock counts (`inventory/{plantId}`) |
//! | `manual_emails` | `order_id` | `PendingEmail` | Manual email queue |
//!
//! Every read-modify-write runs inside a single write transaction; redb
//! serializes write transactions, so concurrent updates of one order never
//! interleave.

use super::error::{OrderError, OrderResult};
use super::traits::{DocumentStore, RestockReport};
use chrono::Utc;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use shared::order::{InventoryRecord, Order, PendingEmail, StockRestoration};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Order documents: key = order_id, value = JSON-serialized Order
const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");

/// Inventory records: key = plant_id, value = JSON-serialized InventoryRecord
const INVENTORY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("inventory");

/// Manual email queue: key = order_id, value = JSON-serialized PendingEmail
const MANUAL_EMAILS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("manual_emails");

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

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend unreachable (non-redb stores)
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Document store backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for OrderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderStorage").finish_non_exhaustive()
    }
}

impl OrderStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(INVENTORY_TABLE)?;
            let _ = write_txn.open_table(MANUAL_EMAILS_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Orders ==========

    pub fn get_order(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(ORDERS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Read an order inside a write transaction
    pub fn get_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<Order>> {
        let table = txn.open_table(ORDERS_TABLE)?;
        let order = match table.get(order_id)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(order)
    }

    pub fn put_order(&self, txn: &WriteTransaction, order: &Order) -> StorageResult<()> {
        let mut table = txn.open_table(ORDERS_TABLE)?;
        let value = serde_json::to_vec(order)?;
        table.insert(order.id.as_str(), value.as_slice())?;
        Ok(())
    }

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

    // ========== Inventory ==========

    pub fn get_inventory(&self, plant_id: &str) -> StorageResult<Option<InventoryRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(INVENTORY_TABLE)?;

        match table.get(plant_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_inventory(&self, plant_id: &str, record: &InventoryRecord) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(INVENTORY_TABLE)?;
            let value = serde_json::to_vec(record)?;
            table.insert(plant_id, value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    // ========== Manual Email Queue ==========

    pub fn put_pending_email(&self, entry: &PendingEmail) -> StorageResult<()> {
        let txn = self.begin_write()?;
        {
            let mut table = txn.open_table(MANUAL_EMAILS_TABLE)?;
            let value = serde_json::to_vec(entry)?;
            table.insert(entry.order_id.as_str(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get_pending_email(&self, order_id: &str) -> StorageResult<Option<PendingEmail>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MANUAL_EMAILS_TABLE)?;

        match table.get(order_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// All queue entries, oldest first
    pub fn get_pending_emails(&self) -> StorageResult<Vec<PendingEmail>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(MANUAL_EMAILS_TABLE)?;

        let mut entries: Vec<PendingEmail> = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            entries.push(serde_json::from_slice(value.value())?);
        }
        entries.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(entries)
    }

    /// Remove a queue entry, returning it if present
    pub fn remove_pending_email(&self, order_id: &str) -> StorageResult<Option<PendingEmail>> {
        let txn = self.begin_write()?;
        let removed = {
            let mut table = txn.open_table(MANUAL_EMAILS_TABLE)?;
            let removed = match table.remove(order_id)? {
                Some(value) => Some(serde_json::from_slice(value.value())?),
                None => None,
            };
            removed
        };
        txn.commit()?;
        Ok(removed)
    }

    // ========== Statistics ==========

    pub fn get_stats(&self) -> StorageResult<StorageStats> {
        let read_txn = self.db.begin_read()?;

        let orders_table = read_txn.open_table(ORDERS_TABLE)?;
        let inventory_table = read_txn.open_table(INVENTORY_TABLE)?;
        let emails_table = read_txn.open_table(MANUAL_EMAILS_TABLE)?;

        Ok(StorageStats {
            order_count: orders_table.len()?,
            inventory_count: inventory_table.len()?,
            manual_email_count: emails_table.len()?,
        })
    }
}

/// Storage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    pub order_count: u64,
    pub inventory_count: u64,
    pub manual_email_count: u64,
}

impl DocumentStore for OrderStorage {
    fn read_order(&self, order_id: &str) -> OrderResult<Option<Order>> {
        Ok(self.get_order(order_id)?)
    }

    fn list_orders(&self) -> OrderResult<Vec<Order>> {
        Ok(self.get_all_orders()?)
    }

    fn insert_order(&self, order: &Order) -> OrderResult<()> {
        let txn = self.begin_write()?;
        if self.get_order_txn(&txn, &order.id)?.is_some() {
            return Err(OrderError::OrderAlreadyExists(order.id.clone()));
        }
        self.put_order(&txn, order)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(())
    }

    fn update_order(
        &self,
        order_id: &str,
        mutate: &mut dyn FnMut(&mut Order) -> OrderResult<()>,
    ) -> OrderResult<Order> {
        let txn = self.begin_write()?;
        let mut order = self
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;

        // Dropping the transaction on error aborts it
        mutate(&mut order)?;
        order.updated_at = Some(Utc::now());

        self.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(order)
    }

    fn read_inventory(&self, plant_id: &str) -> OrderResult<Option<InventoryRecord>> {
        Ok(self.get_inventory(plant_id)?)
    }

    fn write_inventory(&self, plant_id: &str, record: &InventoryRecord) -> OrderResult<()> {
        Ok(self.put_inventory(plant_id, record)?)
    }

    fn restore_stock(
        &self,
        order_id: &str,
        lines: &[(String, u32)],
    ) -> OrderResult<Option<RestockReport>> {
        let txn = self.begin_write()?;
        let mut order = self
            .get_order_txn(&txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;

        if order.stock_restored {
            return Ok(None);
        }

        let now = Utc::now();
        let mut report = RestockReport::default();
        {
            let mut table = txn.open_table(INVENTORY_TABLE).map_err(StorageError::from)?;
            for (plant_id, quantity) in lines {
                let existing: Option<InventoryRecord> = match table
                    .get(plant_id.as_str())
                    .map_err(StorageError::from)?
                {
                    Some(value) => {
                        Some(serde_json::from_slice(value.value()).map_err(StorageError::from)?)
                    }
                    None => None,
                };

                let Some(mut record) = existing else {
                    tracing::warn!(
                        order_id = %order_id,
                        plant_id = %plant_id,
                        "Inventory record missing, skipping restock"
                    );
                    report.missing.push(plant_id.clone());
                    continue;
                };

                record.current_stock = record.current_stock.saturating_add(i64::from(*quantity));
                record.updated_at = Some(now);
                let value = serde_json::to_vec(&record).map_err(StorageError::from)?;
                table
                    .insert(plant_id.as_str(), value.as_slice())
                    .map_err(StorageError::from)?;

                report.restorations.push(StockRestoration {
                    plant_id: plant_id.clone(),
                    quantity: *quantity,
                    current_stock: record.current_stock,
                });
            }
        }

        order.stock_restored = true;
        order.updated_at = Some(now);
        self.put_order(&txn, &order)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(Some(report))
    }
}
