//! This module is responsible for reading, writing and managing the SQLite database that holds
//! every transaction.
//!
//! A `Db` is a cheap-to-clone handle. Each public operation is its own unit of work; nothing here
//! spans several operations with one database transaction. In particular `update` is a read
//! followed by a write, so a delete that lands between the two yields `NotFound`.

mod document;
mod migrations;

pub use document::{BackupDocument, ImportOutcome, BACKUP_VERSION};

use crate::error::{StoreError, StoreResult};
use crate::model::{Amount, Transaction, TransactionType, TransactionUpdates};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, trace};

const SELECT: &str =
    "SELECT id, amount, type, category, note, date, created_at FROM transactions";

/// Newest insertion first. Records created in the same millisecond keep id order.
const ORDER: &str = "ORDER BY created_at DESC, id ASC";

#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Opens the SQLite file at `path`, creating it if it does not exist
    /// - Updates the database schema with migrations if it is out-of-date
    /// - Returns a constructed `Db` object for further operations
    ///
    /// # Errors
    /// - `StorageUnavailable` if the file cannot be opened or its schema cannot be brought
    ///   up-to-date.
    pub async fn initialize(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        debug!("Opening database at {}", path.display());
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                StoreError::StorageUnavailable(format!("Unable to open {}: {e}", path.display()))
            })?;
        Self::prepare(pool).await
    }

    /// Creates a private, empty database that lives only as long as this handle and its clones.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
        // An in-memory database disappears with its connection, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::StorageUnavailable(e.to_string()))?;
        Self::prepare(pool).await
    }

    async fn prepare(pool: SqlitePool) -> StoreResult<Self> {
        migrate(&pool)
            .await
            .map_err(|e| StoreError::StorageUnavailable(format!("{e:#}")))?;
        Ok(Self { pool })
    }

    /// Closes every connection. Operations on this handle or its clones fail afterwards.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Inserts a new transaction.
    ///
    /// # Errors
    /// - `DuplicateId` if a transaction with the same id exists.
    /// - `InvalidTransaction` if the id or category is empty.
    pub async fn add(&self, transaction: &Transaction) -> StoreResult<()> {
        validate(transaction)?;
        trace!("Inserting transaction {}", transaction.id());
        sqlx::query(
            "INSERT INTO transactions (id, amount, type, category, note, date, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(transaction.id())
        .bind(transaction.amount().plain())
        .bind(transaction.r#type().to_string())
        .bind(transaction.category())
        .bind(transaction.note())
        .bind(transaction.date().timestamp_millis())
        .bind(transaction.created_at().timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::DuplicateId(transaction.id().to_string())
            }
            e => StoreError::Database(e),
        })?;
        debug!("Added transaction {}", transaction.id());
        Ok(())
    }

    /// Returns the transaction with `id`, or `None` if there is none.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Transaction>> {
        let row = sqlx::query(&format!("{SELECT} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_transaction).transpose()
    }

    /// Returns every transaction, newest first by `created_at`.
    pub async fn get_all(&self) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!("{SELECT} {ORDER}"))
            .fetch_all(&self.pool)
            .await?;
        rows_to_transactions(&rows)
    }

    /// Returns every transaction of `r#type`, newest first by `created_at`.
    pub async fn get_by_type(&self, r#type: TransactionType) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!("{SELECT} WHERE type = ? {ORDER}"))
            .bind(r#type.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows_to_transactions(&rows)
    }

    /// Returns every transaction in `category`, newest first by `created_at`.
    pub async fn get_by_category(&self, category: &str) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!("{SELECT} WHERE category = ? {ORDER}"))
            .bind(category)
            .fetch_all(&self.pool)
            .await?;
        rows_to_transactions(&rows)
    }

    /// Returns every transaction whose `date` lies within `start..=end`, newest first by
    /// `created_at`.
    pub async fn get_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!("{SELECT} WHERE date >= ? AND date <= ? {ORDER}"))
            .bind(start.timestamp_millis())
            .bind(end.timestamp_millis())
            .fetch_all(&self.pool)
            .await?;
        rows_to_transactions(&rows)
    }

    /// Returns the number of stored transactions.
    pub async fn count(&self) -> StoreResult<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM transactions")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(row.0).unwrap_or_default())
    }

    /// Merges `updates` onto the stored transaction with `id` and returns the merged record.
    ///
    /// # Errors
    /// - `NotFound` if there is no transaction with `id`.
    /// - `InvalidTransaction` if the update would leave the category empty.
    pub async fn update(
        &self,
        id: &str,
        updates: &TransactionUpdates,
    ) -> StoreResult<Transaction> {
        let existing = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let merged = updates.apply(existing);
        validate(&merged)?;

        let result = sqlx::query(
            "UPDATE transactions SET amount = ?, type = ?, category = ?, note = ?, date = ? \
             WHERE id = ?",
        )
        .bind(merged.amount().plain())
        .bind(merged.r#type().to_string())
        .bind(merged.category())
        .bind(merged.note())
        .bind(merged.date().timestamp_millis())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Deleted after we read it.
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!("Updated transaction {id}");
        Ok(merged)
    }

    /// Deletes the transaction with `id`. Deleting an id that does not exist is not an error.
    /// Returns `true` if a row was removed.
    pub async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let removed = result.rows_affected() > 0;
        debug!("Delete of transaction {id} removed {} row(s)", result.rows_affected());
        Ok(removed)
    }

    /// Deletes every transaction and returns how many were removed.
    pub async fn clear_all(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM transactions")
            .execute(&self.pool)
            .await?;
        info!("Cleared {} transaction(s)", result.rows_affected());
        Ok(result.rows_affected())
    }

    /// Produces a backup document holding every transaction in `get_all` order.
    pub async fn serialize(&self) -> StoreResult<BackupDocument> {
        let transactions = self.get_all().await?;
        Ok(BackupDocument::new(transactions, Utc::now()))
    }

    /// Imports the records of a backup document.
    ///
    /// Each well-formed record is inserted as if by `add`. A record whose id already exists, or
    /// which is malformed, is reported as a failure in the returned list and the import carries
    /// on with the next record.
    ///
    /// # Errors
    /// - `InvalidFormat` if `document` has no `transactions` array. Nothing is imported.
    /// - Any engine failure other than a duplicate id stops the import.
    pub async fn deserialize(&self, document: &Value) -> StoreResult<Vec<ImportOutcome>> {
        let records = document
            .get("transactions")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                StoreError::InvalidFormat("expected a 'transactions' array".to_string())
            })?;

        let now = Utc::now();
        let mut outcomes = Vec::with_capacity(records.len());
        for record in records {
            let transaction = match document::parse_record(record, now) {
                Ok(t) => t,
                Err(outcome) => {
                    debug!("Skipping malformed record: {:?}", outcome.reason);
                    outcomes.push(outcome);
                    continue;
                }
            };
            let outcome = match self.add(&transaction).await {
                Ok(()) => ImportOutcome::succeeded(transaction.id()),
                Err(StoreError::DuplicateId(id)) => {
                    ImportOutcome::failed(id, document::ALREADY_EXISTS)
                }
                Err(StoreError::InvalidTransaction(reason)) => {
                    ImportOutcome::failed(transaction.id(), reason)
                }
                Err(e) => return Err(e),
            };
            outcomes.push(outcome);
        }

        let imported = outcomes.iter().filter(|o| o.success).count();
        info!(
            "Imported {imported} of {} record(s) from backup",
            outcomes.len()
        );
        Ok(outcomes)
    }

    /// Parses `json` and imports it with `deserialize`.
    ///
    /// # Errors
    /// - `InvalidFormat` if `json` is not valid JSON or has no `transactions` array.
    pub async fn import_json(&self, json: &str) -> StoreResult<Vec<ImportOutcome>> {
        let document: Value =
            serde_json::from_str(json).map_err(|e| StoreError::InvalidFormat(e.to_string()))?;
        self.deserialize(&document).await
    }
}

/// Brings the schema up to the version this build expects.
async fn migrate(pool: &SqlitePool) -> crate::Result<()> {
    let version = migrations::current_version(pool).await?;
    migrations::run(pool, version, migrations::CURRENT_VERSION).await
}

fn validate(transaction: &Transaction) -> StoreResult<()> {
    if transaction.id().trim().is_empty() {
        return Err(StoreError::InvalidTransaction(
            "the id must not be empty".to_string(),
        ));
    }
    if transaction.category().trim().is_empty() {
        return Err(StoreError::InvalidTransaction(format!(
            "transaction {} has an empty category",
            transaction.id()
        )));
    }
    Ok(())
}

fn rows_to_transactions(rows: &[SqliteRow]) -> StoreResult<Vec<Transaction>> {
    rows.iter().map(row_to_transaction).collect()
}

fn row_to_transaction(row: &SqliteRow) -> StoreResult<Transaction> {
    let amount: String = row.try_get("amount")?;
    let amount = Decimal::from_str(&amount)
        .map_err(|e| decode_error("amount", e))
        .and_then(|d| Amount::new(d).map_err(|e| decode_error("amount", e)))?;

    let r#type: String = row.try_get("type")?;
    let r#type = TransactionType::from_str(&r#type).map_err(|e| decode_error("type", e))?;

    let date = millis(row.try_get("date")?, "date")?;
    let created_at = millis(row.try_get("created_at")?, "created_at")?;

    Ok(Transaction::from_parts(
        row.try_get::<String, _>("id")?,
        amount,
        r#type,
        row.try_get::<String, _>("category")?,
        row.try_get::<Option<String>, _>("note")?,
        date,
        created_at,
    ))
}

fn millis(value: i64, column: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value)
        .ok_or_else(|| decode_error(column, format!("{value} is not a valid timestamp")))
}

fn decode_error(
    column: &str,
    source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> StoreError {
    StoreError::Database(sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: source.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use tempfile::TempDir;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn txn(id: &str, r#type: TransactionType, category: &str, value: &str, created: i64) -> Transaction {
        Transaction::from_parts(
            id,
            amount(value),
            r#type,
            category,
            None,
            Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap(),
            Utc.timestamp_millis_opt(created).unwrap(),
        )
    }

    async fn seeded() -> Db {
        let db = Db::in_memory().await.unwrap();
        db.add(&txn("a", TransactionType::Income, "Salary", "500", 1_000))
            .await
            .unwrap();
        db.add(&txn("b", TransactionType::Expense, "Fuel", "6", 3_000))
            .await
            .unwrap();
        db.add(&txn("c", TransactionType::Expense, "Snacks", "2", 2_000))
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_add_then_get_returns_equal_record() {
        let db = Db::in_memory().await.unwrap();
        let t = Transaction::new(
            amount("12.345"),
            TransactionType::Expense,
            "Groceries",
            Some("weekly shop".to_string()),
            Utc::now(),
        );
        db.add(&t).await.unwrap();
        assert_eq!(db.get(t.id()).await.unwrap(), Some(t));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let db = Db::in_memory().await.unwrap();
        assert_eq!(db.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let db = Db::in_memory().await.unwrap();
        let t = txn("dup", TransactionType::Income, "Gift", "1", 1);
        db.add(&t).await.unwrap();

        let err = db.add(&t).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(ref id) if id == "dup"));
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_category_rejected() {
        let db = Db::in_memory().await.unwrap();
        let t = txn("x", TransactionType::Income, " ", "1", 1);
        let err = db.add(&t).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransaction(_)));
        assert_eq!(db.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_all_newest_first() {
        let db = seeded().await;
        let all = db.get_all().await.unwrap();
        let ids: Vec<&str> = all.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        for pair in all.windows(2) {
            assert!(pair[0].created_at() >= pair[1].created_at());
        }
    }

    #[tokio::test]
    async fn test_get_all_ties_ordered_by_id() {
        let db = Db::in_memory().await.unwrap();
        for id in ["z", "m", "a"] {
            db.add(&txn(id, TransactionType::Expense, "Fuel", "1", 500))
                .await
                .unwrap();
        }
        let ids: Vec<String> = db
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "m", "z"]);
    }

    #[tokio::test]
    async fn test_get_by_type_and_category() {
        let db = seeded().await;

        let expenses = db.get_by_type(TransactionType::Expense).await.unwrap();
        let ids: Vec<&str> = expenses.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["b", "c"]);

        let fuel = db.get_by_category("Fuel").await.unwrap();
        assert_eq!(fuel.len(), 1);
        assert_eq!(fuel[0].id(), "b");

        assert!(db.get_by_category("Barber").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_date_range_is_inclusive() {
        let db = Db::in_memory().await.unwrap();
        let day = |d: u32| Utc.with_ymd_and_hms(2025, 5, d, 0, 0, 0).unwrap();
        for (id, d) in [("d1", 1), ("d2", 2), ("d3", 3), ("d4", 4)] {
            let t = Transaction::from_parts(
                id,
                amount("1"),
                TransactionType::Expense,
                "Fuel",
                None,
                day(d),
                day(d),
            );
            db.add(&t).await.unwrap();
        }
        let found = db.get_by_date_range(day(2), day(3)).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec!["d3", "d2"]);
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let db = seeded().await;
        let before = db.get("b").await.unwrap().unwrap();

        let updates = TransactionUpdates {
            amount: Some(amount("7.25")),
            ..Default::default()
        };
        let merged = db.update("b", &updates).await.unwrap();
        let after = db.get("b").await.unwrap().unwrap();

        assert_eq!(merged, after);
        assert_eq!(after.amount().plain(), "7.250");
        assert_eq!(after.r#type(), before.r#type());
        assert_eq!(after.category(), before.category());
        assert_eq!(after.note(), before.note());
        assert_eq!(after.date(), before.date());
        assert_eq!(after.created_at(), before.created_at());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = seeded().await;
        let err = db
            .update("missing", &TransactionUpdates::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(ref id) if id == "missing"));
    }

    #[tokio::test]
    async fn test_update_rejects_empty_category() {
        let db = seeded().await;
        let updates = TransactionUpdates {
            category: Some(String::new()),
            ..Default::default()
        };
        let err = db.update("a", &updates).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransaction(_)));
        assert_eq!(db.get("a").await.unwrap().unwrap().category(), "Salary");
    }

    /// Deleting an id that is not there succeeds. This is intentional.
    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let db = seeded().await;
        assert!(db.delete("a").await.unwrap());
        assert_eq!(db.get("a").await.unwrap(), None);
        assert!(!db.delete("a").await.unwrap());
        assert!(!db.delete("never-existed").await.unwrap());
        assert_eq!(db.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let db = seeded().await;
        assert_eq!(db.clear_all().await.unwrap(), 3);
        assert!(db.get_all().await.unwrap().is_empty());
        assert_eq!(db.clear_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_serialize() {
        let db = seeded().await;
        let doc = db.serialize().await.unwrap();
        assert_eq!(doc.version(), BACKUP_VERSION);
        assert_eq!(doc.transaction_count(), 3);
        assert_eq!(doc.transactions(), db.get_all().await.unwrap().as_slice());
    }

    #[tokio::test]
    async fn test_round_trip_into_empty_store() {
        let source = seeded().await;
        let json = serde_json::to_value(source.serialize().await.unwrap()).unwrap();

        let target = Db::in_memory().await.unwrap();
        let outcomes = target.deserialize(&json).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes.iter().all(|o| o.success && o.reason.is_none()));
        assert_eq!(
            target.get_all().await.unwrap(),
            source.get_all().await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_round_trip_into_same_store_reports_duplicates() {
        let db = seeded().await;
        let before = db.get_all().await.unwrap();
        let json = serde_json::to_string(&db.serialize().await.unwrap()).unwrap();

        let outcomes = db.import_json(&json).await.unwrap();

        assert_eq!(outcomes.len(), 3);
        for outcome in &outcomes {
            assert!(!outcome.success);
            assert_eq!(outcome.reason.as_deref(), Some("Already exists"));
        }
        assert_eq!(db.get_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_deserialize_continues_past_bad_records() {
        let db = Db::in_memory().await.unwrap();
        let doc = json!({
            "transactions": [
                {"id": "ok1", "amount": 1.5, "type": "income", "category": "Gift"},
                {"id": "bad", "amount": 1.5, "type": "income"},
                {"id": "ok1", "amount": 9, "type": "expense", "category": "Fuel"},
                {"id": "ok2", "amount": "2", "type": "expense", "category": "Fuel"}
            ]
        });
        let outcomes = db.deserialize(&doc).await.unwrap();
        let summary: Vec<(&str, bool)> = outcomes
            .iter()
            .map(|o| (o.id.as_str(), o.success))
            .collect();
        assert_eq!(
            summary,
            vec![("ok1", true), ("bad", false), ("ok1", false), ("ok2", true)]
        );
        assert_eq!(db.count().await.unwrap(), 2);
        // The duplicate did not overwrite the first record.
        assert_eq!(db.get("ok1").await.unwrap().unwrap().category(), "Gift");
    }

    #[tokio::test]
    async fn test_deserialize_invalid_format() {
        let db = Db::in_memory().await.unwrap();
        for doc in [json!({}), json!({"transactions": {}}), json!([1, 2])] {
            let err = db.deserialize(&doc).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidFormat(_)));
        }
        let err = db.import_json("not json").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidFormat(_)));
        assert_eq!(db.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_initialize_on_disk_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("floos.sqlite");
        {
            let db = Db::initialize(&path).await.unwrap();
            db.add(&txn("keep", TransactionType::Income, "Gift", "3", 1))
                .await
                .unwrap();
            db.close().await;
        }
        let db = Db::initialize(&path).await.unwrap();
        assert!(db.get("keep").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_initialize_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no").join("such").join("dir").join("floos.sqlite");
        let err = Db::initialize(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_in_memory_stores_are_isolated() {
        let a = seeded().await;
        let b = Db::in_memory().await.unwrap();
        assert_eq!(a.count().await.unwrap(), 3);
        assert_eq!(b.count().await.unwrap(), 0);
    }
}
