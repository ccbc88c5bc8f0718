//! The backup document: the JSON envelope used to export and import the full transaction set.

use crate::model::{Amount, Transaction, TransactionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The format version written into every backup document.
pub const BACKUP_VERSION: &str = "1.0.0";

/// A self-describing backup of every stored transaction.
///
/// ```json
/// {
///   "version": "1.0.0",
///   "exportDate": "2025-01-31T18:00:00Z",
///   "transactionCount": 1,
///   "transactions": [ { "id": "tx_...", "amount": 4.5, "type": "expense", ... } ]
/// }
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    version: String,
    export_date: DateTime<Utc>,
    transaction_count: usize,
    transactions: Vec<Transaction>,
}

impl BackupDocument {
    pub fn new(transactions: Vec<Transaction>, export_date: DateTime<Utc>) -> Self {
        Self {
            version: BACKUP_VERSION.to_string(),
            export_date,
            transaction_count: transactions.len(),
            transactions,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn export_date(&self) -> DateTime<Utc> {
        self.export_date
    }

    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }
}

/// The result of importing one record from a backup document.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ImportOutcome {
    /// The record's id, or empty if the record did not have one.
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ImportOutcome {
    pub(crate) fn succeeded(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: true,
            reason: None,
        }
    }

    pub(crate) fn failed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            reason: Some(reason.into()),
        }
    }
}

/// Reason reported for a record whose id is already in the store.
pub(crate) const ALREADY_EXISTS: &str = "Already exists";

/// Turns one element of a backup's `transactions` array into a `Transaction`.
///
/// `id`, `amount`, `type` and `category` are required. A missing `date` or `createdAt` falls back
/// to `now`. Records that cannot be used are returned as a failed `ImportOutcome`.
pub(crate) fn parse_record(
    record: &Value,
    now: DateTime<Utc>,
) -> std::result::Result<Transaction, ImportOutcome> {
    let Some(object) = record.as_object() else {
        return Err(ImportOutcome::failed("", "Record is not an object"));
    };

    let id = match object.get("id").and_then(Value::as_str) {
        Some(id) if !id.trim().is_empty() => id.to_string(),
        _ => return Err(ImportOutcome::failed("", "Missing required field 'id'")),
    };
    let fail = |reason: String| ImportOutcome::failed(id.clone(), reason);

    let amount = match object.get("amount") {
        None | Some(Value::Null) => return Err(fail("Missing required field 'amount'".into())),
        Some(v) => serde_json::from_value::<Amount>(v.clone())
            .map_err(|e| fail(format!("Invalid amount: {e}")))?,
    };

    let r#type = match object.get("type") {
        None | Some(Value::Null) => return Err(fail("Missing required field 'type'".into())),
        Some(v) => serde_json::from_value::<TransactionType>(v.clone())
            .map_err(|e| fail(format!("Invalid type: {e}")))?,
    };

    let category = match object.get("category").and_then(Value::as_str) {
        Some(c) if !c.trim().is_empty() => c.to_string(),
        _ => return Err(fail("Missing required field 'category'".into())),
    };

    let note = object
        .get("note")
        .and_then(Value::as_str)
        .map(str::to_string);

    let date = timestamp(object.get("date"), now).map_err(|e| fail(format!("Invalid date: {e}")))?;
    let created_at = timestamp(object.get("createdAt"), now)
        .map_err(|e| fail(format!("Invalid createdAt: {e}")))?;

    Ok(Transaction::from_parts(
        id, amount, r#type, category, note, date, created_at,
    ))
}

/// Accepts an ISO-8601 string or Unix milliseconds. Absent values become `now`.
fn timestamp(value: Option<&Value>, now: DateTime<Utc>) -> std::result::Result<DateTime<Utc>, String> {
    match value {
        None | Some(Value::Null) => Ok(now),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.with_timezone(&Utc))
            .map_err(|e| format!("'{s}': {e}")),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| format!("{n} is not a valid timestamp")),
        Some(other) => Err(format!("unexpected value {other}")),
    }
}
