use crate::model::Amount;
use crate::utils;
use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Whether money came in or went out.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    #[default]
    Expense,
}

serde_plain::derive_display_from_serialize!(TransactionType);
serde_plain::derive_fromstr_from_deserialize!(TransactionType);

impl TransactionType {
    /// The sign used when printing an amount of this type.
    pub fn sign(&self) -> char {
        match self {
            TransactionType::Income => '+',
            TransactionType::Expense => '-',
        }
    }
}

/// A single recorded income or expense event.
///
/// Timestamps are held at millisecond precision, which is what the database and backup files
/// store, so a record read back from either compares equal to the one that was written.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: String,
    amount: Amount,
    #[serde(rename = "type")]
    r#type: TransactionType,
    category: String,
    #[serde(default)]
    note: Option<String>,
    #[serde(deserialize_with = "deserialize_millis")]
    date: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a new transaction with a freshly generated id and `created_at` set to now.
    pub fn new(
        amount: Amount,
        r#type: TransactionType,
        category: impl Into<String>,
        note: Option<String>,
        date: DateTime<Utc>,
    ) -> Self {
        let created_at = Utc::now();
        Self::from_parts(
            utils::generate_transaction_id(created_at),
            amount,
            r#type,
            category,
            note,
            date,
            created_at,
        )
    }

    /// Builds a transaction from already-known values, e.g. a database row or an imported record.
    pub fn from_parts(
        id: impl Into<String>,
        amount: Amount,
        r#type: TransactionType,
        category: impl Into<String>,
        note: Option<String>,
        date: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            amount,
            r#type,
            category: category.into(),
            note: note.filter(|n| !n.trim().is_empty()),
            date: date.trunc_subsecs(3),
            created_at: created_at.trunc_subsecs(3),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn r#type(&self) -> TransactionType {
        self.r#type
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// The effective date of the transaction.
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// When the record was first created. Never changes.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The amount with the sign implied by the type: positive for income, negative for expenses.
    pub fn signed_value(&self) -> Decimal {
        match self.r#type {
            TransactionType::Income => self.amount.value(),
            TransactionType::Expense => -self.amount.value(),
        }
    }
}

/// The fields of a transaction that can be changed after creation. Fields left as `None` keep
/// their current value. The id and creation time can never be changed.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<TransactionType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// `Some(None)` clears the note, `Some(Some(..))` replaces it.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl TransactionUpdates {
    /// True if applying these updates would change nothing.
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.r#type.is_none()
            && self.category.is_none()
            && self.note.is_none()
            && self.date.is_none()
    }

    /// Shallow-merges these updates onto `transaction`, returning the merged record.
    pub fn apply(&self, transaction: Transaction) -> Transaction {
        let Transaction {
            id,
            amount,
            r#type,
            category,
            note,
            date,
            created_at,
        } = transaction;

        Transaction::from_parts(
            id,
            self.amount.unwrap_or(amount),
            self.r#type.unwrap_or(r#type),
            self.category.clone().unwrap_or(category),
            self.note.clone().unwrap_or(note),
            self.date.unwrap_or(date),
            created_at,
        )
    }
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    DateTime::<Utc>::deserialize(deserializer).map(|d| d.trunc_subsecs(3))
}

/// Distinguishes a field that is present but `null` from one that is absent.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}
