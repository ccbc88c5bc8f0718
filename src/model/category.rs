//! The lists of categories offered for each transaction type.
//!
//! The store accepts any non-empty category. These lists are enforced by the command layer when a
//! user adds or edits a transaction, and they can be changed in `config.json`.

use crate::model::TransactionType;
use crate::Result;
use anyhow::bail;
use serde::{Deserialize, Serialize};

const INCOME: &[&str] = &["Salary", "Gift", "Freelance", "Other"];
const EXPENSE: &[&str] = &["Groceries", "Snacks", "Laundromat", "Barber", "Fuel", "Other"];

/// The categories available for income and for expenses.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Categories {
    income: Vec<String>,
    expense: Vec<String>,
}

impl Default for Categories {
    fn default() -> Self {
        Self {
            income: INCOME.iter().map(|s| s.to_string()).collect(),
            expense: EXPENSE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Categories {
    pub fn new(
        income: impl IntoIterator<Item = impl Into<String>>,
        expense: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            income: income.into_iter().map(Into::into).collect(),
            expense: expense.into_iter().map(Into::into).collect(),
        }
    }

    /// The categories offered for `r#type`, in display order.
    pub fn for_type(&self, r#type: TransactionType) -> &[String] {
        match r#type {
            TransactionType::Income => &self.income,
            TransactionType::Expense => &self.expense,
        }
    }

    pub fn contains(&self, r#type: TransactionType, category: &str) -> bool {
        self.for_type(r#type).iter().any(|c| c == category)
    }

    /// Returns an error naming the allowed categories if `category` is not one of them.
    pub fn validate(&self, r#type: TransactionType, category: &str) -> Result<()> {
        if !self.contains(r#type, category) {
            bail!(
                "'{category}' is not an {} category. Choose one of: {}",
                r#type,
                self.for_type(r#type).join(", ")
            );
        }
        Ok(())
    }
}
