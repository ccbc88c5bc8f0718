//! Insert command handler.

use crate::args::AddArgs;
use crate::commands::Out;
use crate::model::Transaction;
use crate::{Config, Result};
use anyhow::Context;
use chrono::Utc;

/// Records a new transaction.
///
/// A unique transaction ID is generated, and `created_at` is set to now. The category must be one
/// of those configured for the transaction's type.
///
/// # Returns
///
/// On success, returns an `Out` containing:
/// - A message indicating the transaction was added.
/// - The stored transaction.
///
/// # Errors
///
/// - Returns an error if the category is not configured for the type.
/// - Returns an error if a database operation fails.
pub async fn add(config: Config, args: AddArgs) -> Result<Out<Transaction>> {
    config.categories().validate(args.r#type, &args.category)?;

    let transaction = Transaction::new(
        args.amount,
        args.r#type,
        args.category,
        args.note,
        args.date.unwrap_or_else(Utc::now),
    );

    config
        .db()
        .add(&transaction)
        .await
        .context("Unable to add the transaction")?;

    let message = format!(
        "Added {} of {}{} in {} with ID: {}",
        transaction.r#type(),
        transaction.r#type().sign(),
        transaction.amount().with_currency(config.currency()),
        transaction.category(),
        transaction.id()
    );
    Ok(Out::new(message, transaction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, TransactionType};
    use crate::test::TestEnv;
    use std::str::FromStr;

    fn args(r#type: TransactionType, category: &str) -> AddArgs {
        AddArgs {
            amount: Amount::from_str("2.5").unwrap(),
            r#type,
            category: category.to_string(),
            note: Some("lunch".to_string()),
            date: None,
        }
    }

    #[tokio::test]
    async fn test_add() {
        let env = TestEnv::new().await;
        let out = add(env.config(), args(TransactionType::Expense, "Snacks"))
            .await
            .unwrap();
        let added = out.structure().unwrap();
        assert!(out.message().contains(added.id()));
        assert!(out.message().contains("-OMR 2.500"));

        let stored = env.config().db().get(added.id()).await.unwrap().unwrap();
        assert_eq!(&stored, added);
        assert_eq!(stored.note(), Some("lunch"));
    }

    #[tokio::test]
    async fn test_add_rejects_category_of_other_type() {
        let env = TestEnv::new().await;
        let err = add(env.config(), args(TransactionType::Income, "Fuel"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Salary"));
        assert_eq!(env.config().db().count().await.unwrap(), 0);
    }
}
