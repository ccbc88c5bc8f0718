//! Update command handler.

use crate::args::UpdateArgs;
use crate::commands::Out;
use crate::error::StoreError;
use crate::model::{Transaction, TransactionUpdates};
use crate::{Config, Result};
use anyhow::{ensure, Context};

/// Changes the given fields of one transaction. Fields that are not given keep their values; the
/// id and creation time never change.
///
/// # Returns
///
/// On success, returns an `Out` containing:
/// - A message naming the updated transaction.
/// - The transaction as it is now stored.
///
/// # Errors
///
/// - Returns an error if no field to change was given.
/// - Returns a `StoreError::NotFound` if there is no transaction with the id.
/// - Returns an error if the resulting category is not configured for the resulting type.
pub async fn update(config: Config, args: UpdateArgs) -> Result<Out<Transaction>> {
    let note = if args.clear_note {
        Some(None)
    } else {
        args.note.map(Some)
    };
    let updates = TransactionUpdates {
        amount: args.amount,
        r#type: args.r#type,
        category: args.category,
        note,
        date: args.date,
    };
    ensure!(
        !updates.is_empty(),
        "Nothing to update, pass at least one field to change"
    );

    let db = config.db();
    let existing = db
        .get(&args.id)
        .await?
        .ok_or_else(|| StoreError::NotFound(args.id.clone()))?;

    // Type and category are validated as a pair.
    if updates.r#type.is_some() || updates.category.is_some() {
        let merged = updates.apply(existing);
        config
            .categories()
            .validate(merged.r#type(), merged.category())?;
    }

    let updated = db
        .update(&args.id, &updates)
        .await
        .with_context(|| format!("Unable to update transaction {}", args.id))?;
    Ok(Out::new(
        format!("Updated transaction {}", updated.id()),
        updated,
    ))
}
