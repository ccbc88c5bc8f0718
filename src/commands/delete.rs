//! Delete command handlers.

use crate::args::{ClearArgs, DeleteArgs};
use crate::backup::PRE_CLEAR;
use crate::commands::Out;
use crate::{Config, Result};
use anyhow::{ensure, Context};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Deletes one transaction by ID.
///
/// Deleting an ID that does not exist is not an error. The returned flag tells whether a
/// transaction was actually removed.
pub async fn delete(config: Config, args: DeleteArgs) -> Result<Out<bool>> {
    let removed = config
        .db()
        .delete(&args.id)
        .await
        .with_context(|| format!("Unable to delete transaction {}", args.id))?;
    let message = if removed {
        format!("Deleted transaction {}", args.id)
    } else {
        format!("There is no transaction {}, nothing was deleted", args.id)
    };
    Ok(Out::new(message, removed))
}

/// The result of clearing every transaction.
#[derive(Debug, Clone, Serialize)]
pub struct Cleared {
    /// How many transactions were deleted.
    pub removed: u64,
    /// The backup written before anything was deleted.
    pub backup: PathBuf,
}

/// Deletes every transaction after saving them to a backup file in `.backups`.
///
/// # Errors
/// - Returns an error unless `--yes` was given.
/// - Returns an error if the backup cannot be written. Nothing is deleted in that case.
pub async fn clear(config: Config, args: ClearArgs) -> Result<Out<Cleared>> {
    ensure!(
        args.yes,
        "This deletes every transaction, pass --yes to confirm"
    );

    let db = config.db();
    let document = db.serialize().await?;
    let backup = config
        .backup()
        .save_json(PRE_CLEAR, &document)
        .await
        .context("Unable to back up transactions before clearing")?;
    info!("Saved a backup to {}", backup.display());

    let removed = db.clear_all().await?;
    let message = format!(
        "Deleted {} transaction{}",
        removed,
        if removed == 1 { "" } else { "s" }
    );
    Ok(Out::new(message, Cleared { removed, backup }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BackupDocument;
    use crate::test::TestEnv;
    use crate::utils;

    #[tokio::test]
    async fn test_delete_twice() {
        let env = TestEnv::new().await;
        let added = env.insert_test_data().await;
        let id = added[0].id().to_string();

        let out = delete(env.config(), DeleteArgs { id: id.clone() })
            .await
            .unwrap();
        assert_eq!(out.structure(), Some(&true));

        let out = delete(env.config(), DeleteArgs { id }).await.unwrap();
        assert_eq!(out.structure(), Some(&false));
        assert_eq!(env.config().db().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_clear_requires_confirmation() {
        let env = TestEnv::new().await;
        env.insert_test_data().await;
        assert!(clear(env.config(), ClearArgs { yes: false }).await.is_err());
        assert_eq!(env.config().db().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_clear_writes_backup_first() {
        let env = TestEnv::new().await;
        env.insert_test_data().await;

        let out = clear(env.config(), ClearArgs { yes: true }).await.unwrap();
        let cleared = out.structure().unwrap();
        assert_eq!(cleared.removed, 3);
        assert_eq!(env.config().db().count().await.unwrap(), 0);

        let document: BackupDocument = utils::deserialize(&cleared.backup).await.unwrap();
        assert_eq!(document.transaction_count(), 3);
    }
}
