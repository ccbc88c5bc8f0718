//! Export and import of JSON backup documents.

use crate::args::{ExportArgs, ImportArgs};
use crate::backup::EXPORT;
use crate::commands::Out;
use crate::db::ImportOutcome;
use crate::{utils, Config, Result};
use anyhow::Context;
use std::path::PathBuf;
use tracing::warn;

/// Writes every transaction to a backup document.
///
/// Without `--output` the file goes into `$FLOOS_HOME/.backups` as
/// `floos_backup.YYYYMMDD-NNN.json`, and older exports beyond `backup_copies` are removed.
///
/// Returns the path of the written file.
pub async fn export(config: Config, args: ExportArgs) -> Result<Out<PathBuf>> {
    let document = config
        .db()
        .serialize()
        .await
        .context("Unable to read transactions for export")?;

    let path = match args.output {
        Some(path) => {
            let json = serde_json::to_string_pretty(&document)
                .context("Failed to serialize the backup document")?;
            utils::write(&path, json).await?;
            path
        }
        None => config.backup().save_json(EXPORT, &document).await?,
    };

    let message = format!(
        "Exported {} transaction{} to {}",
        document.transaction_count(),
        if document.transaction_count() == 1 { "" } else { "s" },
        path.display()
    );
    Ok(Out::new(message, path))
}

/// Imports the transactions in a backup file.
///
/// Transactions whose id already exists are skipped, as are malformed records; each is reported
/// in the returned list and logged as a warning.
///
/// # Errors
/// - Returns a `StoreError::InvalidFormat` if the file is not a backup document.
/// - Returns an error if the file cannot be read or a database operation fails.
pub async fn import(config: Config, args: ImportArgs) -> Result<Out<Vec<ImportOutcome>>> {
    let json = utils::read(&args.file).await?;
    let outcomes = config.db().import_json(&json).await?;

    for failure in outcomes.iter().filter(|o| !o.success) {
        warn!(
            "Skipped '{}': {}",
            failure.id,
            failure.reason.as_deref().unwrap_or("unknown reason")
        );
    }

    let imported = outcomes.iter().filter(|o| o.success).count();
    let message = format!(
        "Imported {imported} of {} transaction{} from {}",
        outcomes.len(),
        if outcomes.len() == 1 { "" } else { "s" },
        args.file.display()
    );
    Ok(Out::new(message, outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_export_to_backups_dir() {
        let env = TestEnv::new().await;
        env.insert_test_data().await;

        let out = export(env.config(), ExportArgs { output: None })
            .await
            .unwrap();
        let path = out.structure().unwrap();
        assert!(path.starts_with(env.config().backups()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("floos_backup."));
        assert!(name.ends_with("-001.json"));
        assert!(out.message().starts_with("Exported 3 transactions"));
    }

    #[tokio::test]
    async fn test_export_then_import_elsewhere() {
        let source = TestEnv::new().await;
        source.insert_test_data().await;
        let file = source.scratch_path("backup.json");
        export(source.config(), ExportArgs { output: Some(file.clone()) })
            .await
            .unwrap();

        let target = TestEnv::new().await;
        let out = import(target.config(), ImportArgs { file: file.clone() })
            .await
            .unwrap();
        assert!(out.structure().unwrap().iter().all(|o| o.success));
        assert_eq!(
            target.config().db().get_all().await.unwrap(),
            source.config().db().get_all().await.unwrap()
        );

        // Importing again changes nothing and reports every record.
        let out = import(target.config(), ImportArgs { file }).await.unwrap();
        assert!(out.message().starts_with("Imported 0 of 3"));
        assert_eq!(target.config().db().count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_import_invalid_file() {
        let env = TestEnv::new().await;
        let file = env.scratch_path("bad.json");
        utils::write(&file, r#"{"version": "1.0.0"}"#).await.unwrap();

        let err = import(env.config(), ImportArgs { file }).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::InvalidFormat(_))
        ));
    }
}
