//! Backup files written into the `.backups` directory by `export` and before `clear`.

use crate::{utils, Config, Result};
use anyhow::Context;
use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;

/// Prefix for backups written by the `export` command.
pub const EXPORT: &str = "floos_backup";

/// Prefix for the snapshot taken before every transaction is cleared.
pub const PRE_CLEAR: &str = "pre_clear";

const JSON: &str = "json";

/// Manages backup file creation and rotation.
///
/// The `Backup` struct is immutable and owns copies of the paths and settings it needs.
/// Create a new instance via `Config::backup()` or `Backup::new()`.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    /// Creates a new `Backup` instance from a `Config`.
    pub fn new(config: &Config) -> Self {
        Self {
            backups_dir: config.backups().to_path_buf(),
            backup_copies: config.backup_copies(),
        }
    }

    /// Saves `data` as a pretty-printed JSON backup file.
    ///
    /// The filename format is `{prefix}.YYYYMMDD-NNN.json` where NNN is a sequence number.
    /// Automatically rotates old backups, keeping only `backup_copies` files per prefix.
    ///
    /// Returns the path to the created backup file.
    pub async fn save_json<T>(&self, prefix: &str, data: &T) -> Result<PathBuf>
    where
        T: Serialize + ?Sized,
    {
        let date = today();
        let seq = self.next_sequence_number(prefix, &date).await?;
        let filename = format!("{prefix}.{date}-{seq:03}.{JSON}");
        let path = self.backups_dir.join(&filename);

        let json = serde_json::to_string_pretty(data).context("Failed to serialize backup")?;
        utils::write(&path, json).await?;

        self.rotate(prefix).await?;

        Ok(path)
    }

    /// Returns the backup files with `prefix`, oldest first.
    pub async fn list(&self, prefix: &str) -> Result<Vec<PathBuf>> {
        let mut files: Vec<(PathBuf, (u32, u32))> = Vec::new();

        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(key) = backup_key(&name, prefix) {
                files.push((entry.path(), key));
            }
        }

        files.sort_by_key(|(_, key)| *key);
        Ok(files.into_iter().map(|(path, _)| path).collect())
    }

    /// Scans the backups directory for existing files with the given prefix and date,
    /// and returns the next sequence number.
    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Result<u32> {
        let mut max_seq: u32 = 0;

        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let file_name = entry.file_name();
            let name = file_name.to_string_lossy();
            if let Some(seq) = parse_sequence_number(&name, prefix, date) {
                max_seq = max_seq.max(seq);
            }
        }

        Ok(max_seq + 1)
    }

    /// Deletes the oldest files with `prefix` until only `backup_copies` remain.
    async fn rotate(&self, prefix: &str) -> Result<()> {
        let files = self.list(prefix).await?;
        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for path in files.into_iter().take(to_delete) {
            tracing::debug!("Removing old backup {}", path.display());
            utils::remove(&path).await?;
        }
        Ok(())
    }
}

/// Returns today's date in YYYYMMDD format.
fn today() -> String {
    Local::now().format("%Y%m%d").to_string()
}

/// Parses the sequence number from a backup filename.
/// Returns None if the filename doesn't match `{prefix}.{date}-NNN.json`.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    filename
        .strip_prefix(&format!("{prefix}.{date}-"))?
        .strip_suffix(&format!(".{JSON}"))?
        .parse()
        .ok()
}

/// Parses `{prefix}.YYYYMMDD-N.json` into its date and sequence number, which order backups from
/// oldest to newest. Returns None for any other filename.
fn backup_key(filename: &str, prefix: &str) -> Option<(u32, u32)> {
    let (date, seq) = filename
        .strip_prefix(&format!("{prefix}."))?
        .strip_suffix(&format!(".{JSON}"))?
        .split_once('-')?;
    if date.len() != 8 {
        return None;
    }
    Some((date.parse().ok()?, seq.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("floos_backup.20251214-001.json", "floos_backup", "20251214"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("floos_backup.20251214-042.json", "floos_backup", "20251214"),
            Some(42)
        );
        // Wrong prefix
        assert_eq!(
            parse_sequence_number("pre_clear.20251214-001.json", "floos_backup", "20251214"),
            None
        );
        // Wrong date
        assert_eq!(
            parse_sequence_number("floos_backup.20251213-001.json", "floos_backup", "20251214"),
            None
        );
        // Wrong extension
        assert_eq!(
            parse_sequence_number("floos_backup.20251214-001.txt", "floos_backup", "20251214"),
            None
        );
    }

    #[test]
    fn test_backup_key() {
        assert_eq!(
            backup_key("floos_backup.20251214-001.json", "floos_backup"),
            Some((20251214, 1))
        );
        assert_eq!(
            backup_key("pre_clear.20251214-1000.json", "pre_clear"),
            Some((20251214, 1000))
        );
        assert_eq!(backup_key("floos_backup.20251214-001.json", "pre_clear"), None);
        assert_eq!(backup_key("floos_backup.20251214-001", "floos_backup"), None);
        assert_eq!(backup_key("floos_backup.notes.json", "floos_backup"), None);
    }

    #[tokio::test]
    async fn test_rotate_past_three_digit_sequence() {
        let env = TestEnv::new().await;
        let backup = env.config().backup();
        let copies = env.config().backup_copies();
        let date = today();

        // An older day plus a run of sequence numbers that crosses 999.
        let old = env.config().backups().join(format!("{EXPORT}.20000101-005.json"));
        utils::write(&old, "{}").await.unwrap();
        for seq in 999 - copies + 1..=999 {
            let path = env
                .config()
                .backups()
                .join(format!("{EXPORT}.{date}-{seq:03}.json"));
            utils::write(&path, "{}").await.unwrap();
        }

        let newest = backup.save_json(EXPORT, &"z").await.unwrap();
        assert!(newest.to_string_lossy().ends_with("-1000.json"));

        let exports = backup.list(EXPORT).await.unwrap();
        assert_eq!(exports.len(), copies as usize);
        assert_eq!(exports.last(), Some(&newest));
        assert!(!exports.contains(&old));
        let oldest_kept = format!("-{:03}.json", 999 - copies + 2);
        assert!(exports[0].to_string_lossy().ends_with(&oldest_kept));
    }

    #[tokio::test]
    async fn test_save_json_sequences_and_rotates() {
        let env = TestEnv::new().await;
        let backup = env.config().backup();
        let copies = env.config().backup_copies() as usize;

        let first = backup.save_json(EXPORT, &vec![1, 2, 3]).await.unwrap();
        let name = first.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(&format!("{EXPORT}.{}-001", today())));

        for _ in 0..copies + 2 {
            backup.save_json(EXPORT, &"x").await.unwrap();
        }
        backup.save_json(PRE_CLEAR, &"y").await.unwrap();

        let exports = backup.list(EXPORT).await.unwrap();
        assert_eq!(exports.len(), copies);
        assert!(!exports.contains(&first));
        assert_eq!(backup.list(PRE_CLEAR).await.unwrap().len(), 1);

        let latest = exports.last().unwrap();
        let expected = format!("-{:03}.json", copies + 3);
        assert!(latest.to_string_lossy().ends_with(&expected));
    }
}
