//! Configuration file handling for floos.
//!
//! The configuration file is stored at `$FLOOS_HOME/config.json` and contains settings for the
//! floos application such as the number of backups to keep, the currency label and the lists of
//! categories offered for income and expenses.

use crate::backup::Backup;
use crate::db::Db;
use crate::model::Categories;
use crate::{utils, Result};
use anyhow::{bail, Context};
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "floos";
const CONFIG_VERSION: u8 = 1;
const BACKUP_COPIES: u32 = 5;
const CURRENCY: &str = "OMR";
const BACKUPS: &str = ".backups";
const CONFIG_JSON: &str = "config.json";
const FLOOS_SQLITE: &str = "floos.sqlite";

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$FLOOS_HOME` and from there it loads `$FLOOS_HOME/config.json`. It provides
/// paths to other items that are expected in a certain location within the floos home directory,
/// and it holds the open transaction store.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    backups: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the data directory, its backups subdirectory, an initial `config.json` with default
    /// settings, and an empty SQLite database.
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/floos`
    ///
    /// # Errors
    /// - Returns an error if the directory already holds a `config.json`.
    /// - Returns an error if any file operations fail.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        // Create the directory if it does not exist
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the floos home directory")?;

        // Canonicalize the directory path
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "floos is already initialized, a config file exists at '{}'",
                config_path.display()
            );
        }

        let backups_dir = root.join(BACKUPS);
        utils::make_dir(&backups_dir).await?;

        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;

        let db_path = root.join(FLOOS_SQLITE);
        let db = Db::initialize(&db_path)
            .await
            .context("Unable to create SQLite DB")?;

        Ok(Self {
            root,
            backups: backups_dir,
            config_path,
            config_file,
            db,
            sqlite_path: db_path,
        })
    }

    /// This will
    /// - validate that `floos_home` exists and that the config file exists
    /// - load the config file
    /// - validate that the backups directory exists
    /// - open the SQLite database, migrating it if needed
    /// - return the loaded configuration object
    pub async fn load(floos_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = floos_home.into();
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("floos home is missing, run 'floos init' first")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let backups = root.join(BACKUPS);
        if !backups.is_dir() {
            bail!("The backups directory is missing '{}'", backups.display())
        }

        let db_path = root.join(FLOOS_SQLITE);
        let db = Db::initialize(&db_path)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            backups,
            config_path,
            config_file,
            db,
            sqlite_path: db_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn backup_copies(&self) -> u32 {
        self.config_file.backup_copies
    }

    /// The label printed next to amounts, e.g. `OMR`.
    pub fn currency(&self) -> &str {
        &self.config_file.currency
    }

    /// The first day of the week for the `week` window.
    pub fn week_start(&self) -> Weekday {
        self.config_file.week_start
    }

    pub fn categories(&self) -> &Categories {
        &self.config_file.categories
    }

    /// Creates a new `Backup` instance for managing backup files.
    pub fn backup(&self) -> Backup {
        Backup::new(self)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "floos",
///   "config_version": 1,
///   "backup_copies": 5,
///   "currency": "OMR",
///   "week_start": "Sun",
///   "categories": {
///     "income": ["Salary", "Gift", "Freelance", "Other"],
///     "expense": ["Groceries", "Snacks", "Laundromat", "Barber", "Fuel", "Other"]
///   }
/// }
/// ```
///
/// Only `app_name`, `config_version` and `backup_copies` are required.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "floos"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Number of backup copies to keep per kind of backup
    backup_copies: u32,

    #[serde(default = "default_currency")]
    currency: String,

    #[serde(default = "default_week_start")]
    week_start: Weekday,

    #[serde(default)]
    categories: Categories,
}

fn default_currency() -> String {
    CURRENCY.to_string()
}

fn default_week_start() -> Weekday {
    Weekday::Sun
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            backup_copies: BACKUP_COPIES,
            currency: default_currency(),
            week_start: default_week_start(),
            categories: Categories::default(),
        }
    }
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if it belongs to another app.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config: ConfigFile = utils::deserialize(path)
            .await
            .with_context(|| format!("Failed to load config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.backup_copies > 0,
            "backup_copies in the config file must be at least 1"
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}
