use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its backups subdirectory, an initial `config.json` with default
/// settings and an empty SQLite database.
///
/// # Arguments
/// - `floos_home` - The directory that will be the root of data directory, e.g. `$HOME/floos`
///
/// # Errors
/// - Returns an error if the directory is already initialized.
/// - Returns an error if any file operations fail.
pub async fn init(floos_home: &Path) -> Result<Out<()>> {
    let config = Config::create(floos_home)
        .await
        .context("Unable to create the data directory and configs")?;
    Ok(format!(
        "Successfully created the floos directory at {}",
        config.root().display()
    )
    .into())
}
