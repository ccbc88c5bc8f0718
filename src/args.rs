//! These structs provide the CLI interface for the floos CLI.

use crate::model::{Amount, TransactionType};
use crate::query::Window;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// floos: an offline, single-user expense tracker.
///
/// Record your income and expenses, see running balances and category breakdowns, and keep JSON
/// backups of everything. All data lives in a SQLite file inside the floos home directory.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory, the configuration file and an empty database.
    ///
    /// This is the first command you should run. By default the data directory is $HOME/floos;
    /// pass --floos-home or set FLOOS_HOME to put it somewhere else.
    Init,
    /// Record a new income or expense.
    Add(AddArgs),
    /// Show one transaction.
    Get(GetArgs),
    /// List transactions, newest first.
    List(ListArgs),
    /// Change some fields of an existing transaction.
    Update(UpdateArgs),
    /// Delete one transaction.
    Delete(DeleteArgs),
    /// Delete every transaction. A backup is written first.
    Clear(ClearArgs),
    /// Show total income, total expenses and the balance.
    Summary(SummaryArgs),
    /// Show how income or expenses split across categories.
    Breakdown(BreakdownArgs),
    /// Write every transaction to a JSON backup file.
    Export(ExportArgs),
    /// Load transactions from a JSON backup file. Existing transactions are kept.
    Import(ImportArgs),
    /// Write an expense report with totals, breakdowns and the transaction list.
    Report(ReportArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where floos data and configuration is held. Defaults to ~/floos
    #[arg(long, env = "FLOOS_HOME", default_value_t = default_floos_home())]
    floos_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, floos_home: PathBuf) -> Self {
        Self {
            log_level,
            floos_home: floos_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn floos_home(&self) -> &DisplayPath {
        &self.floos_home
    }
}

/// How rows of data are printed.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    /// A markdown table.
    #[default]
    Table,
    Csv,
}

serde_plain::derive_display_from_serialize!(OutputFormat);
serde_plain::derive_fromstr_from_deserialize!(OutputFormat);

/// How a report is written.
#[derive(
    Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    #[default]
    Text,
}

serde_plain::derive_display_from_serialize!(ReportFormat);
serde_plain::derive_fromstr_from_deserialize!(ReportFormat);

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Text => "txt",
        }
    }
}

/// Args for the `floos add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The amount, e.g. 4.5 or 1,250.000. At most three decimal places are kept.
    #[arg(long)]
    pub amount: Amount,

    /// Whether this is income or an expense.
    #[arg(long = "type", value_enum)]
    pub r#type: TransactionType,

    /// One of the categories configured for the type.
    #[arg(long)]
    pub category: String,

    #[arg(long)]
    pub note: Option<String>,

    /// When the transaction happened: YYYY-MM-DD, YYYY-MM-DDTHH:MM (local time) or an RFC 3339
    /// timestamp. Defaults to now.
    #[arg(long, value_parser = parse_date)]
    pub date: Option<DateTime<Utc>>,
}

/// Args for the `floos get` command.
#[derive(Debug, Parser, Clone)]
pub struct GetArgs {
    /// The id of the transaction.
    pub id: String,
}

/// Args for the `floos list` command.
#[derive(Debug, Parser, Clone)]
pub struct ListArgs {
    #[arg(long, value_enum, default_value_t = Window::All)]
    pub window: Window,

    /// Only list income or only expenses.
    #[arg(long = "type", value_enum)]
    pub r#type: Option<TransactionType>,

    /// Only list transactions in this category.
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Args for the `floos update` command.
#[derive(Debug, Parser, Clone)]
pub struct UpdateArgs {
    /// The id of the transaction to change.
    pub id: String,

    #[arg(long)]
    pub amount: Option<Amount>,

    #[arg(long = "type", value_enum)]
    pub r#type: Option<TransactionType>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long, conflicts_with = "clear_note")]
    pub note: Option<String>,

    /// Remove the note.
    #[arg(long)]
    pub clear_note: bool,

    #[arg(long, value_parser = parse_date)]
    pub date: Option<DateTime<Utc>>,
}

/// Args for the `floos delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the transaction to delete.
    pub id: String,
}

/// Args for the `floos clear` command.
#[derive(Debug, Parser, Clone)]
pub struct ClearArgs {
    /// Confirm that every transaction should be deleted.
    #[arg(long)]
    pub yes: bool,
}

/// Args for the `floos summary` command.
#[derive(Debug, Parser, Clone)]
pub struct SummaryArgs {
    #[arg(long, value_enum, default_value_t = Window::All)]
    pub window: Window,
}

/// Args for the `floos breakdown` command.
#[derive(Debug, Parser, Clone)]
pub struct BreakdownArgs {
    #[arg(long = "type", value_enum)]
    pub r#type: TransactionType,

    #[arg(long, value_enum, default_value_t = Window::All)]
    pub window: Window,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Args for the `floos export` command.
#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    /// Where to write the backup. Defaults to a dated file in $FLOOS_HOME/.backups
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Args for the `floos import` command.
#[derive(Debug, Parser, Clone)]
pub struct ImportArgs {
    /// A backup file written by `floos export`.
    pub file: PathBuf,
}

/// Args for the `floos report` command.
#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    #[arg(long, value_enum, default_value_t = Window::All)]
    pub window: Window,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Where to write the report. Defaults to $FLOOS_HOME/reports/Floos_<dates>.<ext>
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Parses a date given on the command line. Dates without an offset are in local time.
pub fn parse_date(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Ok(d.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M"))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|_| {
            format!("'{s}' is not a date, expected YYYY-MM-DD, YYYY-MM-DDTHH:MM or RFC 3339")
        })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|d| d.with_timezone(&Utc))
        .ok_or_else(|| format!("'{s}' does not exist in the local time zone"))
}

fn default_floos_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("floos"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --floos-home or FLOOS_HOME instead of relying on the default \
                floos home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("floos")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
