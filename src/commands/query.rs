//! Read-only commands: showing, listing and summarizing transactions.
//!
//! This module provides:
//! - `get`: Show one transaction
//! - `list`: List transactions in a window, optionally by type or category
//! - `summary`: Income, expense and balance totals
//! - `breakdown`: Per-category totals for one transaction type

use crate::args::{BreakdownArgs, GetArgs, ListArgs, OutputFormat, SummaryArgs};
use crate::commands::Out;
use crate::error::StoreError;
use crate::model::{format_money, Transaction};
use crate::query::{self, CategoryShare, Summary, Window};
use crate::{Config, Result};
use anyhow::Context;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

// =============================================================================
// Rows type for query results
// =============================================================================

/// Query result rows in the requested output format.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Rows {
    /// JSON array of objects where each row is a self-describing object.
    Json(serde_json::Value),
    /// Markdown table as a single formatted string.
    Table(String),
    /// CSV data as a properly escaped string.
    Csv(String),
}

impl Debug for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => write!(f, "Rows::Json({:?})", v),
            Rows::Table(s) => write!(f, "Rows::Table({} chars)", s.len()),
            Rows::Csv(s) => write!(f, "Rows::Csv({} chars)", s.len()),
        }
    }
}

impl Display for Rows {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Rows::Json(v) => {
                if let Ok(s) = serde_json::to_string_pretty(v) {
                    write!(f, "{}", s)
                } else {
                    write!(f, "{:?}", v)
                }
            }
            Rows::Table(s) => write!(f, "{}", s),
            Rows::Csv(s) => write!(f, "{}", s),
        }
    }
}

impl Rows {
    /// Renders `rows` in `format`. JSON uses the serde form of `T`; table and CSV use `cells`,
    /// which must yield one value per header.
    fn build<T>(
        format: OutputFormat,
        headers: &[&str],
        rows: &[T],
        cells: impl Fn(&T) -> Vec<String>,
    ) -> Result<Self>
    where
        T: Serialize,
    {
        match format {
            OutputFormat::Json => Ok(Rows::Json(
                serde_json::to_value(rows).context("Unable to serialize rows")?,
            )),
            OutputFormat::Table => Ok(Rows::Table(markdown_table(
                headers,
                rows.iter().map(&cells),
            ))),
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(headers).context("Unable to write CSV")?;
                for row in rows {
                    writer
                        .write_record(cells(row))
                        .context("Unable to write CSV")?;
                }
                let bytes = writer
                    .into_inner()
                    .map_err(|e| anyhow::anyhow!("Unable to finish CSV: {}", e.error()))?;
                Ok(Rows::Csv(
                    String::from_utf8(bytes).context("CSV output was not UTF-8")?,
                ))
            }
        }
    }
}

fn markdown_table(headers: &[&str], rows: impl Iterator<Item = Vec<String>>) -> String {
    let escape = |s: &str| s.replace('|', "\\|").replace('\n', " ");
    let mut out = format!("| {} |\n", headers.join(" | "));
    out.push_str(&format!(
        "|{}\n",
        headers.iter().map(|_| " --- |").collect::<String>()
    ));
    for row in rows {
        let cells: Vec<String> = row.iter().map(|c| escape(c)).collect();
        out.push_str(&format!("| {} |\n", cells.join(" | ")));
    }
    out
}

const TRANSACTION_HEADERS: &[&str] = &["id", "date", "type", "category", "amount", "note"];

fn transaction_cells(t: &Transaction) -> Vec<String> {
    vec![
        t.id().to_string(),
        t.date().with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        t.r#type().to_string(),
        t.category().to_string(),
        t.amount().plain(),
        t.note().unwrap_or_default().to_string(),
    ]
}

/// Loads every transaction and keeps those inside `window`.
async fn load_window(config: &Config, window: Window) -> Result<Vec<Transaction>> {
    let all = config
        .db()
        .get_all()
        .await
        .context("Unable to read transactions")?;
    Ok(query::filter_by_window_local(
        &all,
        window,
        config.week_start(),
    ))
}

// =============================================================================
// Command implementations
// =============================================================================

/// Shows the transaction with the given id as JSON.
///
/// # Errors
/// - Returns a `StoreError::NotFound` if there is no such transaction.
pub async fn get(config: Config, args: GetArgs) -> Result<Out<Rows>> {
    let transaction = config
        .db()
        .get(&args.id)
        .await?
        .ok_or_else(|| StoreError::NotFound(args.id.clone()))?;
    let json = serde_json::to_value(&transaction).context("Unable to serialize transaction")?;
    Ok(Out::new(format!("Found transaction {}", args.id), Rows::Json(json)))
}

/// Lists transactions, newest first. When both `--type` and `--category` are given only
/// transactions matching both are listed.
pub async fn list(config: Config, args: ListArgs) -> Result<Out<Rows>> {
    let mut transactions = load_window(&config, args.window).await?;
    if let Some(r#type) = args.r#type {
        transactions = query::filter_by_type(&transactions, r#type);
    }
    if let Some(category) = &args.category {
        transactions = query::filter_by_category(&transactions, category);
    }

    let rows = Rows::build(
        args.format,
        TRANSACTION_HEADERS,
        &transactions,
        transaction_cells,
    )?;
    let message = format!(
        "Found {} transaction(s) in window '{}'",
        transactions.len(),
        args.window
    );
    Ok(Out::new(message, rows))
}

/// Totals income and expenses for the transactions in a window.
pub async fn summary(config: Config, args: SummaryArgs) -> Result<Out<Summary>> {
    let transactions = load_window(&config, args.window).await?;
    let summary = query::summarize(&transactions);
    let currency = config.currency();
    let message = format!(
        "Window '{}': income {currency} {}, expenses {currency} {}, balance {currency} {}",
        args.window,
        format_money(summary.total_income),
        format_money(summary.total_expenses),
        format_money(summary.balance),
    );
    Ok(Out::new(message, summary))
}

/// Splits the income or expenses in a window by category, largest first.
pub async fn breakdown(config: Config, args: BreakdownArgs) -> Result<Out<Rows>> {
    let transactions = load_window(&config, args.window).await?;
    let shares = query::category_breakdown(&transactions, args.r#type);
    let rows = Rows::build(
        args.format,
        &["category", "amount", "percentage"],
        &shares,
        |s: &CategoryShare| {
            vec![
                s.category.clone(),
                format_money(s.amount),
                format!("{:.1}", s.percentage),
            ]
        },
    )?;
    let message = format!(
        "{} {} categor{} in window '{}'",
        shares.len(),
        args.r#type,
        if shares.len() == 1 { "y" } else { "ies" },
        args.window
    );
    Ok(Out::new(message, rows))
}
