//! Expense reports: totals, category breakdowns and the transaction list for a set of records.
//!
//! A `Report` computes its figures from the records it is given rather than trusting totals
//! computed elsewhere, so it can be produced for any filtered subset.

use crate::model::{format_money, Transaction, TransactionType};
use crate::query::{self, CategoryShare, Summary};
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write;

/// The base filename used when a report has no transactions.
const EMPTY_STEM: &str = "Floos_Report";

/// The earliest and latest `date` among a report's transactions.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub struct Period {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    period: Option<Period>,
    generated_at: DateTime<Utc>,
    summary: Summary,
    income_breakdown: Vec<CategoryShare>,
    expense_breakdown: Vec<CategoryShare>,
    transactions: Vec<Transaction>,
}

impl Report {
    /// Builds a report over `transactions`, keeping them in the order given.
    pub fn new(transactions: Vec<Transaction>, generated_at: DateTime<Utc>) -> Self {
        let period = transactions
            .iter()
            .map(Transaction::date)
            .min()
            .zip(transactions.iter().map(Transaction::date).max())
            .map(|(start, end)| Period { start, end });

        Self {
            period,
            generated_at,
            summary: query::summarize(&transactions),
            income_breakdown: query::category_breakdown(&transactions, TransactionType::Income),
            expense_breakdown: query::category_breakdown(&transactions, TransactionType::Expense),
            transactions,
        }
    }

    pub fn period(&self) -> Option<Period> {
        self.period
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn income_breakdown(&self) -> &[CategoryShare] {
        &self.income_breakdown
    }

    pub fn expense_breakdown(&self) -> &[CategoryShare] {
        &self.expense_breakdown
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The filename without extension, named after the period's dates in `tz`.
    ///
    /// `Floos_Jan5` when every transaction falls on one day, `Floos_Jan5_Feb12` otherwise, and
    /// `Floos_Report` when there are no transactions.
    pub fn file_stem<Tz: TimeZone>(&self, tz: &Tz) -> String {
        let Some(period) = self.period else {
            return EMPTY_STEM.to_string();
        };
        let start = period.start.with_timezone(tz).date_naive();
        let end = period.end.with_timezone(tz).date_naive();
        let short = |d: chrono::NaiveDate| d.format("%b%-d").to_string();
        if start == end {
            format!("Floos_{}", short(start))
        } else {
            format!("Floos_{}_{}", short(start), short(end))
        }
    }

    /// Renders the report as plain text with dates shown in `tz`.
    pub fn render_text<Tz: TimeZone>(&self, tz: &Tz, currency: &str) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let long = |d: DateTime<Utc>| d.with_timezone(tz).format("%B %-d, %Y").to_string();
        let money = |d: Decimal| with_currency(currency, &format_money(d));

        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "Floos Expense Report");
        if let Some(period) = self.period {
            let _ = writeln!(out, "{} - {}", long(period.start), long(period.end));
        }
        let _ = writeln!(out, "Generated on: {}", long(self.generated_at));
        let _ = writeln!(out);

        let _ = writeln!(out, "Summary");
        let _ = writeln!(out, "  Total Income:   {}", money(self.summary.total_income));
        let _ = writeln!(out, "  Total Expenses: {}", money(self.summary.total_expenses));
        let _ = writeln!(out, "  Balance:        {}", money(self.summary.balance));

        for (title, shares) in [
            ("Income by Category", &self.income_breakdown),
            ("Expenses by Category", &self.expense_breakdown),
        ] {
            if shares.is_empty() {
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "{title}");
            for share in shares {
                let percentage = format!("{:.1}", share.percentage);
                let _ = writeln!(
                    out,
                    "  {:<14} {:>18} {:>6}%",
                    share.category,
                    money(share.amount),
                    percentage
                );
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "Transactions ({})", self.transactions.len());
        for t in &self.transactions {
            let _ = write!(
                out,
                "  {}  {:<8} {:<14} {}{}",
                t.date().with_timezone(tz).format("%Y-%m-%d"),
                t.r#type(),
                t.category(),
                t.r#type().sign(),
                t.amount().with_currency(currency)
            );
            if let Some(note) = t.note() {
                let _ = write!(out, "  {note}");
            }
            let _ = writeln!(out);
        }
        out
    }
}

fn with_currency(currency: &str, value: &str) -> String {
    if currency.is_empty() {
        value.to_string()
    } else {
        format!("{currency} {value}")
    }
}
