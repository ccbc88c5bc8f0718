//! Pure functions over slices of transactions: time-window filtering, totals and per-category
//! breakdowns. Nothing here touches the database or mutates its input.

use crate::model::{Transaction, TransactionType};
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, TimeZone, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A time window relative to "now" in some time zone.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    /// From local midnight today through 23:59:59 local time.
    Today,
    /// From local midnight on the most recent start-of-week day.
    Week,
    /// From local midnight on the 1st of the current month.
    Month,
    /// No filtering.
    #[default]
    All,
}

serde_plain::derive_display_from_serialize!(Window);
serde_plain::derive_fromstr_from_deserialize!(Window);

/// Returns the records whose `date` falls inside `window`, keeping their order.
///
/// `now` decides both the current instant and which time zone counts as local. `week_start` is
/// the first day of the week for `Window::Week`.
pub fn filter_by_window<Tz: TimeZone>(
    records: &[Transaction],
    window: Window,
    now: &DateTime<Tz>,
    week_start: Weekday,
) -> Vec<Transaction> {
    let Some((start, end)) = bounds(window, now, week_start) else {
        return records.to_vec();
    };
    records
        .iter()
        .filter(|t| t.date() >= start && end.map_or(true, |end| t.date() <= end))
        .cloned()
        .collect()
}

/// `filter_by_window` using the system's local time zone and clock.
pub fn filter_by_window_local(
    records: &[Transaction],
    window: Window,
    week_start: Weekday,
) -> Vec<Transaction> {
    filter_by_window(records, window, &Local::now(), week_start)
}

/// The start and optional end of `window`, both inclusive. `None` means unbounded.
fn bounds<Tz: TimeZone>(
    window: Window,
    now: &DateTime<Tz>,
    week_start: Weekday,
) -> Option<(DateTime<Utc>, Option<DateTime<Utc>>)> {
    let tz = now.timezone();
    let today = now.date_naive();
    match window {
        Window::All => None,
        Window::Today => Some((
            local_midnight(&tz, today),
            Some(local_end_of_day(&tz, today)?),
        )),
        Window::Week => {
            let back = (7 + today.weekday().num_days_from_sunday()
                - week_start.num_days_from_sunday())
                % 7;
            let first = today.checked_sub_days(Days::new(u64::from(back)))?;
            Some((local_midnight(&tz, first), None))
        }
        Window::Month => {
            let first = today.with_day(1)?;
            Some((local_midnight(&tz, first), None))
        }
    }
}

/// The first instant of `date` in `tz`. When a DST change skips midnight, the first valid hour of
/// the day is used instead.
fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> DateTime<Utc> {
    (0..24)
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

/// 23:59:59 on `date` in `tz`, or one second before the next local midnight if that time does
/// not exist.
fn local_end_of_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let last = date.and_hms_opt(23, 59, 59)?;
    match tz.from_local_datetime(&last).latest() {
        Some(d) => Some(d.with_timezone(&Utc)),
        None => {
            let tomorrow = date.checked_add_days(Days::new(1))?;
            Some(local_midnight(tz, tomorrow) - chrono::Duration::seconds(1))
        }
    }
}

/// Returns the records of one type, keeping their order.
pub fn filter_by_type(records: &[Transaction], r#type: TransactionType) -> Vec<Transaction> {
    records
        .iter()
        .filter(|t| t.r#type() == r#type)
        .cloned()
        .collect()
}

/// Returns the records in one category, keeping their order.
pub fn filter_by_category(records: &[Transaction], category: &str) -> Vec<Transaction> {
    records
        .iter()
        .filter(|t| t.category() == category)
        .cloned()
        .collect()
}

/// Income and expense totals for a set of records.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    /// `total_income - total_expenses`. May be negative.
    pub balance: Decimal,
}

/// Sums the income and expenses in `records`. Sums are exact.
pub fn summarize(records: &[Transaction]) -> Summary {
    let (total_income, total_expenses) =
        records
            .iter()
            .fold((Decimal::ZERO, Decimal::ZERO), |(income, expenses), t| {
                match t.r#type() {
                    TransactionType::Income => (income + t.amount().value(), expenses),
                    TransactionType::Expense => (income, expenses + t.amount().value()),
                }
            });
    Summary {
        total_income,
        total_expenses,
        balance: records.iter().map(Transaction::signed_value).sum(),
    }
}

/// One category's share of the total for a transaction type.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: String,
    pub amount: Decimal,
    /// Percent of the type's total, from 0 to 100.
    pub percentage: Decimal,
}

/// Groups the records of `r#type` by category.
///
/// The result is sorted by amount, largest first. Categories with equal amounts keep the order in
/// which they first appear in `records`. When the total is zero every percentage is zero.
pub fn category_breakdown(records: &[Transaction], r#type: TransactionType) -> Vec<CategoryShare> {
    let mut totals: Vec<(String, Decimal)> = Vec::new();
    for t in records.iter().filter(|t| t.r#type() == r#type) {
        match totals.iter_mut().find(|(c, _)| c == t.category()) {
            Some((_, amount)) => *amount += t.amount().value(),
            None => totals.push((t.category().to_string(), t.amount().value())),
        }
    }

    let total: Decimal = totals.iter().map(|(_, amount)| *amount).sum();
    let hundred = Decimal::ONE_HUNDRED;
    let mut shares: Vec<CategoryShare> = totals
        .into_iter()
        .map(|(category, amount)| CategoryShare {
            percentage: if total.is_zero() {
                Decimal::ZERO
            } else {
                amount * hundred / total
            },
            category,
            amount,
        })
        .collect();

    // Stable, so ties keep first-appearance order.
    shares.sort_by(|a, b| b.amount.cmp(&a.amount));
    shares
}
