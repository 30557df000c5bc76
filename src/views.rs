//! Derived views: pure functions computing summaries and chart series from a
//! transaction snapshot.
//!
//! Every function here is deterministic given a snapshot and, where one is
//! needed, an explicit reference date. Nothing is cached and nothing is
//! mutated, so the views are safe to recompute on every store notification.

use serde::Serialize;
use time::{Date, Month};

use crate::transaction::{Transaction, TransactionType};

/// Totals across a whole snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    /// Sum of the amounts of all income transactions.
    pub total_income: f64,
    /// Sum of the amounts of all expense transactions.
    pub total_expenses: f64,
    /// `total_income - total_expenses`.
    pub balance: f64,
}

/// Compute income, expense, and balance totals for `transactions`.
pub fn summarize(transactions: &[Transaction]) -> Summary {
    let total_income = total_of(transactions, TransactionType::Income);
    let total_expenses = total_of(transactions, TransactionType::Expense);

    Summary {
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
    }
}

fn total_of(transactions: &[Transaction], transaction_type: TransactionType) -> f64 {
    transactions
        .iter()
        .filter(|transaction| transaction.transaction_type == transaction_type)
        .map(|transaction| transaction.amount)
        .sum()
}

/// Income and expense totals for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyTotals {
    /// Day of the month, starting at 1.
    pub day: u8,
    /// Sum of income amounts dated this day.
    pub income: f64,
    /// Sum of expense amounts dated this day.
    pub expense: f64,
}

/// One bucket per calendar day of the month containing `reference`, each
/// summing the income and expense amounts of transactions dated that day.
///
/// Transactions outside the month are ignored.
pub fn daily_totals(transactions: &[Transaction], reference: Date) -> Vec<DailyTotals> {
    let year = reference.year();
    let month = reference.month();
    let day_count = month.length(year);

    let mut buckets: Vec<DailyTotals> = (1..=day_count)
        .map(|day| DailyTotals {
            day,
            income: 0.0,
            expense: 0.0,
        })
        .collect();

    for transaction in transactions {
        if transaction.date.year() != year || transaction.date.month() != month {
            continue;
        }

        let bucket = &mut buckets[usize::from(transaction.date.day()) - 1];
        match transaction.transaction_type {
            TransactionType::Income => bucket.income += transaction.amount,
            TransactionType::Expense => bucket.expense += transaction.amount,
        }
    }

    buckets
}

/// For expense transactions only: per-category sums, sorted by descending
/// sum.
pub fn expense_breakdown(transactions: &[Transaction]) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = Vec::new();

    for transaction in transactions {
        if transaction.transaction_type != TransactionType::Expense {
            continue;
        }

        match totals
            .iter_mut()
            .find(|(category, _)| *category == transaction.category)
        {
            Some((_, total)) => *total += transaction.amount,
            None => totals.push((transaction.category.clone(), transaction.amount)),
        }
    }

    totals.sort_by(|(_, a), (_, b)| b.total_cmp(a));

    totals
}

/// Income and expense totals for one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyTotals {
    /// The bucket's calendar year.
    pub year: i32,
    /// The bucket's calendar month.
    pub month: Month,
    /// Sum of income amounts dated within the month.
    pub income: f64,
    /// Sum of expense amounts dated within the month.
    pub expense: f64,
}

/// Six monthly buckets, oldest first: the month containing `reference` and
/// the five months before it.
///
/// A transaction lands in the bucket whose calendar month its `date` falls
/// in; the month difference is computed directly from year and month, so
/// buckets are correct across year boundaries.
pub fn monthly_trend(transactions: &[Transaction], reference: Date) -> Vec<MonthlyTotals> {
    const BUCKET_COUNT: i32 = 6;

    let newest = month_ordinal(reference.year(), reference.month());
    let oldest = newest - (BUCKET_COUNT - 1);

    let mut buckets: Vec<MonthlyTotals> = (0..BUCKET_COUNT)
        .map(|offset| {
            let (year, month) = month_from_ordinal(oldest + offset);
            MonthlyTotals {
                year,
                month,
                income: 0.0,
                expense: 0.0,
            }
        })
        .collect();

    for transaction in transactions {
        let ordinal = month_ordinal(transaction.date.year(), transaction.date.month());
        let index = ordinal - oldest;
        if !(0..BUCKET_COUNT).contains(&index) {
            continue;
        }

        let bucket = &mut buckets[index as usize];
        match transaction.transaction_type {
            TransactionType::Income => bucket.income += transaction.amount,
            TransactionType::Expense => bucket.expense += transaction.amount,
        }
    }

    buckets
}

/// Months since year zero; consecutive calendar months map to consecutive
/// ordinals across year boundaries.
fn month_ordinal(year: i32, month: Month) -> i32 {
    year * 12 + (month as i32 - 1)
}

fn month_from_ordinal(ordinal: i32) -> (i32, Month) {
    let year = ordinal.div_euclid(12);
    let month = Month::try_from((ordinal.rem_euclid(12) + 1) as u8)
        .expect("month index is always in 1..=12");

    (year, month)
}

/// The `count` most-recently-dated transactions, most recent first.
///
/// The sort is stable, so transactions sharing a date keep their snapshot
/// order relative to each other.
pub fn recent_transactions(transactions: &[Transaction], count: usize) -> Vec<Transaction> {
    let mut recent = transactions.to_vec();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(count);

    recent
}
