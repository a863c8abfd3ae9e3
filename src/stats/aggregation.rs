//! Pure aggregation helpers behind the statistics charts.

use std::collections::HashMap;

use time::Date;

use crate::charts::{ChartEntry, UNCATEGORISED_LABEL};

/// The total income and total expenses per month, both as positive numbers,
/// aligned with `sorted_months`.
pub(super) fn monthly_income_expense_series(
    entries: &[ChartEntry],
    sorted_months: &[Date],
) -> (Vec<f64>, Vec<f64>) {
    let mut income: HashMap<Date, f64> = HashMap::new();
    let mut expense: HashMap<Date, f64> = HashMap::new();

    for entry in entries {
        // The first of the month is always a valid date, so this cannot fail.
        let month = entry.date.replace_day(1).unwrap();

        if entry.amount >= 0.0 {
            *income.entry(month).or_insert(0.0) += entry.amount;
        } else {
            *expense.entry(month).or_insert(0.0) -= entry.amount;
        }
    }

    let income_series = sorted_months
        .iter()
        .map(|month| income.get(month).copied().unwrap_or(0.0))
        .collect();
    let expense_series = sorted_months
        .iter()
        .map(|month| expense.get(month).copied().unwrap_or(0.0))
        .collect();

    (income_series, expense_series)
}

/// The total spent per category across all entries, as positive numbers
/// sorted from highest to lowest spend, with the uncategorised bucket last.
pub(super) fn total_expenses_by_category(entries: &[ChartEntry]) -> Vec<(String, f64)> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for entry in entries {
        if entry.amount >= 0.0 {
            continue;
        }

        *totals.entry(entry.category.as_str()).or_insert(0.0) -= entry.amount;
    }

    let uncategorised = totals.remove(UNCATEGORISED_LABEL);

    let mut sorted: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(category, total)| (category.to_owned(), total))
        .collect();
    sorted.sort_by(|(_, a), (_, b)| b.total_cmp(a));

    if let Some(total) = uncategorised {
        sorted.push((UNCATEGORISED_LABEL.to_owned(), total));
    }

    sorted
}

/// Expenses per category for two months side by side.
///
/// Returns `(category, first_month_total, second_month_total)` rows covering
/// every category with spending in either month, sorted by the second month's
/// spend from highest to lowest, with the uncategorised bucket last.
pub(super) fn month_on_month_expenses(
    entries: &[ChartEntry],
    first_month: Date,
    second_month: Date,
) -> Vec<(String, f64, f64)> {
    let mut first: HashMap<&str, f64> = HashMap::new();
    let mut second: HashMap<&str, f64> = HashMap::new();

    for entry in entries {
        if entry.amount >= 0.0 {
            continue;
        }

        // The first of the month is always a valid date, so this cannot fail.
        let month = entry.date.replace_day(1).unwrap();

        let bucket = if month == first_month {
            &mut first
        } else if month == second_month {
            &mut second
        } else {
            continue;
        };

        *bucket.entry(entry.category.as_str()).or_insert(0.0) -= entry.amount;
    }

    let mut categories: Vec<&str> = first.keys().chain(second.keys()).copied().collect();
    categories.sort_unstable();
    categories.dedup();

    let mut rows: Vec<(String, f64, f64)> = categories
        .into_iter()
        .map(|category| {
            (
                category.to_owned(),
                first.get(category).copied().unwrap_or(0.0),
                second.get(category).copied().unwrap_or(0.0),
            )
        })
        .collect();

    rows.sort_by(|a, b| {
        (a.0 == UNCATEGORISED_LABEL)
            .cmp(&(b.0 == UNCATEGORISED_LABEL))
            .then(b.2.total_cmp(&a.2))
            .then(b.1.total_cmp(&a.1))
    });

    rows
}

/// Total income and total expenses for the given calendar year, both as
/// positive numbers.
pub(super) fn annual_totals(entries: &[ChartEntry], year: i32) -> (f64, f64) {
    let mut income = 0.0;
    let mut expenses = 0.0;

    for entry in entries.iter().filter(|entry| entry.date.year() == year) {
        if entry.amount >= 0.0 {
            income += entry.amount;
        } else {
            expenses -= entry.amount;
        }
    }

    (income, expenses)
}
