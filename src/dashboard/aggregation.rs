//! Pure aggregation helpers behind the dashboard cards and charts.

use std::collections::HashMap;

use time::Date;

use crate::charts::{ChartEntry, UNCATEGORISED_LABEL, format_month_labels};

/// Aggregates signed entry amounts by month.
///
/// # Returns
/// HashMap mapping each month (as Date with day=1) to the net amount.
pub(super) fn aggregate_net_by_month(entries: &[ChartEntry]) -> HashMap<Date, f64> {
    let mut totals = HashMap::new();

    for entry in entries {
        // The first of the month is always a valid date, so this cannot fail.
        let month = entry.date.replace_day(1).unwrap();
        *totals.entry(month).or_insert(0.0) += entry.amount;
    }

    totals
}

/// Converts monthly net totals into sorted labels and values for charting.
pub(super) fn get_monthly_label_and_value_pairs(
    monthly_totals: &HashMap<Date, f64>,
) -> (Vec<String>, Vec<f64>) {
    let mut sorted_months: Vec<Date> = monthly_totals.keys().copied().collect();
    sorted_months.sort();

    let labels = format_month_labels(&sorted_months);
    let values = sorted_months
        .iter()
        .map(|month| monthly_totals[month])
        .collect();

    (labels, values)
}

/// The total income and total expenses within `month`, both as positive
/// numbers.
pub(super) fn month_income_and_expense(entries: &[ChartEntry], month: Date) -> (f64, f64) {
    let mut income = 0.0;
    let mut expense = 0.0;

    for entry in entries {
        // The first of the month is always a valid date, so this cannot fail.
        if entry.date.replace_day(1).unwrap() != month {
            continue;
        }

        if entry.amount >= 0.0 {
            income += entry.amount;
        } else {
            expense -= entry.amount;
        }
    }

    (income, expense)
}

/// The total spent per category within `month`, as positive numbers sorted
/// from highest to lowest spend, with the uncategorised bucket last.
pub(super) fn month_expenses_by_category(
    entries: &[ChartEntry],
    month: Date,
) -> Vec<(String, f64)> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for entry in entries {
        // The first of the month is always a valid date, so this cannot fail.
        if entry.amount >= 0.0 || entry.date.replace_day(1).unwrap() != month {
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
