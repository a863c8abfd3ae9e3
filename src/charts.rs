//! Shared ECharts plumbing for the dashboard and statistics pages.
//!
//! Each chart is described by an HTML container ID and its ECharts
//! configuration as a JSON string. Pages render the container divs with
//! [charts_view] and initialise them with the script from [charts_script],
//! which handles dark mode and responsive resizing.

use std::collections::{HashMap, HashSet};

use charming::element::{AxisPointer, AxisPointerType, JsFunction, Tooltip, Trigger};
use maud::{Markup, PreEscaped, html};
use rusqlite::Connection;
use time::{Date, Month};

use crate::{
    Error,
    category::get_all_categories,
    currency::{CurrencyCode, convert},
    html::HeadElement,
    transaction::{Transaction, TransactionKind},
};

/// A chart with its HTML container ID and ECharts configuration.
pub(crate) struct ChartPanel {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

/// The bundled ECharts build. Pages must load this before the script from
/// [charts_script] runs.
pub(crate) fn echarts_script_link() -> HeadElement {
    HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned())
}

/// Renders the HTML containers for `charts`.
pub(crate) fn charts_view(charts: &[ChartPanel]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for chart in charts {
                    div
                        id=(chart.id)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}
                }
            }
        }
    )
}

/// Generates the JavaScript that initialises `charts` once the page has
/// loaded.
pub(crate) fn charts_script(charts: &[ChartPanel]) -> HeadElement {
    let script_content = charts
        .iter()
        .map(|chart| {
            format!(
                r#"(function() {{
                    const chartDom = document.getElementById("{}");
                    const chart = echarts.init(chartDom);
                    const option = {};
                    chart.setOption(option);

                    window.addEventListener('resize', chart.resize);

                    const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
                    const updateTheme = () => {{
                        const isDarkMode = darkModeMediaQuery.matches;
                        chart.setTheme(isDarkMode ? 'dark' : 'default');
                    }}
                    darkModeMediaQuery.addEventListener('change', updateTheme);
                    updateTheme();
                }})();"#,
                chart.id, chart.options
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let wrapped_script = format!(
        "document.addEventListener('DOMContentLoaded', function() {{\n{}\n}});",
        script_content
    );

    HeadElement::ScriptSource(PreEscaped(wrapped_script))
}

/// An axis label and tooltip formatter that renders numbers as amounts in
/// `currency`.
pub(crate) fn currency_formatter(currency: &CurrencyCode) -> JsFunction {
    JsFunction::new_with_args(
        "number",
        &format!(
            "const currencyFormatter = new Intl.NumberFormat('en-US', {{
              style: 'currency',
              currency: '{}'
            }});
            return (number) ? currencyFormatter.format(number) : \"-\";",
            currency.as_ref()
        ),
    )
}

/// A tooltip configuration for axis-based charts with currency values.
pub(crate) fn currency_tooltip(currency: &CurrencyCode) -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Axis)
        .value_formatter(currency_formatter(currency))
        .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow))
}

/// A tooltip configuration for charts without axes, e.g. pie charts.
pub(crate) fn item_currency_tooltip(currency: &CurrencyCode) -> Tooltip {
    Tooltip::new()
        .trigger(Trigger::Item)
        .value_formatter(currency_formatter(currency))
}

/// A transaction reduced to what the charts need: a signed amount already
/// converted into the user's preferred currency.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ChartEntry {
    /// Income is positive, expenses are negative.
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// The category name, or [UNCATEGORISED_LABEL].
    pub category: String,
}

/// The series label for entries without a category.
pub(crate) const UNCATEGORISED_LABEL: &str = "Uncategorised";

/// Reduce `transactions` to chart entries with signed amounts converted into
/// `preferred_currency`.
///
/// # Errors
/// This function will return a:
/// - [Error::MissingExchangeRate] if a transaction's currency cannot be
///   converted into the preferred currency,
/// - or [Error::SqlError] if there is an SQL error.
pub(crate) fn chart_entries(
    transactions: &[Transaction],
    preferred_currency: &CurrencyCode,
    connection: &Connection,
) -> Result<Vec<ChartEntry>, Error> {
    let category_names = get_all_categories(connection)?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect::<HashMap<_, _>>();

    transactions
        .iter()
        .map(|transaction| {
            let converted = convert(
                transaction.amount,
                &transaction.currency,
                preferred_currency,
                connection,
            )?;
            let amount = match transaction.kind {
                TransactionKind::Income => converted,
                TransactionKind::Expense => -converted,
            };
            let category = transaction
                .category_id
                .and_then(|category_id| category_names.get(&category_id))
                .map_or_else(|| UNCATEGORISED_LABEL.to_owned(), |name| name.to_string());

            Ok(ChartEntry {
                amount,
                date: transaction.date,
                category,
            })
        })
        .collect()
}

/// The first day of the month eleven months before `today`, so that a chart
/// starting there spans twelve calendar months ending in the current one.
pub(crate) fn twelve_month_range_start(today: Date) -> Date {
    let mut year = today.year();
    let mut month = today.month();

    for _ in 0..11 {
        if month == Month::January {
            year -= 1;
        }
        month = month.previous();
    }

    // The first of the month is always a valid date, so this cannot fail.
    Date::from_calendar_date(year, month, 1).unwrap()
}

/// Extracts the unique months from `entries` in chronological order, each as
/// a [Date] with the day set to one.
pub(crate) fn get_sorted_months(entries: &[ChartEntry]) -> Vec<Date> {
    let mut months = HashSet::new();

    for entry in entries {
        // The first of the month is always a valid date, so this cannot fail.
        months.insert(entry.date.replace_day(1).unwrap());
    }

    let mut sorted: Vec<_> = months.into_iter().collect();
    sorted.sort();
    sorted
}

/// Formats month dates as three-letter abbreviations, e.g. "Jan", "Feb".
pub(crate) fn format_month_labels(months: &[Date]) -> Vec<String> {
    let month_to_str = |date: &Date| {
        match date.month() {
            Month::January => "Jan",
            Month::February => "Feb",
            Month::March => "Mar",
            Month::April => "Apr",
            Month::May => "May",
            Month::June => "Jun",
            Month::July => "Jul",
            Month::August => "Aug",
            Month::September => "Sep",
            Month::October => "Oct",
            Month::November => "Nov",
            Month::December => "Dec",
        }
        .to_string()
    };

    months.iter().map(month_to_str).collect()
}
