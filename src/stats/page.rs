//! The statistics page handler and its views.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    datatype::DataPointItem,
    element::{AxisLabel, AxisType},
    series::{Bar, Line, Pie},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::{Date, Duration};

use crate::{
    AppState, Error,
    auth::{UserId, get_user_by_id},
    charts::{
        ChartEntry, ChartPanel, chart_entries, charts_script, charts_view, currency_formatter,
        currency_tooltip, echarts_script_link, format_month_labels, get_sorted_months,
        item_currency_tooltip, twelve_month_range_start,
    },
    currency::{CurrencyCode, convert},
    endpoints,
    html::base,
    navigation::NavBar,
    stats::aggregation::{
        annual_totals, month_on_month_expenses, monthly_income_expense_series,
        total_expenses_by_category,
    },
    timezone::today_in,
    transaction::{TransactionKind, get_transactions_for_trip, get_transactions_in_range, month_bounds},
    trip::get_all_trips,
};

/// The state needed for displaying the statistics page.
#[derive(Debug, Clone)]
pub struct StatsPageState {
    /// The local timezone as a canonical timezone name, e.g. "Europe/Prague".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for StatsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display the statistics page: how income and expenses evolved over the
/// last twelve months, where the money went, how this month compares with
/// the previous one, how the year is tracking, and what each trip cost.
pub async fn get_stats_page(State(state): State<StatsPageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let nav_bar = NavBar::new(endpoints::STATS_VIEW);

    let user = get_user_by_id(UserId::new(1), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve user: {error}"))?;

    let today = today_in(&state.local_timezone)?;

    let start = twelve_month_range_start(today);
    let (_, end) = month_bounds(today.year(), today.month());

    let transactions = get_transactions_in_range(start, end, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve transactions: {error}"))?;

    if transactions.is_empty() {
        return Ok(stats_no_data_view(nav_bar).into_response());
    }

    let entries = match chart_entries(&transactions, &user.preferred_currency, &connection) {
        Ok(entries) => entries,
        Err(Error::MissingExchangeRate { base, quote }) => {
            return Ok(missing_rate_view(nav_bar, &base, &quote).into_response());
        }
        Err(error) => {
            tracing::error!("Failed to prepare chart data: {error}");
            return Err(error);
        }
    };

    let trip_totals = match trip_spending(&user.preferred_currency, &connection) {
        Ok(totals) => totals,
        Err(Error::MissingExchangeRate { base, quote }) => {
            return Ok(missing_rate_view(nav_bar, &base, &quote).into_response());
        }
        Err(error) => {
            tracing::error!("Failed to compute trip spending: {error}");
            return Err(error);
        }
    };

    let mut charts = vec![
        ChartPanel {
            id: "income-expense-chart",
            options: income_expense_chart(&entries, &user.preferred_currency).to_string(),
        },
        ChartPanel {
            id: "category-pie-chart",
            options: category_pie_chart(&entries, &user.preferred_currency).to_string(),
        },
        ChartPanel {
            id: "monthly-comparison-chart",
            options: monthly_comparison_chart(&entries, today, &user.preferred_currency)
                .to_string(),
        },
        ChartPanel {
            id: "annual-summary-chart",
            options: annual_summary_chart(&entries, today.year(), &user.preferred_currency)
                .to_string(),
        },
    ];

    if !trip_totals.is_empty() {
        charts.push(ChartPanel {
            id: "trip-spending-chart",
            options: trip_spending_chart(trip_totals, &user.preferred_currency).to_string(),
        });
    }

    Ok(stats_view(nav_bar, &charts).into_response())
}

/// The net amount spent on each trip, converted into `preferred_currency`,
/// in the order the trips are listed. Trips without transactions are skipped.
fn trip_spending(
    preferred_currency: &CurrencyCode,
    connection: &Connection,
) -> Result<Vec<(String, f64)>, Error> {
    let mut totals = Vec::new();

    for trip in get_all_trips(connection)? {
        let transactions = get_transactions_for_trip(trip.id, connection)?;

        if transactions.is_empty() {
            continue;
        }

        let mut total = 0.0;

        for transaction in &transactions {
            let converted = convert(
                transaction.amount,
                &transaction.currency,
                preferred_currency,
                connection,
            )?;

            // Reimbursements booked against the trip reduce the total spent.
            match transaction.kind {
                TransactionKind::Expense => total += converted,
                TransactionKind::Income => total -= converted,
            }
        }

        totals.push((trip.name, total));
    }

    Ok(totals)
}

/// A line chart of monthly income next to monthly expenses over the last
/// twelve months.
fn income_expense_chart(entries: &[ChartEntry], currency: &CurrencyCode) -> Chart {
    let sorted_months = get_sorted_months(entries);
    let labels = format_month_labels(&sorted_months);
    let (income, expense) = monthly_income_expense_series(entries, &sorted_months);

    Chart::new()
        .title(
            Title::new()
                .text("Income vs expenses")
                .subtext("Last twelve months"),
        )
        .tooltip(currency_tooltip(currency))
        .legend(Legend::new().top("bottom"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("10%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter(currency))),
        )
        .series(Line::new().name("Income").data(income))
        .series(Line::new().name("Expenses").data(expense))
}

/// A pie chart of the total spend per category over the last twelve months.
fn category_pie_chart(entries: &[ChartEntry], currency: &CurrencyCode) -> Chart {
    let data = total_expenses_by_category(entries)
        .into_iter()
        .map(|(category, total)| DataPointItem::new(total).name(category))
        .collect::<Vec<_>>();

    Chart::new()
        .title(
            Title::new()
                .text("Expenses by category")
                .subtext("Last twelve months"),
        )
        .tooltip(item_currency_tooltip(currency))
        .legend(Legend::new().top("bottom"))
        .series(Pie::new().name("Spent").radius(vec!["35%", "65%"]).data(data))
}

/// A grouped bar chart comparing this month's expenses per category with the
/// previous month's.
fn monthly_comparison_chart(entries: &[ChartEntry], today: Date, currency: &CurrencyCode) -> Chart {
    // The first of the month is always a valid date, so this cannot fail.
    let current_month = today.replace_day(1).unwrap();
    let previous_month = (current_month - Duration::days(1)).replace_day(1).unwrap();

    let rows = month_on_month_expenses(entries, previous_month, current_month);
    let month_labels = format_month_labels(&[previous_month, current_month]);

    let mut categories = Vec::with_capacity(rows.len());
    let mut previous_totals = Vec::with_capacity(rows.len());
    let mut current_totals = Vec::with_capacity(rows.len());

    for (category, previous_total, current_total) in rows {
        categories.push(category);
        previous_totals.push(previous_total);
        current_totals.push(current_total);
    }

    Chart::new()
        .title(
            Title::new()
                .text("Month on month")
                .subtext("Expenses by category"),
        )
        .tooltip(currency_tooltip(currency))
        .legend(Legend::new().top("bottom"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("10%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(categories))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter(currency))),
        )
        .series(Bar::new().name(month_labels[0].clone()).data(previous_totals))
        .series(Bar::new().name(month_labels[1].clone()).data(current_totals))
}

/// A bar chart of this calendar year's income, expenses, and what is left
/// over.
fn annual_summary_chart(entries: &[ChartEntry], year: i32, currency: &CurrencyCode) -> Chart {
    let (income, expenses) = annual_totals(entries, year);
    let savings = income - expenses;

    Chart::new()
        .title(
            Title::new()
                .text(format!("{year} so far"))
                .subtext("Income, expenses, and savings"),
        )
        .tooltip(currency_tooltip(currency))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(
            Axis::new()
                .type_(AxisType::Category)
                .data(vec!["Income", "Expenses", "Savings"]),
        )
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter(currency))),
        )
        .series(Bar::new().name("Total").data(vec![income, expenses, savings]))
}

/// A bar chart of the total spent per trip.
fn trip_spending_chart(totals: Vec<(String, f64)>, currency: &CurrencyCode) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) = totals.into_iter().unzip();

    Chart::new()
        .title(Title::new().text("Spending per trip"))
        .tooltip(currency_tooltip(currency))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter(currency))),
        )
        .series(Bar::new().name("Spent").data(values))
}

/// Renders the statistics page when no transaction data exists.
fn stats_no_data_view(nav_bar: NavBar) -> Markup {
    let nav_bar = nav_bar.into_html();
    let new_transaction_link =
        crate::html::link(endpoints::NEW_TRANSACTION_VIEW, "adding a transaction");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Charts will show up here once you record some spending.
                Start by " (new_transaction_link) "."
            }
        }
    );

    base("Stats", &[], &content)
}

/// Renders the statistics page when an amount cannot be converted into the
/// preferred currency.
fn missing_rate_view(nav_bar: NavBar, base_currency: &str, quote_currency: &str) -> Markup {
    let nav_bar = nav_bar.into_html();
    let rates_link = crate::html::link(endpoints::RATES_VIEW, "rates page");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "No exchange rate for " (base_currency) "/" (quote_currency)
            }

            p
            {
                "The statistics convert every amount into your preferred
                currency. Add the missing rate on the " (rates_link) "."
            }
        }
    );

    base("Stats", &[], &content)
}

/// Renders the statistics page with its charts.
fn stats_view(nav_bar: NavBar, charts: &[ChartPanel]) -> Markup {
    let nav_bar = nav_bar.into_html();

    let content = html!(
        (nav_bar)

        div
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            (charts_view(charts))
        }
    );

    let scripts = [echarts_script_link(), charts_script(charts)];

    base("Stats", &scripts, &content)
}

#[cfg(test)]
mod stats_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        auth::{PasswordHash, create_user},
        currency::CurrencyCode,
        db::initialize,
        test_utils::{assert_valid_html, parse_html_document},
        transaction::{Transaction, TransactionKind, create_transaction},
        trip::{Trip, create_trip},
    };

    use super::{StatsPageState, get_stats_page};

    const TEST_TIMEZONE: &str = "Etc/UTC";

    fn get_page_state() -> StatsPageState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        create_user(PasswordHash::new_unchecked("hunter2"), &connection)
            .expect("Could not create test user");

        StatsPageState {
            local_timezone: TEST_TIMEZONE.to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn eur() -> CurrencyCode {
        CurrencyCode::new_unchecked("EUR")
    }

    fn create_expense_today(state: &StatsPageState, amount: f64) {
        let today = OffsetDateTime::now_utc().date();

        create_transaction(
            Transaction::build(TransactionKind::Expense, amount, eur(), today, "Test"),
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not create test transaction");
    }

    #[tokio::test]
    async fn shows_empty_state_without_transactions() {
        let state = get_page_state();

        let response = get_stats_page(State(state))
            .await
            .expect("Could not get stats page");
        let html = parse_html_document(response).await;

        assert_valid_html(&html);
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Nothing here yet"));
    }

    #[tokio::test]
    async fn renders_overview_comparison_and_annual_charts() {
        let state = get_page_state();
        create_expense_today(&state, 25.0);

        let response = get_stats_page(State(state))
            .await
            .expect("Could not get stats page");
        let html = parse_html_document(response).await;

        assert_valid_html(&html);

        for chart_id in [
            "#income-expense-chart",
            "#category-pie-chart",
            "#monthly-comparison-chart",
            "#annual-summary-chart",
        ] {
            let selector = scraper::Selector::parse(chart_id).expect("Could not parse selector");
            assert_eq!(
                html.select(&selector).count(),
                1,
                "expected exactly one {chart_id} container"
            );
        }

        // No trips, so no trip chart.
        let trip_selector =
            scraper::Selector::parse("#trip-spending-chart").expect("Could not parse selector");
        assert_eq!(html.select(&trip_selector).count(), 0);
    }

    #[tokio::test]
    async fn renders_trip_chart_when_a_trip_has_transactions() {
        let state = get_page_state();
        let today = OffsetDateTime::now_utc().date();

        let trip = create_trip(
            Trip::build(
                "Prague semester",
                "Prague, Czech Republic",
                today - Duration::days(7),
                today + Duration::days(7),
                eur(),
            ),
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not create test trip");

        create_transaction(
            Transaction::build(TransactionKind::Expense, 80.0, eur(), today, "Hostel")
                .trip_id(Some(trip.id)),
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not create test transaction");

        let response = get_stats_page(State(state))
            .await
            .expect("Could not get stats page");
        let html = parse_html_document(response).await;

        let selector =
            scraper::Selector::parse("#trip-spending-chart").expect("Could not parse selector");
        assert_eq!(html.select(&selector).count(), 1);
    }

    #[tokio::test]
    async fn shows_missing_rate_hint() {
        let state = get_page_state();
        let today = OffsetDateTime::now_utc().date();
        create_transaction(
            Transaction::build(
                TransactionKind::Expense,
                100.0,
                CurrencyCode::new_unchecked("CZK"),
                today,
                "Lunch",
            ),
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not create test transaction");

        let response = get_stats_page(State(state))
            .await
            .expect("Could not get stats page");
        let html = parse_html_document(response).await;

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No exchange rate for CZK/EUR"), "got: {text}");
    }
}
