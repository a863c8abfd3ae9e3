//! The dashboard page handler and its views.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use charming::{
    Chart,
    component::{Axis, Grid, Title, VisualMap, VisualMapPiece},
    element::{AxisLabel, AxisType},
    series::{Bar, Line},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    auth::{UserId, get_user_by_id},
    budget::{Budget, get_budget_for_month},
    charts::{
        ChartEntry, ChartPanel, chart_entries, charts_script, charts_view, currency_formatter,
        currency_tooltip, echarts_script_link, twelve_month_range_start,
    },
    currency::CurrencyCode,
    dashboard::aggregation::{
        aggregate_net_by_month, get_monthly_label_and_value_pairs, month_expenses_by_category,
        month_income_and_expense,
    },
    endpoints,
    html::{LINK_STYLE, base, format_amount, link},
    navigation::NavBar,
    timezone::today_in,
    transaction::{get_transactions_in_range, month_bounds},
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardPageState {
    /// The local timezone as a canonical timezone name, e.g. "Europe/Prague".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Display a page with an overview of the user's data: summary cards for the
/// current month and charts over the last twelve months.
pub async fn get_dashboard_page(State(state): State<DashboardPageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW);

    let user = get_user_by_id(UserId::new(1), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve user: {error}"))?;

    let today = today_in(&state.local_timezone)?;

    let start = twelve_month_range_start(today);
    let (_, end) = month_bounds(today.year(), today.month());

    let transactions = get_transactions_in_range(start, end, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve transactions: {error}"))?;

    if transactions.is_empty() {
        return Ok(dashboard_no_data_view(nav_bar).into_response());
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

    // The first of the month is always a valid date, so this cannot fail.
    let current_month = today.replace_day(1).unwrap();
    let (month_income, month_expense) = month_income_and_expense(&entries, current_month);

    let budget = get_budget_for_month(today.month(), today.year(), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve budget: {error}"))?;

    let cards = summary_cards_view(
        month_income,
        month_expense,
        budget.as_ref(),
        &user.preferred_currency,
    );

    let charts = [
        ChartPanel {
            id: "net-chart",
            options: net_chart(&entries, &user.preferred_currency).to_string(),
        },
        ChartPanel {
            id: "month-expenses-chart",
            options: month_expenses_chart(&entries, current_month, &user.preferred_currency)
                .to_string(),
        },
    ];

    Ok(dashboard_view(nav_bar, cards, &charts).into_response())
}

/// A line chart of the monthly net (income minus expenses) over the last
/// twelve months, coloured green above zero and red below.
fn net_chart(entries: &[ChartEntry], currency: &CurrencyCode) -> Chart {
    let monthly_totals = aggregate_net_by_month(entries);
    let (labels, values) = get_monthly_label_and_value_pairs(&monthly_totals);

    Chart::new()
        .title(Title::new().text("Net income").subtext("Last twelve months"))
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
        .visual_map(VisualMap::new().show(false).pieces(vec![
            VisualMapPiece::new().lte(-1).color("red"),
            VisualMapPiece::new().gte(0).color("green"),
        ]))
        .series(Line::new().name("Net income").data(values))
}

/// A bar chart of the current month's spending per category.
fn month_expenses_chart(entries: &[ChartEntry], month: Date, currency: &CurrencyCode) -> Chart {
    let totals = month_expenses_by_category(entries, month);
    let (labels, values): (Vec<String>, Vec<f64>) = totals.into_iter().unzip();

    Chart::new()
        .title(
            Title::new()
                .text("Expenses by category")
                .subtext("This month"),
        )
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

/// The grid of summary cards for the current month.
fn summary_cards_view(
    month_income: f64,
    month_expense: f64,
    budget: Option<&Budget>,
    currency: &CurrencyCode,
) -> Markup {
    let net = month_income - month_expense;
    let net_colour = if net < 0.0 {
        "text-red-600 dark:text-red-500"
    } else {
        "text-green-600 dark:text-green-500"
    };

    html!(
        section class="w-full mx-auto mt-4 mb-4"
        {
            div class="grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-4 gap-4"
            {
                (summary_card("Income this month", html!(
                    span { (format_amount(month_income, currency)) }
                )))

                (summary_card("Expenses this month", html!(
                    span { (format_amount(month_expense, currency)) }
                )))

                (summary_card("Net this month", html!(
                    span class=(net_colour) { (format_amount(net, currency)) }
                )))

                (summary_card("Budget used", budget_card_body(month_expense, budget, currency)))
            }
        }
    )
}

/// A single summary card with a label and a large value.
fn summary_card(label: &str, body: Markup) -> Markup {
    html!(
        div
            class="bg-white dark:bg-gray-800 border border-gray-200
                dark:border-gray-700 rounded-lg p-4 shadow-md"
        {
            h4 class="text-sm text-gray-600 dark:text-gray-400 mb-2" { (label) }

            div class="text-2xl font-bold" { (body) }
        }
    )
}

/// The body of the budget card: how much of this month's budget is spent, or
/// a prompt to create one.
fn budget_card_body(month_expense: f64, budget: Option<&Budget>, currency: &CurrencyCode) -> Markup {
    match budget {
        Some(budget) => {
            let percent = (month_expense / budget.max_spending * 100.0).round();

            html!(
                span { (percent) "%" }

                span class="block text-sm font-normal text-gray-600 dark:text-gray-400"
                {
                    (format_amount(month_expense, currency))
                    " of "
                    (format_amount(budget.max_spending, currency))
                }
            )
        }
        None => html!(
            span class="text-sm font-normal"
            {
                a href=(endpoints::NEW_BUDGET_VIEW) class=(LINK_STYLE) { "Set a budget" }
            }
        ),
    }
}

/// Renders the dashboard page when no transaction data exists.
fn dashboard_no_data_view(nav_bar: NavBar) -> Markup {
    let nav_bar = nav_bar.into_html();
    let new_transaction_link = link(endpoints::NEW_TRANSACTION_VIEW, "adding a transaction");

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
                "Cards and charts will show up here once you record some
                spending. Start by " (new_transaction_link) "."
            }
        }
    );

    base("Dashboard", &[], &content)
}

/// Renders the dashboard page when an amount cannot be converted into the
/// preferred currency.
fn missing_rate_view(nav_bar: NavBar, base_currency: &str, quote_currency: &str) -> Markup {
    let nav_bar = nav_bar.into_html();
    let rates_link = link(endpoints::RATES_VIEW, "rates page");

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
                "The dashboard converts every amount into your preferred
                currency. Add the missing rate on the " (rates_link) "."
            }
        }
    );

    base("Dashboard", &[], &content)
}

/// Renders the main dashboard page with summary cards and charts.
fn dashboard_view(nav_bar: NavBar, cards: Markup, charts: &[ChartPanel]) -> Markup {
    let nav_bar = nav_bar.into_html();

    let content = html!(
        (nav_bar)

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            (cards)

            (charts_view(charts))
        }
    );

    let scripts = [echarts_script_link(), charts_script(charts)];

    base("Dashboard", &scripts, &content)
}
