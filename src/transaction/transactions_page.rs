//! The transactions listing page with its month filter.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, Month};

use crate::{
    AppState, Error,
    category::{CategoryId, CategoryName, get_all_categories},
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, edit_delete_action_links, format_amount,
    },
    navigation::NavBar,
    timezone::today_in,
    transaction::{Transaction, TransactionKind, get_transactions_in_range},
};

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for accessing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query parameters for the transactions page.
#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    /// The month to show, formatted as "YYYY-MM". Defaults to the current month.
    #[serde(default)]
    pub month: Option<String>,
}

/// Render the transactions page for the selected month.
pub async fn get_transactions_page(
    Query(query): Query<TransactionsQuery>,
    State(state): State<TransactionsPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let today = today_in(&state.local_timezone)?;

    // An unparseable month parameter falls back to the current month rather
    // than erroring, since it only ever comes from our own links.
    let (year, month) = query
        .month
        .as_deref()
        .and_then(parse_month_param)
        .unwrap_or((today.year(), today.month()));

    let (start, end) = month_bounds(year, month);
    let transactions = get_transactions_in_range(start, end, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve transactions: {error}"))?;

    let category_names = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect::<HashMap<_, _>>();

    Ok(transactions_view(year, month, &transactions, &category_names).into_response())
}

fn parse_month_param(raw: &str) -> Option<(i32, Month)> {
    let (year, month) = raw.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    let month = Month::try_from(month).ok()?;

    Some((year, month))
}

/// The first and last day of the calendar month.
pub(crate) fn month_bounds(year: i32, month: Month) -> (Date, Date) {
    // Day one and the month's length are always valid days, so this cannot fail.
    let start = Date::from_calendar_date(year, month, 1).unwrap();
    let end = Date::from_calendar_date(year, month, month.length(year)).unwrap();

    (start, end)
}

fn month_link(year: i32, month: Month) -> String {
    format!(
        "{}?month={:04}-{:02}",
        endpoints::TRANSACTIONS_VIEW,
        year,
        u8::from(month)
    )
}

fn transactions_view(
    year: i32,
    month: Month,
    transactions: &[Transaction],
    category_names: &HashMap<CategoryId, CategoryName>,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();

    let (previous_year, previous_month) = match month {
        Month::January => (year - 1, Month::December),
        _ => (year, month.previous()),
    };
    let (next_year, next_month) = match month {
        Month::December => (year + 1, Month::January),
        _ => (year, month.next()),
    };

    let table_row = |transaction: &Transaction| {
        let edit_url =
            endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
        let delete_url =
            endpoints::format_endpoint(endpoints::DELETE_TRANSACTION, transaction.id);
        let signed_amount = match transaction.kind {
            TransactionKind::Expense => -transaction.amount,
            TransactionKind::Income => transaction.amount,
        };
        let category_name = transaction
            .category_id
            .and_then(|category_id| category_names.get(&category_id))
            .map(|name| name.to_string())
            .unwrap_or_default();

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (transaction.date) }

                td class=(TABLE_CELL_STYLE) { (transaction.description) }

                td class=(TABLE_CELL_STYLE) { (category_name) }

                td class=(TABLE_CELL_STYLE)
                {
                    (format_amount(signed_amount, &transaction.currency))
                }

                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        (edit_delete_action_links(
                            &edit_url,
                            &delete_url,
                            "Are you sure you want to delete this transaction?",
                            "closest tr",
                            "delete",
                        ))
                    }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Transactions" }

                    a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                    {
                        "Create Transaction"
                    }
                }

                nav class="flex justify-between items-center"
                {
                    a href=(month_link(previous_year, previous_month)) class=(LINK_STYLE)
                    {
                        "← " (previous_month) " " (previous_year)
                    }

                    h2 class="font-semibold" { (month) " " (year) }

                    a href=(month_link(next_year, next_month)) class=(LINK_STYLE)
                    {
                        (next_month) " " (next_year) " →"
                    }
                }

                section class="dark:bg-gray-800 lg:max-w-5xl lg:w-full lg:mx-auto"
                {
                    table class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for transaction in transactions {
                                (table_row(transaction))
                            }

                            @if transactions.is_empty() {
                                tr
                                {
                                    td
                                        colspan="5"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No transactions in " (month) " " (year) ". "
                                        a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                                        {
                                            "Create one"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Transactions", &[], &content)
}
