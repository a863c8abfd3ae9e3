//! Recurring transactions listing page.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, edit_delete_action_links, format_amount,
    },
    navigation::NavBar,
    recurring::{RecurringTransaction, get_all_recurring_transactions},
};

/// The state needed for the recurring transactions page.
#[derive(Debug, Clone)]
pub struct RecurringTransactionsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RecurringTransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the recurring transactions listing page.
pub async fn get_recurring_transactions_page(
    State(state): State<RecurringTransactionsPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let series = get_all_recurring_transactions(&connection).inspect_err(|error| {
        tracing::error!("Failed to retrieve recurring transactions: {error}")
    })?;

    Ok(recurring_transactions_view(&series).into_response())
}

fn recurring_transactions_view(series: &[RecurringTransaction]) -> Markup {
    let nav_bar = NavBar::new(endpoints::RECURRING_VIEW).into_html();

    let table_row = |series: &RecurringTransaction| {
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_RECURRING_VIEW, series.id);
        let delete_url = endpoints::format_endpoint(endpoints::DELETE_RECURRING, series.id);
        let confirm_message = format!(
            "Are you sure you want to delete '{}'? Transactions already created from it are kept.",
            series.description
        );
        let next_execution = series
            .next_execution
            .map(|date| date.to_string())
            .unwrap_or_else(|| "Not scheduled".to_owned());
        let status = if series.active { "Active" } else { "Inactive" };

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (series.description) }

                td class=(TABLE_CELL_STYLE)
                {
                    (format_amount(series.amount, &series.currency))
                }

                td class=(TABLE_CELL_STYLE) { (series.pattern) }

                td class=(TABLE_CELL_STYLE) { (next_execution) }

                td class=(TABLE_CELL_STYLE) { (status) }

                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        (edit_delete_action_links(
                            &edit_url,
                            &delete_url,
                            &confirm_message,
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
                    h1 class="text-xl font-bold" { "Recurring Transactions" }

                    a href=(endpoints::NEW_TRANSACTION_VIEW) class=(LINK_STYLE)
                    {
                        "Create Transaction"
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Repeats" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Next Execution" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for recurring_transaction in series {
                                (table_row(recurring_transaction))
                            }

                            @if series.is_empty() {
                                tr
                                {
                                    td
                                        colspan="6"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No recurring transactions yet. Tick 'This transaction \
                                        repeats' when "
                                        a
                                            href=(endpoints::NEW_TRANSACTION_VIEW)
                                            class=(LINK_STYLE)
                                        {
                                            "creating a transaction"
                                        }
                                        "."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Recurring Transactions", &[], &content)
}

#[cfg(test)]
mod recurring_transactions_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        currency::CurrencyCode,
        db::initialize,
        recurring::{
            RecurrencePattern, RecurringTransaction, create_recurring_transaction,
            get_recurring_transactions_page,
        },
        test_utils::{assert_status_ok, assert_valid_html, parse_html_document},
        transaction::TransactionKind,
    };

    use super::RecurringTransactionsPageState;

    fn get_page_state() -> RecurringTransactionsPageState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        RecurringTransactionsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn render_empty_state() {
        let state = get_page_state();

        let response = get_recurring_transactions_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No recurring transactions yet"));
    }

    #[tokio::test]
    async fn lists_series_with_schedule_details() {
        let state = get_page_state();
        create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                650.0,
                CurrencyCode::new_unchecked("EUR"),
                "Rent",
                RecurrencePattern::Monthly,
                Some(date!(2025 - 11 - 01)),
            ),
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not create test series");

        let response = get_recurring_transactions_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Rent"));
        assert!(text.contains("monthly"));
        assert!(text.contains("2025-11-01"));
        assert!(text.contains("Active"));
    }
}
