//! Budgets listing page with the spent amount and progress per month.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::{UserId, get_user_by_id},
    budget::{Budget, get_all_budgets},
    currency::{CurrencyCode, convert},
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, edit_delete_action_links, format_amount,
    },
    navigation::NavBar,
    transaction::{TransactionKind, get_transactions_in_range, month_bounds},
};

/// The state needed for the budgets page.
#[derive(Debug, Clone)]
pub struct BudgetsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The amount spent in a budget's month, in the preferred currency, or the
/// pair a rate is missing for.
enum SpentAmount {
    Converted(f64),
    MissingRate { base: String, quote: String },
}

/// Render the budgets listing page.
pub async fn get_budgets_page(State(state): State<BudgetsPageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(1), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve user: {error}"))?;

    let budgets = get_all_budgets(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve budgets: {error}"))?;

    let mut rows = Vec::with_capacity(budgets.len());

    for budget in budgets {
        let spent = month_spending(&budget, &user.preferred_currency, &connection)?;
        rows.push((budget, spent));
    }

    Ok(budgets_view(&rows, &user.preferred_currency).into_response())
}

/// Sum the month's expenses converted into the preferred currency.
fn month_spending(
    budget: &Budget,
    preferred_currency: &CurrencyCode,
    connection: &Connection,
) -> Result<SpentAmount, Error> {
    let (start, end) = month_bounds(budget.year, budget.month);
    let transactions = get_transactions_in_range(start, end, connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve transactions: {error}"))?;

    let mut total = 0.0;

    for transaction in transactions {
        if transaction.kind != TransactionKind::Expense {
            continue;
        }

        match convert(
            transaction.amount,
            &transaction.currency,
            preferred_currency,
            connection,
        ) {
            Ok(converted) => total += converted,
            Err(Error::MissingExchangeRate { base, quote }) => {
                return Ok(SpentAmount::MissingRate { base, quote });
            }
            Err(error) => return Err(error),
        }
    }

    Ok(SpentAmount::Converted(total))
}

fn budgets_view(budgets: &[(Budget, SpentAmount)], preferred_currency: &CurrencyCode) -> Markup {
    let nav_bar = NavBar::new(endpoints::BUDGETS_VIEW).into_html();

    let table_row = |budget: &Budget, spent: &SpentAmount| {
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_BUDGET_VIEW, budget.id);
        let delete_url = endpoints::format_endpoint(endpoints::DELETE_BUDGET, budget.id);
        let confirm_message = format!(
            "Are you sure you want to delete the budget for {} {}?",
            budget.month, budget.year
        );

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (budget.month) " " (budget.year) }

                td class=(TABLE_CELL_STYLE)
                {
                    (format_amount(budget.max_spending, preferred_currency))
                }

                @match spent {
                    SpentAmount::Converted(spent) => {
                        td class=(TABLE_CELL_STYLE)
                        {
                            (format_amount(*spent, preferred_currency))
                        }

                        td class=(TABLE_CELL_STYLE)
                        {
                            (progress_bar(*spent, budget))
                        }
                    }
                    SpentAmount::MissingRate { base, quote } => {
                        td class=(TABLE_CELL_STYLE) colspan="2"
                        {
                            "No exchange rate for " (base) "/" (quote) ". "
                            a href=(endpoints::RATES_VIEW) class=(LINK_STYLE) { "Add a rate" }
                        }
                    }
                }

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
                    h1 class="text-xl font-bold" { "Budgets" }

                    a href=(endpoints::NEW_BUDGET_VIEW) class=(LINK_STYLE)
                    {
                        "Create Budget"
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Month" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Budget" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Spent" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Progress" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for (budget, spent) in budgets {
                                (table_row(budget, spent))
                            }

                            @if budgets.is_empty() {
                                tr
                                {
                                    td
                                        colspan="5"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No budgets yet. "
                                        a href=(endpoints::NEW_BUDGET_VIEW) class=(LINK_STYLE)
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

    base("Budgets", &[], &content)
}

fn progress_bar(spent: f64, budget: &Budget) -> Markup {
    let percent = spent / budget.max_spending * 100.0;
    let width = percent.clamp(0.0, 100.0);

    let over_warning_threshold = budget
        .warning_threshold
        .is_some_and(|threshold| percent >= threshold);

    let bar_color = if percent >= 100.0 {
        "bg-red-600"
    } else if over_warning_threshold {
        "bg-yellow-400"
    } else {
        "bg-blue-600"
    };

    html!(
        div class="w-full bg-gray-200 rounded-full h-2.5 dark:bg-gray-700"
        {
            div
                class=(format!("{bar_color} h-2.5 rounded-full"))
                style=(format!("width: {width:.0}%")) {}
        }

        span class="text-xs" { (format!("{percent:.0}%")) }
    )
}

#[cfg(test)]
mod budgets_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;
    use time::{Month, macros::date};

    use crate::{
        auth::{PasswordHash, create_user},
        budget::{Budget, create_budget, get_budgets_page},
        currency::CurrencyCode,
        db::initialize,
        test_utils::{assert_status_ok, assert_valid_html, parse_html_document},
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::BudgetsPageState;

    fn get_page_state() -> BudgetsPageState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        create_user(PasswordHash::new_unchecked("hunter2"), &connection)
            .expect("Could not create test user");

        BudgetsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn render_empty_state() {
        let state = get_page_state();

        let response = get_budgets_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No budgets yet"));
    }

    #[tokio::test]
    async fn lists_budgets_with_spent_amount_and_progress() {
        let state = get_page_state();
        {
            let connection = state.db_connection.lock().unwrap();
            create_budget(Budget::build(Month::September, 2025, 800.0), &connection).unwrap();
            create_transaction(
                Transaction::build(
                    TransactionKind::Expense,
                    200.0,
                    CurrencyCode::new_unchecked("EUR"),
                    date!(2025 - 09 - 10),
                    "Rent",
                ),
                &connection,
            )
            .unwrap();
            // Income must not count towards the budget.
            create_transaction(
                Transaction::build(
                    TransactionKind::Income,
                    500.0,
                    CurrencyCode::new_unchecked("EUR"),
                    date!(2025 - 09 - 15),
                    "Scholarship",
                ),
                &connection,
            )
            .unwrap();
            // Outside the budget month.
            create_transaction(
                Transaction::build(
                    TransactionKind::Expense,
                    100.0,
                    CurrencyCode::new_unchecked("EUR"),
                    date!(2025 - 10 - 01),
                    "Groceries",
                ),
                &connection,
            )
            .unwrap();
        }

        let response = get_budgets_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("September 2025"));
        assert!(text.contains("€800.00"));
        assert!(text.contains("€200.00"));
        assert!(text.contains("25%"));
    }

    #[tokio::test]
    async fn missing_rate_shows_hint_instead_of_spent_amount() {
        let state = get_page_state();
        {
            let connection = state.db_connection.lock().unwrap();
            create_budget(Budget::build(Month::September, 2025, 800.0), &connection).unwrap();
            create_transaction(
                Transaction::build(
                    TransactionKind::Expense,
                    3000.0,
                    CurrencyCode::new_unchecked("CZK"),
                    date!(2025 - 09 - 10),
                    "Rent",
                ),
                &connection,
            )
            .unwrap();
        }

        let response = get_budgets_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No exchange rate for CZK/EUR"));
    }
}
