//! Recurring transaction editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    category::{Category, CategoryId, get_all_categories},
    currency::CurrencyCode,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CHECKBOX_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    recurring::{
        RecurrencePattern, RecurringTransaction, RecurringTransactionId,
        get_recurring_transaction, update_recurring_transaction,
    },
    transaction::TransactionKind,
};

/// The state needed for the edit recurring transaction page.
#[derive(Debug, Clone)]
pub struct EditRecurringTransactionPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditRecurringTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for updating a recurring transaction.
#[derive(Debug, Clone)]
pub struct UpdateRecurringTransactionEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateRecurringTransactionEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for updating a recurring transaction.
#[derive(Debug, Deserialize)]
pub struct EditRecurringTransactionFormData {
    pub kind: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    pub pattern: String,
    #[serde(default)]
    pub next_execution: Option<Date>,
    #[serde(default)]
    pub end_date: Option<Date>,
    #[serde(default)]
    pub max_occurrences: Option<u32>,
    #[serde(default)]
    pub active: bool,
}

/// Render the recurring transaction editing page.
pub async fn get_edit_recurring_transaction_page(
    Path(recurring_transaction_id): Path<RecurringTransactionId>,
    State(state): State<EditRecurringTransactionPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let series = match get_recurring_transaction(recurring_transaction_id, &connection) {
        Ok(series) => series,
        Err(error) => {
            if error != Error::NotFound {
                tracing::error!(
                    "Failed to retrieve recurring transaction {recurring_transaction_id}: {error}"
                );
            }
            return Err(error);
        }
    };

    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;

    Ok(edit_recurring_transaction_view(&series, &categories).into_response())
}

/// Handle recurring transaction update form submission.
pub async fn update_recurring_transaction_endpoint(
    Path(recurring_transaction_id): Path<RecurringTransactionId>,
    State(state): State<UpdateRecurringTransactionEndpointState>,
    Form(form_data): Form<EditRecurringTransactionFormData>,
) -> Response {
    let kind: TransactionKind = match form_data.kind.parse() {
        Ok(kind) => kind,
        Err(error) => return error.into_alert_response(),
    };

    let currency = match CurrencyCode::new(&form_data.currency) {
        Ok(currency) => currency,
        Err(error) => return error.into_alert_response(),
    };

    let pattern: RecurrencePattern = match form_data.pattern.parse() {
        Ok(pattern) => pattern,
        Err(error) => return error.into_alert_response(),
    };

    let builder = RecurringTransaction::build(
        kind,
        form_data.amount,
        currency,
        &form_data.description,
        pattern,
        form_data.next_execution,
    )
    .category_id(form_data.category_id)
    .end_date(form_data.end_date)
    .max_occurrences(form_data.max_occurrences);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_recurring_transaction(
        recurring_transaction_id,
        builder,
        form_data.active,
        &connection,
    ) {
        Ok(_) => (
            HxRedirect(endpoints::RECURRING_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating recurring transaction \
                {recurring_transaction_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

fn edit_recurring_transaction_view(
    series: &RecurringTransaction,
    categories: &[Category],
) -> Markup {
    let edit_endpoint = endpoints::format_endpoint(endpoints::EDIT_RECURRING_VIEW, series.id);
    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_RECURRING, series.id);
    let nav_bar = NavBar::new(&edit_endpoint).into_html();

    let form = html! {
        form
            hx-put=(update_endpoint)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="kind" class=(FORM_LABEL_STYLE) { "Type" }

                select id="kind" name="kind" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for kind in TransactionKind::ALL {
                        option value=(kind.as_str()) selected[kind == series.kind]
                        {
                            (kind.as_str())
                        }
                    }
                }
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    id="amount"
                    type="number"
                    name="amount"
                    min="0.01"
                    step="0.01"
                    value=(series.amount)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="currency" class=(FORM_LABEL_STYLE) { "Currency" }

                input
                    id="currency"
                    type="text"
                    name="currency"
                    maxlength="3"
                    value=(series.currency)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    id="description"
                    type="text"
                    name="description"
                    value=(series.description)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

                select id="category_id" name="category_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "None" }

                    @for category in categories {
                        option
                            value=(category.id)
                            selected[Some(category.id) == series.category_id]
                        {
                            (category.name)
                        }
                    }
                }
            }

            div
            {
                label for="pattern" class=(FORM_LABEL_STYLE) { "Repeats every" }

                select id="pattern" name="pattern" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for pattern in RecurrencePattern::ALL {
                        option value=(pattern.as_str()) selected[pattern == series.pattern]
                        {
                            (pattern.as_str())
                        }
                    }
                }
            }

            div
            {
                label for="next_execution" class=(FORM_LABEL_STYLE) { "Next execution" }

                input
                    id="next_execution"
                    type="date"
                    name="next_execution"
                    value=[series.next_execution]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="end_date" class=(FORM_LABEL_STYLE) { "Ends on (optional)" }

                input
                    id="end_date"
                    type="date"
                    name="end_date"
                    value=[series.end_date]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="max_occurrences" class=(FORM_LABEL_STYLE)
                {
                    "Maximum occurrences (optional)"
                }

                input
                    id="max_occurrences"
                    type="number"
                    name="max_occurrences"
                    min="1"
                    step="1"
                    value=[series.max_occurrences]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="flex items-center gap-2"
            {
                input
                    id="active"
                    type="checkbox"
                    name="active"
                    value="true"
                    checked[series.active]
                    class=(FORM_CHECKBOX_STYLE);

                label for="active" class=(FORM_LABEL_STYLE) { "Active" }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update Recurring Transaction" }
        }
    };

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Edit Recurring Transaction", &[], &content)
}

#[cfg(test)]
mod edit_recurring_transaction_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use axum_extra::extract::Form;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        currency::CurrencyCode,
        db::initialize,
        endpoints,
        recurring::{
            RecurrencePattern, RecurringTransaction, create_recurring_transaction,
            get_edit_recurring_transaction_page, get_recurring_transaction,
            update_recurring_transaction_endpoint,
        },
        test_utils::{
            assert_form_input_with_value, assert_form_optional_input_with_value,
            assert_form_select, assert_form_submit_button_with_text, assert_hx_endpoint,
            assert_hx_redirect, assert_valid_html, must_get_form, parse_html_document,
        },
        transaction::TransactionKind,
    };

    use super::{
        EditRecurringTransactionFormData, EditRecurringTransactionPageState,
        UpdateRecurringTransactionEndpointState,
    };

    fn get_test_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn create_test_series(connection: &Connection) -> RecurringTransaction {
        create_recurring_transaction(
            RecurringTransaction::build(
                TransactionKind::Expense,
                650.0,
                CurrencyCode::new_unchecked("EUR"),
                "Rent",
                RecurrencePattern::Monthly,
                Some(date!(2025 - 11 - 01)),
            ),
            connection,
        )
        .expect("Could not create test series")
    }

    #[tokio::test]
    async fn get_edit_page_prefills_form() {
        let connection = get_test_db_connection();
        let series = create_test_series(&connection);
        let state = EditRecurringTransactionPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_edit_recurring_transaction_page(Path(series.id), State(state))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &endpoints::format_endpoint(endpoints::PUT_RECURRING, series.id),
            "hx-put",
        );
        assert_form_select(&form, "pattern", &["daily", "weekly", "monthly", "yearly"]);
        assert_form_input_with_value(&form, "amount", "number", "650");
        assert_form_optional_input_with_value(&form, "description", "text", "Rent");
        assert_form_optional_input_with_value(&form, "next_execution", "date", "2025-11-01");
        assert_form_submit_button_with_text(&form, "Update Recurring Transaction");
    }

    #[tokio::test]
    async fn get_edit_page_with_invalid_id_returns_not_found() {
        let state = EditRecurringTransactionPageState {
            db_connection: Arc::new(Mutex::new(get_test_db_connection())),
        };

        let result = get_edit_recurring_transaction_page(Path(999), State(state)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn update_endpoint_succeeds() {
        let connection = get_test_db_connection();
        let series = create_test_series(&connection);
        let state = UpdateRecurringTransactionEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let form = EditRecurringTransactionFormData {
            kind: "expense".to_owned(),
            amount: 700.0,
            currency: "EUR".to_owned(),
            description: "Rent (increased)".to_owned(),
            category_id: None,
            pattern: "monthly".to_owned(),
            next_execution: Some(date!(2025 - 12 - 01)),
            end_date: None,
            max_occurrences: None,
            active: false,
        };

        let response =
            update_recurring_transaction_endpoint(Path(series.id), State(state.clone()), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::RECURRING_VIEW);

        let connection = state.db_connection.lock().unwrap();
        let updated = get_recurring_transaction(series.id, &connection).unwrap();
        assert_eq!(updated.amount, 700.0);
        assert_eq!(updated.next_execution, Some(date!(2025 - 12 - 01)));
        assert!(!updated.active);
    }

    #[tokio::test]
    async fn update_endpoint_rejects_unknown_pattern() {
        let connection = get_test_db_connection();
        let series = create_test_series(&connection);
        let state = UpdateRecurringTransactionEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let form = EditRecurringTransactionFormData {
            kind: "expense".to_owned(),
            amount: 650.0,
            currency: "EUR".to_owned(),
            description: "Rent".to_owned(),
            category_id: None,
            pattern: "fortnightly".to_owned(),
            next_execution: None,
            end_date: None,
            max_occurrences: None,
            active: true,
        };

        let response =
            update_recurring_transaction_endpoint(Path(series.id), State(state), Form(form))
                .await
                .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_endpoint_with_invalid_id_returns_not_found() {
        let state = UpdateRecurringTransactionEndpointState {
            db_connection: Arc::new(Mutex::new(get_test_db_connection())),
        };
        let form = EditRecurringTransactionFormData {
            kind: "expense".to_owned(),
            amount: 1.0,
            currency: "EUR".to_owned(),
            description: String::new(),
            category_id: None,
            pattern: "daily".to_owned(),
            next_execution: None,
            end_date: None,
            max_occurrences: None,
            active: true,
        };

        let response = update_recurring_transaction_endpoint(Path(999), State(state), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
