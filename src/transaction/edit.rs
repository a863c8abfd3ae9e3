//! Transaction editing page and endpoint.

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
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    transaction::{Transaction, TransactionId, TransactionKind, get_transaction,
        update_transaction},
    trip::{Trip, TripId, get_all_trips},
};

/// The state needed for the edit transaction page.
#[derive(Debug, Clone)]
pub struct EditTransactionPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for updating a transaction.
#[derive(Debug, Clone)]
pub struct UpdateTransactionEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateTransactionEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for updating a transaction.
#[derive(Debug, Deserialize)]
pub struct EditTransactionFormData {
    pub kind: String,
    pub amount: f64,
    pub currency: String,
    pub date: Date,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub trip_id: Option<TripId>,
}

/// Render the transaction editing page.
pub async fn get_edit_transaction_page(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<EditTransactionPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transaction = match get_transaction(transaction_id, &connection) {
        Ok(transaction) => transaction,
        Err(Error::NotFound) => return Err(Error::NotFound),
        Err(error) => {
            tracing::error!("Failed to retrieve transaction {transaction_id}: {error}");
            return Err(error);
        }
    };

    let categories = get_all_categories(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve categories: {error}"))?;
    let trips = get_all_trips(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve trips: {error}"))?;

    Ok(edit_transaction_view(&transaction, &categories, &trips).into_response())
}

/// Handle transaction update form submission.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<UpdateTransactionEndpointState>,
    Form(form_data): Form<EditTransactionFormData>,
) -> Response {
    let kind: TransactionKind = match form_data.kind.parse() {
        Ok(kind) => kind,
        Err(error) => return error.into_alert_response(),
    };

    let currency = match CurrencyCode::new(&form_data.currency) {
        Ok(currency) => currency,
        Err(error) => return error.into_alert_response(),
    };

    let builder = Transaction::build(
        kind,
        form_data.amount,
        currency,
        form_data.date,
        &form_data.description,
    )
    .category_id(form_data.category_id)
    .trip_id(form_data.trip_id);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_transaction(transaction_id, builder, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating transaction {transaction_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

fn edit_transaction_view(
    transaction: &Transaction,
    categories: &[Category],
    trips: &[Trip],
) -> Markup {
    let edit_endpoint = endpoints::format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_TRANSACTION, transaction.id);
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
                        option
                            value=(kind.as_str())
                            selected[kind == transaction.kind]
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
                    value=(transaction.amount)
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
                    value=(transaction.currency)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    id="date"
                    type="date"
                    name="date"
                    value=(transaction.date)
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
                    value=(transaction.description)
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
                            selected[Some(category.id) == transaction.category_id]
                        {
                            (category.name)
                        }
                    }
                }
            }

            div
            {
                label for="trip_id" class=(FORM_LABEL_STYLE) { "Trip" }

                select id="trip_id" name="trip_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "None" }

                    @for trip in trips {
                        option
                            value=(trip.id)
                            selected[Some(trip.id) == transaction.trip_id]
                        {
                            (trip.name)
                        }
                    }
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update Transaction" }
        }
    };

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Edit Transaction", &[], &content)
}
