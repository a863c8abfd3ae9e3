//! The page for creating a transaction, including the recurring section.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    category::{Category, get_all_categories},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CHECKBOX_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    recurring::RecurrencePattern,
    timezone::today_in,
    transaction::TransactionKind,
    trip::{Trip, get_all_trips},
};

/// The state needed for the new transaction page.
#[derive(Debug, Clone)]
pub struct NewTransactionPageState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    /// The database connection for accessing categories and trips.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for NewTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the page for creating a transaction.
pub async fn get_new_transaction_page(
    State(state): State<NewTransactionPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let categories = get_all_categories(&connection).inspect_err(|error| {
        tracing::error!("Failed to retrieve categories for new transaction page: {error}")
    })?;

    let trips = get_all_trips(&connection).inspect_err(|error| {
        tracing::error!("Failed to retrieve trips for new transaction page: {error}")
    })?;

    let today = today_in(&state.local_timezone)?;

    Ok(new_transaction_view(today, &categories, &trips).into_response())
}

fn new_transaction_view(today: Date, categories: &[Category], trips: &[Trip]) -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_TRANSACTION_VIEW).into_html();
    let form = new_transaction_form_view(today, categories, trips);

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Create Transaction", &[], &content)
}

fn new_transaction_form_view(today: Date, categories: &[Category], trips: &[Trip]) -> Markup {
    html! {
        // The catch-up dialog is swapped in over the whole form, which keeps
        // the dialog's own forms from nesting inside this one.
        form
            hx-post=(endpoints::POST_TRANSACTION)
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="kind" class=(FORM_LABEL_STYLE) { "Type" }

                select id="kind" name="kind" required class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for kind in TransactionKind::ALL {
                        option value=(kind.as_str()) { (kind.as_str()) }
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
                    placeholder="0.00"
                    required
                    autofocus
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
                    placeholder="EUR"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE)
                {
                    "Date (first occurrence for recurring transactions)"
                }

                // No max attribute: for a recurring transaction this date is
                // the anchor, which may lie in the future.
                input
                    id="date"
                    type="date"
                    name="date"
                    value=(today)
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
                    placeholder="Description"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="category_id" class=(FORM_LABEL_STYLE) { "Category" }

                select id="category_id" name="category_id" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "None" }

                    @for category in categories {
                        option value=(category.id) { (category.name) }
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
                        option value=(trip.id) { (trip.name) }
                    }
                }
            }

            fieldset class="space-y-4 border rounded p-4 dark:border-gray-600"
            {
                legend class=(FORM_LABEL_STYLE) { "Repeats" }

                div class="flex items-center gap-2"
                {
                    input
                        id="is_recurring"
                        type="checkbox"
                        name="is_recurring"
                        value="true"
                        class=(FORM_CHECKBOX_STYLE);

                    label for="is_recurring" class=(FORM_LABEL_STYLE)
                    {
                        "This transaction repeats"
                    }
                }

                div
                {
                    label for="pattern" class=(FORM_LABEL_STYLE) { "Repeats every" }

                    select id="pattern" name="pattern" class=(FORM_TEXT_INPUT_STYLE)
                    {
                        @for pattern in RecurrencePattern::ALL {
                            option value=(pattern.as_str()) { (pattern.as_str()) }
                        }
                    }
                }

                div
                {
                    label for="end_date" class=(FORM_LABEL_STYLE) { "Ends on (optional)" }

                    input
                        id="end_date"
                        type="date"
                        name="end_date"
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
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Transaction" }
        }
    }
}
