//! Defines the endpoint for creating a transaction.
//!
//! The endpoint accepts both one-off and recurring submissions. A recurring
//! submission whose first occurrence is already due responds with a
//! confirmation dialog offering to backfill the missed transactions; nothing
//! is written until the user picks one of the two choices.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    category::CategoryId,
    currency::CurrencyCode,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, format_amount},
    recurring::{
        PendingOccurrences, RecurrencePattern, RecurringTransaction, RecurringTransactionBuilder,
        backfill_recurring_transaction, create_recurring_transaction, pending_occurrences,
    },
    timezone::today_in,
    transaction::{Transaction, TransactionBuilder, core::create_transaction},
    trip::TripId,
};

/// The state needed to create a transaction.
#[derive(Debug, Clone)]
pub struct CreateTransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for CreateTransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for creating a transaction.
///
/// One flat struct covers both one-off and recurring submissions; it is
/// parsed into [TransactionPayload] before anything touches the database.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// Whether the transaction is an expense or income.
    pub kind: String,
    /// The value of the transaction.
    pub amount: f64,
    /// The currency code for the amount.
    pub currency: String,
    /// The date when the transaction occurred, or the first occurrence for a
    /// recurring transaction.
    pub date: Date,
    /// Text detailing the transaction.
    #[serde(default)]
    pub description: String,
    /// The ID of the category to associate with this transaction.
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// The ID of the trip to associate with this transaction.
    #[serde(default)]
    pub trip_id: Option<TripId>,
    /// Whether the submission describes a recurring series.
    #[serde(default)]
    pub is_recurring: bool,
    /// How often the series repeats.
    #[serde(default)]
    pub pattern: Option<String>,
    /// The date after which no more occurrences are due.
    #[serde(default)]
    pub end_date: Option<Date>,
    /// The maximum number of occurrences before the series expires.
    #[serde(default)]
    pub max_occurrences: Option<u32>,
    /// The user's backfill choice from the catch-up dialog, absent on the
    /// first submission.
    #[serde(default)]
    pub backfill: Option<bool>,
}

/// A validated transaction submission.
enum TransactionPayload {
    /// A one-off transaction.
    Simple(TransactionBuilder),
    /// A recurring series, possibly carrying the user's backfill choice.
    Recurring {
        builder: RecurringTransactionBuilder,
        backfill: Option<bool>,
    },
}

fn parse_transaction_form(form: TransactionForm) -> Result<TransactionPayload, Error> {
    let kind = form.kind.parse()?;
    let currency = CurrencyCode::new(&form.currency)?;

    if form.amount <= 0.0 {
        return Err(Error::NonPositiveAmount(form.amount));
    }

    if form.is_recurring {
        let pattern: RecurrencePattern = form.pattern.unwrap_or_default().parse()?;

        let builder = RecurringTransaction::build(
            kind,
            form.amount,
            currency,
            &form.description,
            pattern,
            Some(form.date),
        )
        .category_id(form.category_id)
        .end_date(form.end_date)
        .max_occurrences(form.max_occurrences);

        Ok(TransactionPayload::Recurring {
            builder,
            backfill: form.backfill,
        })
    } else {
        Ok(TransactionPayload::Simple(
            Transaction::build(kind, form.amount, currency, form.date, &form.description)
                .category_id(form.category_id)
                .trip_id(form.trip_id),
        ))
    }
}

/// A route handler for creating a transaction or recurring series.
///
/// Redirects to the transactions view (one-off) or the recurring view
/// (series) on success. A recurring submission with occurrences already due
/// and no backfill choice yet responds with the catch-up dialog instead.
pub async fn create_transaction_endpoint(
    State(state): State<CreateTransactionState>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let payload = match parse_transaction_form(form) {
        Ok(payload) => payload,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match payload {
        TransactionPayload::Simple(builder) => {
            if let Err(error) = create_transaction(builder, &connection) {
                tracing::error!("could not create transaction: {error}");
                return error.into_alert_response();
            }

            (
                HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        TransactionPayload::Recurring { builder, backfill } => {
            let today = match today_in(&state.local_timezone) {
                Ok(today) => today,
                Err(error) => return error.into_alert_response(),
            };

            create_recurring_series(builder, backfill, today, &connection)
        }
    }
}

fn create_recurring_series(
    builder: RecurringTransactionBuilder,
    backfill: Option<bool>,
    today: Date,
    connection: &Connection,
) -> Response {
    let pending = pending_occurrences(builder.next_execution, builder.pattern, today);

    let backfill = match backfill {
        Some(choice) => choice,
        None if pending.count == 0 => false,
        // Occurrences are already due, so ask the user what to do with them
        // before anything is written.
        None => return catch_up_dialog_view(&builder, &pending).into_response(),
    };

    let series = match create_recurring_transaction(builder, connection) {
        Ok(series) => series,
        Err(error) => {
            tracing::error!("could not create recurring transaction: {error}");
            return error.into_alert_response();
        }
    };

    if backfill {
        if let Err(error) = backfill_recurring_transaction(&series, today, connection) {
            tracing::error!(
                "could not backfill recurring transaction {}: {error}",
                series.id
            );
            return error.into_alert_response();
        }
    }

    (
        HxRedirect(endpoints::RECURRING_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// The dialog asking whether to create the transactions that are already due.
///
/// Rendered in place of the create form. There is deliberately no dismiss
/// button and no click-outside handler; the only ways out are the two
/// choices or leaving the page, which submits nothing.
fn catch_up_dialog_view(
    builder: &RecurringTransactionBuilder,
    pending: &PendingOccurrences,
) -> Markup {
    let hidden_fields = |backfill: bool| {
        html! {
            input type="hidden" name="kind" value=(builder.kind.as_str());
            input type="hidden" name="amount" value=(builder.amount);
            input type="hidden" name="currency" value=(builder.currency);
            @if let Some(anchor) = builder.next_execution {
                input type="hidden" name="date" value=(anchor);
            }
            input type="hidden" name="description" value=(builder.description);
            @if let Some(category_id) = builder.category_id {
                input type="hidden" name="category_id" value=(category_id);
            }
            input type="hidden" name="is_recurring" value="true";
            input type="hidden" name="pattern" value=(builder.pattern.as_str());
            @if let Some(end_date) = builder.end_date {
                input type="hidden" name="end_date" value=(end_date);
            }
            @if let Some(max_occurrences) = builder.max_occurrences {
                input type="hidden" name="max_occurrences" value=(max_occurrences);
            }
            input type="hidden" name="backfill" value=(backfill);
        }
    };

    let occurrence_summary = match (pending.first, pending.last) {
        (Some(first), Some(last)) if first != last => {
            format!("between {first} and {last}")
        }
        (Some(first), _) => format!("on {first}"),
        _ => String::new(),
    };

    html! {
        section
            role="dialog"
            aria-modal="true"
            class="space-y-4 p-4 border rounded bg-white dark:bg-gray-800 dark:border-gray-600"
        {
            h2 class="text-lg font-bold" { "This schedule is already due" }

            p
            {
                "This transaction of "
                (format_amount(builder.amount, &builder.currency))
                " was due "
                (pending.count)
                " time(s) "
                (occurrence_summary)
                ". Should the missed transactions be created?"
            }

            div class="flex flex-col gap-2 md:flex-row"
            {
                form
                    hx-post=(endpoints::POST_TRANSACTION)
                    hx-swap="outerHTML"
                    hx-target-error="#alert-container"
                {
                    (hidden_fields(true))

                    button type="submit" class=(BUTTON_PRIMARY_STYLE)
                    {
                        "Create " (pending.count) " past transaction(s)"
                    }
                }

                form
                    hx-post=(endpoints::POST_TRANSACTION)
                    hx-swap="outerHTML"
                    hx-target-error="#alert-container"
                {
                    (hidden_fields(false))

                    button type="submit" class=(BUTTON_SECONDARY_STYLE)
                    {
                        "Start from the next due date"
                    }
                }
            }
        }
    }
}
