//! Trip detail page: the trip's transactions and the total spent converted
//! into the trip currency.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    currency::convert,
    endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_amount,
    },
    navigation::NavBar,
    transaction::{Transaction, TransactionKind, get_transactions_for_trip},
    trip::{Trip, TripId, get_trip},
};

/// The state needed for the trip detail page.
#[derive(Debug, Clone)]
pub struct TripDetailPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TripDetailPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The trip total in the trip currency, or the pair a rate is missing for.
enum TripTotal {
    Converted(f64),
    MissingRate { base: String, quote: String },
}

/// Render the trip detail page.
pub async fn get_trip_detail_page(
    Path(trip_id): Path<TripId>,
    State(state): State<TripDetailPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let trip = match get_trip(trip_id, &connection) {
        Ok(trip) => trip,
        Err(error) => {
            if error != Error::NotFound {
                tracing::error!("Failed to retrieve trip {trip_id}: {error}");
            }
            return Err(error);
        }
    };

    let transactions = get_transactions_for_trip(trip_id, &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve trip transactions: {error}"))?;

    let total = trip_total(&trip, &transactions, &connection)?;

    Ok(trip_detail_view(&trip, &transactions, &total).into_response())
}

/// Sum the trip's transactions in the trip currency. Incomes (e.g. a refund
/// booked against the trip) reduce the total spent.
fn trip_total(
    trip: &Trip,
    transactions: &[Transaction],
    connection: &Connection,
) -> Result<TripTotal, Error> {
    let mut total = 0.0;

    for transaction in transactions {
        let converted = match convert(
            transaction.amount,
            &transaction.currency,
            &trip.currency,
            connection,
        ) {
            Ok(converted) => converted,
            Err(Error::MissingExchangeRate { base, quote }) => {
                return Ok(TripTotal::MissingRate { base, quote });
            }
            Err(error) => return Err(error),
        };

        match transaction.kind {
            TransactionKind::Expense => total += converted,
            TransactionKind::Income => total -= converted,
        }
    }

    Ok(TripTotal::Converted(total))
}

fn trip_detail_view(trip: &Trip, transactions: &[Transaction], total: &TripTotal) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRIPS_VIEW).into_html();
    let edit_url = endpoints::format_endpoint(endpoints::EDIT_TRIP_VIEW, trip.id);

    let summary = html!(
        section class="space-y-1"
        {
            h1 class="text-xl font-bold" { (trip.name) }

            p { (trip.destination) ", " (trip.start_date) " to " (trip.end_date) }

            @if let Some(notes) = &trip.notes {
                p class="text-gray-500 dark:text-gray-400" { (notes) }
            }

            @match total {
                TripTotal::Converted(total) => {
                    p
                    {
                        "Total spent: " strong { (format_amount(*total, &trip.currency)) }

                        @if let Some(budget) = trip.estimated_budget {
                            " of " (format_amount(budget, &trip.currency)) " budgeted ("
                            (format_amount(budget - total, &trip.currency)) " remaining)"
                        }
                    }
                }
                TripTotal::MissingRate { base, quote } => {
                    p
                    {
                        "No exchange rate is stored for " (base) "/" (quote) ". "
                        a href=(endpoints::RATES_VIEW) class=(LINK_STYLE)
                        {
                            "Add a rate"
                        }
                        " to see the trip total."
                    }
                }
            }

            a href=(edit_url) class=(LINK_STYLE) { "Edit Trip" }
        }
    );

    let table_row = |transaction: &Transaction| {
        let signed_amount = match transaction.kind {
            TransactionKind::Expense => -transaction.amount,
            TransactionKind::Income => transaction.amount,
        };

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (transaction.date) }

                td class=(TABLE_CELL_STYLE) { (transaction.description) }

                td class=(TABLE_CELL_STYLE)
                {
                    (format_amount(signed_amount, &transaction.currency))
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
                (summary)

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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
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
                                        colspan="3"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No transactions for this trip yet."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base(&trip.name, &[], &content)
}
