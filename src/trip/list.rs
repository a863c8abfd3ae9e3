//! Trips listing page.

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
    trip::{Trip, get_all_trips},
};

/// The state needed for the trips page.
#[derive(Debug, Clone)]
pub struct TripsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TripsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the trips listing page.
pub async fn get_trips_page(State(state): State<TripsPageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let trips = get_all_trips(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve trips: {error}"))?;

    Ok(trips_view(&trips).into_response())
}

fn trips_view(trips: &[Trip]) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRIPS_VIEW).into_html();

    let table_row = |trip: &Trip| {
        let detail_url = endpoints::format_endpoint(endpoints::TRIP_DETAIL_VIEW, trip.id);
        let edit_url = endpoints::format_endpoint(endpoints::EDIT_TRIP_VIEW, trip.id);
        let delete_url = endpoints::format_endpoint(endpoints::DELETE_TRIP, trip.id);
        let confirm_message = format!(
            "Are you sure you want to delete '{}'? Transactions assigned to it are kept.",
            trip.name
        );
        let budget = trip
            .estimated_budget
            .map(|budget| format_amount(budget, &trip.currency))
            .unwrap_or_default();

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE)
                {
                    a href=(detail_url) class=(LINK_STYLE) { (trip.name) }
                }

                td class=(TABLE_CELL_STYLE) { (trip.destination) }

                td class=(TABLE_CELL_STYLE) { (trip.start_date) " to " (trip.end_date) }

                td class=(TABLE_CELL_STYLE) { (budget) }

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
                    h1 class="text-xl font-bold" { "Trips" }

                    a href=(endpoints::NEW_TRIP_VIEW) class=(LINK_STYLE)
                    {
                        "Create Trip"
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Destination" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Dates" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Budget" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for trip in trips {
                                (table_row(trip))
                            }

                            @if trips.is_empty() {
                                tr
                                {
                                    td
                                        colspan="5"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No trips yet. "
                                        a href=(endpoints::NEW_TRIP_VIEW) class=(LINK_STYLE)
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

    base("Trips", &[], &content)
}

#[cfg(test)]
mod trips_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        currency::CurrencyCode,
        db::initialize,
        test_utils::{assert_status_ok, assert_valid_html, parse_html_document},
        trip::{Trip, create_trip, get_trips_page},
    };

    use super::TripsPageState;

    fn get_page_state() -> TripsPageState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        TripsPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn render_empty_state() {
        let state = get_page_state();

        let response = get_trips_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("No trips yet"));
    }

    #[tokio::test]
    async fn lists_trips_with_dates_and_budget() {
        let state = get_page_state();
        create_trip(
            Trip::build(
                "Semester in Prague",
                "Prague, Czech Republic",
                date!(2025 - 09 - 01),
                date!(2026 - 01 - 31),
                CurrencyCode::new_unchecked("CZK"),
            )
            .estimated_budget(Some(5000.0)),
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not create test trip");

        let response = get_trips_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("Semester in Prague"));
        assert!(text.contains("Prague, Czech Republic"));
        assert!(text.contains("2025-09-01 to 2026-01-31"));
        assert!(text.contains("5,000.00"));
    }
}
