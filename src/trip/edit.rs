//! Trip editing page and endpoint.

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

use crate::{
    AppState, Error,
    currency::CurrencyCode,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    trip::{Trip, TripId, create::TripFormData, get_trip, update_trip},
};

/// The state needed for the edit trip page.
#[derive(Debug, Clone)]
pub struct EditTripPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditTripPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for updating a trip.
#[derive(Debug, Clone)]
pub struct UpdateTripEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateTripEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the trip editing page.
pub async fn get_edit_trip_page(
    Path(trip_id): Path<TripId>,
    State(state): State<EditTripPageState>,
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

    Ok(edit_trip_view(&trip).into_response())
}

/// Handle trip update form submission.
pub async fn update_trip_endpoint(
    Path(trip_id): Path<TripId>,
    State(state): State<UpdateTripEndpointState>,
    Form(form_data): Form<TripFormData>,
) -> Response {
    let currency = match CurrencyCode::new(&form_data.currency) {
        Ok(currency) => currency,
        Err(error) => return error.into_alert_response(),
    };

    let builder = Trip::build(
        &form_data.name,
        &form_data.destination,
        form_data.start_date,
        form_data.end_date,
        currency,
    )
    .estimated_budget(form_data.estimated_budget)
    .notes(form_data.notes);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_trip(trip_id, builder, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::TRIPS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ (Error::TripEndsBeforeStart(_, _) | Error::UpdateMissingTrip)) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating trip {trip_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

fn edit_trip_view(trip: &Trip) -> Markup {
    let edit_endpoint = endpoints::format_endpoint(endpoints::EDIT_TRIP_VIEW, trip.id);
    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_TRIP, trip.id);
    let nav_bar = NavBar::new(&edit_endpoint).into_html();

    let form = html! {
        form
            hx-put=(update_endpoint)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="name" class=(FORM_LABEL_STYLE) { "Trip Name" }

                input
                    id="name"
                    type="text"
                    name="name"
                    value=(trip.name)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="destination" class=(FORM_LABEL_STYLE) { "Destination" }

                input
                    id="destination"
                    type="text"
                    name="destination"
                    value=(trip.destination)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="start_date" class=(FORM_LABEL_STYLE) { "Start Date" }

                input
                    id="start_date"
                    type="date"
                    name="start_date"
                    value=(trip.start_date)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="end_date" class=(FORM_LABEL_STYLE) { "End Date" }

                input
                    id="end_date"
                    type="date"
                    name="end_date"
                    value=(trip.end_date)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="estimated_budget" class=(FORM_LABEL_STYLE)
                {
                    "Estimated Budget (optional)"
                }

                input
                    id="estimated_budget"
                    type="number"
                    name="estimated_budget"
                    min="0.01"
                    step="0.01"
                    value=[trip.estimated_budget]
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
                    value=(trip.currency)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="notes" class=(FORM_LABEL_STYLE) { "Notes (optional)" }

                input
                    id="notes"
                    type="text"
                    name="notes"
                    value=[&trip.notes]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update Trip" }
        }
    };

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Edit Trip", &[], &content)
}

#[cfg(test)]
mod edit_trip_tests {
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
        test_utils::{
            assert_form_input_with_value, assert_form_submit_button_with_text, assert_hx_endpoint,
            assert_hx_redirect, assert_valid_html, must_get_form, parse_html_document,
        },
        trip::{
            Trip, create::TripFormData, create_trip, get_edit_trip_page, get_trip,
            update_trip_endpoint,
        },
    };

    use super::{EditTripPageState, UpdateTripEndpointState};

    fn get_test_db_connection() -> Connection {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        connection
    }

    fn create_test_trip(connection: &Connection) -> Trip {
        create_trip(
            Trip::build(
                "Weekend in Vienna",
                "Vienna, Austria",
                date!(2025 - 10 - 03),
                date!(2025 - 10 - 05),
                CurrencyCode::new_unchecked("EUR"),
            ),
            connection,
        )
        .expect("Could not create test trip")
    }

    #[tokio::test]
    async fn get_edit_page_prefills_form() {
        let connection = get_test_db_connection();
        let trip = create_test_trip(&connection);
        let state = EditTripPageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_edit_trip_page(Path(trip.id), State(state)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &endpoints::format_endpoint(endpoints::PUT_TRIP, trip.id),
            "hx-put",
        );
        assert_form_input_with_value(&form, "name", "text", "Weekend in Vienna");
        assert_form_input_with_value(&form, "destination", "text", "Vienna, Austria");
        assert_form_input_with_value(&form, "start_date", "date", "2025-10-03");
        assert_form_input_with_value(&form, "end_date", "date", "2025-10-05");
        assert_form_input_with_value(&form, "currency", "text", "EUR");
        assert_form_submit_button_with_text(&form, "Update Trip");
    }

    #[tokio::test]
    async fn get_edit_page_with_invalid_id_returns_not_found() {
        let state = EditTripPageState {
            db_connection: Arc::new(Mutex::new(get_test_db_connection())),
        };

        let result = get_edit_trip_page(Path(999), State(state)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }

    fn test_form() -> TripFormData {
        TripFormData {
            name: "Week in Vienna".to_owned(),
            destination: "Vienna, Austria".to_owned(),
            start_date: date!(2025 - 10 - 03),
            end_date: date!(2025 - 10 - 10),
            estimated_budget: Some(500.0),
            currency: "EUR".to_owned(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn update_endpoint_succeeds() {
        let connection = get_test_db_connection();
        let trip = create_test_trip(&connection);
        let state = UpdateTripEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = update_trip_endpoint(Path(trip.id), State(state.clone()), Form(test_form()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::TRIPS_VIEW);

        let updated = get_trip(trip.id, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(updated.name, "Week in Vienna");
        assert_eq!(updated.end_date, date!(2025 - 10 - 10));
        assert_eq!(updated.estimated_budget, Some(500.0));
    }

    #[tokio::test]
    async fn update_endpoint_rejects_end_before_start() {
        let connection = get_test_db_connection();
        let trip = create_test_trip(&connection);
        let state = UpdateTripEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let form = TripFormData {
            start_date: date!(2025 - 10 - 03),
            end_date: date!(2025 - 09 - 01),
            ..test_form()
        };

        let response = update_trip_endpoint(Path(trip.id), State(state), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_endpoint_with_invalid_id_returns_not_found() {
        let state = UpdateTripEndpointState {
            db_connection: Arc::new(Mutex::new(get_test_db_connection())),
        };

        let response = update_trip_endpoint(Path(999), State(state), Form(test_form()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
