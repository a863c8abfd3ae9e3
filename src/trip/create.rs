//! Trip creation page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
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
    currency::CurrencyCode,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
    trip::{Trip, create_trip},
};

/// The state needed for creating a trip.
#[derive(Debug, Clone)]
pub struct CreateTripEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateTripEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for creating or updating a trip.
// Must use axum_extra's Form since that parses an empty string as None
// instead of crashing like axum::Form.
#[derive(Debug, Deserialize)]
pub struct TripFormData {
    pub name: String,
    pub destination: String,
    pub start_date: Date,
    pub end_date: Date,
    #[serde(default)]
    pub estimated_budget: Option<f64>,
    pub currency: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Render the trip creation page.
pub async fn get_new_trip_page() -> Response {
    new_trip_view().into_response()
}

/// Handle trip creation form submission.
pub async fn create_trip_endpoint(
    State(state): State<CreateTripEndpointState>,
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

    match create_trip(builder, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::TRIPS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ Error::TripEndsBeforeStart(_, _)) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a trip: {error}");

            error.into_alert_response()
        }
    }
}

fn new_trip_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_TRIP_VIEW).into_html();

    let form = html! {
        form
            hx-post=(endpoints::POST_TRIP)
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
                    placeholder="Semester in Prague"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="destination" class=(FORM_LABEL_STYLE) { "Destination" }

                input
                    id="destination"
                    type="text"
                    name="destination"
                    placeholder="Prague, Czech Republic"
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
                label for="notes" class=(FORM_LABEL_STYLE) { "Notes (optional)" }

                input
                    id="notes"
                    type="text"
                    name="notes"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Trip" }
        }
    };

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Create Trip", &[], &content)
}

#[cfg(test)]
mod new_trip_page_tests {
    use axum::http::StatusCode;

    use crate::{
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button_with_text, assert_hx_endpoint,
            assert_valid_html, must_get_form, parse_html_document,
        },
        trip::get_new_trip_page,
    };

    #[tokio::test]
    async fn render_page() {
        let response = get_new_trip_page().await;

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::POST_TRIP, "hx-post");
        assert_form_input(&form, "name", "text");
        assert_form_input(&form, "destination", "text");
        assert_form_input(&form, "start_date", "date");
        assert_form_input(&form, "end_date", "date");
        assert_form_input(&form, "currency", "text");
        assert_form_submit_button_with_text(&form, "Create Trip");
    }
}

#[cfg(test)]
mod create_trip_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use axum_extra::extract::Form;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        db::initialize,
        endpoints,
        test_utils::assert_hx_redirect,
        trip::{create_trip_endpoint, get_trip},
    };

    use super::{CreateTripEndpointState, TripFormData};

    fn get_trip_state() -> CreateTripEndpointState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        CreateTripEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn test_form() -> TripFormData {
        TripFormData {
            name: "Semester in Prague".to_owned(),
            destination: "Prague, Czech Republic".to_owned(),
            start_date: date!(2025 - 09 - 01),
            end_date: date!(2026 - 01 - 31),
            estimated_budget: Some(5000.0),
            currency: "CZK".to_owned(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn can_create_trip() {
        let state = get_trip_state();

        let response = create_trip_endpoint(State(state.clone()), Form(test_form()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::TRIPS_VIEW);

        let trip = get_trip(1, &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(trip.name, "Semester in Prague");
        assert_eq!(trip.estimated_budget, Some(5000.0));
    }

    #[tokio::test]
    async fn create_trip_fails_when_end_precedes_start() {
        let state = get_trip_state();
        let form = TripFormData {
            start_date: date!(2025 - 09 - 01),
            end_date: date!(2025 - 08 - 01),
            ..test_form()
        };

        let response = create_trip_endpoint(State(state.clone()), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(get_trip(1, &state.db_connection.lock().unwrap()).is_err());
    }

    #[tokio::test]
    async fn create_trip_fails_on_invalid_currency() {
        let state = get_trip_state();
        let form = TripFormData {
            currency: "KORUNA".to_owned(),
            ..test_form()
        };

        let response = create_trip_endpoint(State(state), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
