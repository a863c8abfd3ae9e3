//! Trip deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    trip::{TripId, delete_trip},
};

/// The state needed for deleting a trip.
#[derive(Debug, Clone)]
pub struct DeleteTripEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteTripEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle trip deletion. Transactions assigned to the trip are kept.
pub async fn delete_trip_endpoint(
    Path(trip_id): Path<TripId>,
    State(state): State<DeleteTripEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_trip(trip_id, &connection) {
        Ok(_) => Alert::SuccessSimple {
            message: "Trip deleted successfully".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingTrip) => Error::DeleteMissingTrip.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting trip {trip_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod delete_trip_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        currency::CurrencyCode,
        db::initialize,
        trip::{Trip, create_trip, delete_trip_endpoint, get_trip},
    };

    use super::DeleteTripEndpointState;

    fn get_delete_trip_state() -> DeleteTripEndpointState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        DeleteTripEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn delete_trip_endpoint_succeeds() {
        let state = get_delete_trip_state();
        let trip = create_trip(
            Trip::build(
                "Weekend in Vienna",
                "Vienna, Austria",
                date!(2025 - 10 - 03),
                date!(2025 - 10 - 05),
                CurrencyCode::new_unchecked("EUR"),
            ),
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not create test trip");

        let response = delete_trip_endpoint(Path(trip.id), State(state.clone()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            get_trip(trip.id, &state.db_connection.lock().unwrap()),
            Err(Error::NotFound)
        );
    }

    #[tokio::test]
    async fn delete_trip_endpoint_with_invalid_id_returns_not_found() {
        let state = get_delete_trip_state();

        let response = delete_trip_endpoint(Path(999), State(state))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
