//! Endpoint that folds the user's monthly category averages into the stored
//! country benchmarks.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    auth::{UserId, get_user_by_id},
    country::{
        add_benchmark_sample, get_benchmarks_for_country,
        page::{MINIMUM_MONTHLY_SAMPLES, monthly_category_averages},
    },
    currency::convert,
    endpoints,
    timezone::today_in,
    transaction::month_bounds,
};

/// The state needed for sharing spending averages.
#[derive(Debug, Clone)]
pub struct ShareSpendingEndpointState {
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ShareSpendingEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Fold the current month's category averages into the benchmarks for the
/// user's home country.
pub async fn share_spending_endpoint(
    State(state): State<ShareSpendingEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_id(UserId::new(1), &connection) {
        Ok(user) => user,
        Err(error) => {
            tracing::error!("Failed to retrieve user: {error}");
            return error.into_alert_response();
        }
    };

    let Some(home_country) = user.home_country.as_deref().filter(|_| user.data_sharing_consent)
    else {
        return (
            StatusCode::BAD_REQUEST,
            Alert::Error {
                message: "Sharing is not set up".to_owned(),
                details: "Set your home country and enable the data sharing consent on the \
                    profile page first."
                    .to_owned(),
            }
            .into_html(),
        )
            .into_response();
    };

    let today = match today_in(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };
    let (start, end) = month_bounds(today.year(), today.month());

    let averages =
        match monthly_category_averages(start, end, &user.preferred_currency, &connection) {
            Ok(averages) => averages,
            Err(error) => {
                tracing::error!("Failed to compute monthly category averages: {error}");
                return error.into_alert_response();
            }
        };

    if averages.transaction_count < MINIMUM_MONTHLY_SAMPLES {
        return (
            StatusCode::BAD_REQUEST,
            Alert::Error {
                message: "Not enough data to share".to_owned(),
                details: format!(
                    "Record at least {MINIMUM_MONTHLY_SAMPLES} categorised expenses this month \
                    before sharing your averages."
                ),
            }
            .into_html(),
        )
            .into_response();
    }

    // Existing benchmarks keep their currency, so samples must be converted
    // into it before they are folded in.
    let benchmark_currencies = match get_benchmarks_for_country(home_country, &connection) {
        Ok(benchmarks) => benchmarks
            .into_iter()
            .map(|benchmark| (benchmark.category, benchmark.currency))
            .collect::<std::collections::HashMap<_, _>>(),
        Err(error) => {
            tracing::error!("Failed to retrieve country benchmarks: {error}");
            return error.into_alert_response();
        }
    };

    for (category, average) in &averages.by_category {
        let currency = benchmark_currencies
            .get(category)
            .unwrap_or(&user.preferred_currency);

        let sample = match convert(*average, &user.preferred_currency, currency, &connection) {
            Ok(sample) => sample,
            Err(error) => return error.into_alert_response(),
        };

        if let Err(error) =
            add_benchmark_sample(home_country, category, sample, currency, &connection)
        {
            tracing::error!("Failed to add a benchmark sample for {category}: {error}");
            return error.into_alert_response();
        }
    }

    (
        HxRedirect(endpoints::COUNTRIES_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod share_spending_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;
    use time::OffsetDateTime;

    use crate::{
        auth::{PasswordHash, UserId, create_user, update_profile},
        category::{CategoryName, create_category},
        country::{add_benchmark_sample, get_benchmarks_for_country, share_spending_endpoint},
        currency::CurrencyCode,
        db::initialize,
        endpoints,
        test_utils::assert_hx_redirect,
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::ShareSpendingEndpointState;

    const TEST_TIMEZONE: &str = "Etc/UTC";

    fn eur() -> CurrencyCode {
        CurrencyCode::new_unchecked("EUR")
    }

    fn get_endpoint_state() -> ShareSpendingEndpointState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        create_user(PasswordHash::new_unchecked("hunter2"), &connection)
            .expect("Could not create test user");

        ShareSpendingEndpointState {
            local_timezone: TEST_TIMEZONE.to_owned(),
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn give_consent(state: &ShareSpendingEndpointState, country: &str) {
        update_profile(
            UserId::new(1),
            &eur(),
            Some(country),
            true,
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not update test profile");
    }

    fn create_groceries_expenses(state: &ShareSpendingEndpointState, amounts: &[f64]) {
        let connection = state.db_connection.lock().unwrap();
        let groceries =
            create_category(CategoryName::new_unchecked("Groceries"), &connection).unwrap();
        let today = OffsetDateTime::now_utc().date();

        for amount in amounts {
            create_transaction(
                Transaction::build(
                    TransactionKind::Expense,
                    *amount,
                    CurrencyCode::new_unchecked("EUR"),
                    today,
                    "Weekly shop",
                )
                .category_id(Some(groceries.id)),
                &connection,
            )
            .unwrap();
        }
    }

    #[tokio::test]
    async fn sharing_creates_a_benchmark() {
        let state = get_endpoint_state();
        give_consent(&state, "Czech Republic");
        create_groceries_expenses(&state, &[30.0, 40.0, 50.0]);

        let response = share_spending_endpoint(State(state.clone()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::COUNTRIES_VIEW);

        let benchmarks = get_benchmarks_for_country(
            "Czech Republic",
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        assert_eq!(benchmarks.len(), 1);
        assert_eq!(benchmarks[0].category, "Groceries");
        assert_eq!(benchmarks[0].average_amount, 40.0);
        assert_eq!(benchmarks[0].sample_size, 1);
    }

    #[tokio::test]
    async fn sharing_folds_into_an_existing_benchmark() {
        let state = get_endpoint_state();
        give_consent(&state, "Czech Republic");
        create_groceries_expenses(&state, &[30.0, 40.0, 50.0]);
        add_benchmark_sample(
            "Czech Republic",
            "Groceries",
            60.0,
            &eur(),
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let response = share_spending_endpoint(State(state.clone()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let benchmarks = get_benchmarks_for_country(
            "Czech Republic",
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();
        // (60 + 40) / 2 = 50.
        assert_eq!(benchmarks[0].average_amount, 50.0);
        assert_eq!(benchmarks[0].sample_size, 2);
    }

    #[tokio::test]
    async fn sharing_fails_without_consent() {
        let state = get_endpoint_state();
        create_groceries_expenses(&state, &[30.0, 40.0, 50.0]);

        let response = share_spending_endpoint(State(state)).await.into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn sharing_fails_with_too_few_expenses() {
        let state = get_endpoint_state();
        give_consent(&state, "Czech Republic");
        create_groceries_expenses(&state, &[30.0]);

        let response = share_spending_endpoint(State(state.clone()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(
            get_benchmarks_for_country("Czech Republic", &state.db_connection.lock().unwrap())
                .unwrap()
                .is_empty()
        );
    }
}
