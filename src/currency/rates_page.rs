//! Exchange rates listing page and upsert endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    currency::{CurrencyCode, ExchangeRate, get_all_exchange_rates, upsert_exchange_rate},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
    timezone::today_in,
};

/// The state needed for the exchange rates page.
#[derive(Debug, Clone)]
pub struct RatesPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RatesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for storing an exchange rate.
#[derive(Debug, Clone)]
pub struct UpsertRateEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub local_timezone: String,
}

impl FromRef<AppState> for UpsertRateEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Form data for storing an exchange rate.
#[derive(Debug, Serialize, Deserialize)]
pub struct RateFormData {
    pub base: String,
    pub quote: String,
    pub rate: f64,
}

/// Render the exchange rates page.
pub async fn get_rates_page(State(state): State<RatesPageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let rates = get_all_exchange_rates(&connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve exchange rates: {error}"))?;

    Ok(rates_view(&rates, "").into_response())
}

/// Handle exchange rate form submission.
///
/// Stores the submitted rate for the currency pair, replacing any rate the
/// pair already had. The quote date is set to today in the server's timezone.
pub async fn upsert_rate_endpoint(
    State(state): State<UpsertRateEndpointState>,
    Form(form): Form<RateFormData>,
) -> Response {
    let base = match CurrencyCode::new(&form.base) {
        Ok(base) => base,
        Err(error) => return rate_form_view(&format!("Error: {error}")).into_response(),
    };

    let quote = match CurrencyCode::new(&form.quote) {
        Ok(quote) => quote,
        Err(error) => return rate_form_view(&format!("Error: {error}")).into_response(),
    };

    if form.rate <= 0.0 {
        return rate_form_view("Error: the rate must be greater than zero").into_response();
    }

    let today = match today_in(&state.local_timezone) {
        Ok(today) => today,
        Err(error) => return error.into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match upsert_exchange_rate(&base, &quote, form.rate, today, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::RATES_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while storing an exchange rate: {error}");

            error.into_alert_response()
        }
    }
}

fn rates_view(rates: &[ExchangeRate], error_message: &str) -> Markup {
    let nav_bar = NavBar::new(endpoints::RATES_VIEW).into_html();

    let table_row = |rate: &ExchangeRate| {
        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (rate.base) "/" (rate.quote) }
                td class=(TABLE_CELL_STYLE) { (format!("{:.4}", rate.rate)) }
                td class=(TABLE_CELL_STYLE) { (rate.date) }
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
                    h1 class="text-xl font-bold" { "Exchange Rates" }
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
                                th scope="col" class=(TABLE_CELL_STYLE) { "Pair" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Rate" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Quote Date" }
                            }
                        }

                        tbody
                        {
                            @for rate in rates {
                                (table_row(rate))
                            }

                            @if rates.is_empty() {
                                tr
                                {
                                    td
                                        colspan="3"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No exchange rates stored yet. \
                                        Add one below to enable currency conversion."
                                    }
                                }
                            }
                        }
                    }
                }

                section class="max-w-md w-full mx-auto"
                {
                    h2 class="text-lg font-bold" { "Add or Update Rate" }

                    (rate_form_view(error_message))
                }
            }
        }
    );

    base("Exchange Rates", &[], &content)
}

fn rate_form_view(error_message: &str) -> Markup {
    html! {
        form
            hx-post=(endpoints::POST_RATE)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div class="flex gap-4"
            {
                div class="flex-1"
                {
                    label for="base" class=(FORM_LABEL_STYLE) { "From" }

                    input
                        id="base"
                        type="text"
                        name="base"
                        placeholder="EUR"
                        maxlength="3"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div class="flex-1"
                {
                    label for="quote" class=(FORM_LABEL_STYLE) { "To" }

                    input
                        id="quote"
                        type="text"
                        name="quote"
                        placeholder="NZD"
                        maxlength="3"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label for="rate" class=(FORM_LABEL_STYLE) { "Rate" }

                input
                    id="rate"
                    type="number"
                    name="rate"
                    step="0.0001"
                    min="0.0001"
                    placeholder="1.0000"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            @if !error_message.is_empty() {
                p class="text-red-600 dark:text-red-400"
                {
                    (error_message)
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save Rate" }
        }
    }
}


#[cfg(test)]
mod upsert_rate_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;

    use crate::{
        currency::{CurrencyCode, conversion_rate, create_exchange_rate_table},
        endpoints,
        test_utils::{
            assert_form_error_message, assert_hx_redirect, assert_valid_html, must_get_form,
            parse_html_fragment,
        },
    };

    use super::{RateFormData, UpsertRateEndpointState, upsert_rate_endpoint};

    fn get_test_state() -> UpsertRateEndpointState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_exchange_rate_table(&connection).expect("Could not create exchange rate table");

        UpsertRateEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Europe/Berlin".to_owned(),
        }
    }

    #[tokio::test]
    async fn stores_rate_and_redirects() {
        let state = get_test_state();
        let form = RateFormData {
            base: "eur".to_owned(),
            quote: "NZD".to_owned(),
            rate: 1.8,
        };

        let response = upsert_rate_endpoint(State(state.clone()), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::RATES_VIEW);

        let connection = state.db_connection.lock().unwrap();
        let rate = conversion_rate(
            &CurrencyCode::new_unchecked("EUR"),
            &CurrencyCode::new_unchecked("NZD"),
            &connection,
        )
        .unwrap();
        assert!((rate - 1.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn rejects_invalid_currency_code() {
        let state = get_test_state();
        let form = RateFormData {
            base: "EURO".to_owned(),
            quote: "NZD".to_owned(),
            rate: 1.8,
        };

        let response = upsert_rate_endpoint(State(state), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_form_error_message(
            &form,
            "Error: \"EURO\" is not a valid three letter currency code",
        );
    }

    #[tokio::test]
    async fn rejects_non_positive_rate() {
        let state = get_test_state();
        let form = RateFormData {
            base: "EUR".to_owned(),
            quote: "NZD".to_owned(),
            rate: 0.0,
        };

        let response = upsert_rate_endpoint(State(state), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_form_error_message(&form, "Error: the rate must be greater than zero");
    }
}
