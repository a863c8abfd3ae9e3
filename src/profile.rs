//! The profile page for the display currency, home country and the consent
//! flag for the country comparison.

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

use crate::{
    AppState, Error,
    auth::{User, UserId, get_user_by_id, update_profile},
    currency::CurrencyCode,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CHECKBOX_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
};

/// The state needed for the profile page.
#[derive(Debug, Clone)]
pub struct ProfilePageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfilePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for updating the profile.
#[derive(Debug, Clone)]
pub struct UpdateProfileEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateProfileEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for updating the profile.
// Must use axum_extra's Form since that parses an empty string as None
// instead of crashing like axum::Form.
#[derive(Debug, Deserialize)]
pub struct ProfileFormData {
    pub preferred_currency: String,
    #[serde(default)]
    pub home_country: Option<String>,
    #[serde(default)]
    pub data_sharing_consent: bool,
}

/// Render the profile page.
pub async fn get_profile_page(State(state): State<ProfilePageState>) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(UserId::new(1), &connection)
        .inspect_err(|error| tracing::error!("Failed to retrieve user: {error}"))?;

    Ok(profile_view(&user).into_response())
}

/// Handle profile form submission.
pub async fn update_profile_endpoint(
    State(state): State<UpdateProfileEndpointState>,
    Form(form_data): Form<ProfileFormData>,
) -> Response {
    let preferred_currency = match CurrencyCode::new(&form_data.preferred_currency) {
        Ok(currency) => currency,
        Err(error) => return error.into_alert_response(),
    };

    // Treat a blank country as unset so the comparison page does not try to
    // match benchmarks against an empty string.
    let home_country = form_data
        .home_country
        .as_deref()
        .map(str::trim)
        .filter(|country| !country.is_empty());

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match update_profile(
        UserId::new(1),
        &preferred_currency,
        home_country,
        form_data.data_sharing_consent,
        &connection,
    ) {
        Ok(_) => (
            HxRedirect(endpoints::PROFILE_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An unexpected error occurred while updating the profile: {error}");
            error.into_alert_response()
        }
    }
}

fn profile_view(user: &User) -> Markup {
    let nav_bar = NavBar::new(endpoints::PROFILE_VIEW).into_html();

    let form = html! {
        form
            hx-put=(endpoints::PUT_PROFILE)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="preferred_currency" class=(FORM_LABEL_STYLE)
                {
                    "Preferred Display Currency"
                }

                input
                    id="preferred_currency"
                    type="text"
                    name="preferred_currency"
                    maxlength="3"
                    value=(user.preferred_currency)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="home_country" class=(FORM_LABEL_STYLE)
                {
                    "Home Country (optional)"
                }

                input
                    id="home_country"
                    type="text"
                    name="home_country"
                    placeholder="New Zealand"
                    value=[&user.home_country]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    id="data_sharing_consent"
                    name="data_sharing_consent"
                    value="true"
                    checked[user.data_sharing_consent]
                    class=(FORM_CHECKBOX_STYLE);

                label for="data_sharing_consent" class=(FORM_LABEL_STYLE)
                {
                    "Compare my spending against anonymised country averages"
                }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update Profile" }
        }
    };

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Profile", &[], &content)
}

#[cfg(test)]
mod profile_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::{PasswordHash, UserId, update_profile},
        currency::CurrencyCode,
        db::initialize,
        endpoints,
        test_utils::{
            assert_form_input_with_value, assert_form_optional_input_with_value,
            assert_form_submit_button_with_text, assert_hx_endpoint, assert_status_ok,
            assert_valid_html, must_get_form, parse_html_document,
        },
    };

    use super::{ProfilePageState, get_profile_page};

    fn get_page_state() -> ProfilePageState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        crate::auth::create_user(PasswordHash::new_unchecked("hunter2"), &connection)
            .expect("Could not create test user");

        ProfilePageState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn render_page_with_profile_values() {
        let state = get_page_state();
        update_profile(
            UserId::new(1),
            &CurrencyCode::new_unchecked("CZK"),
            Some("New Zealand"),
            true,
            &state.db_connection.lock().unwrap(),
        )
        .expect("Could not update test profile");

        let response = get_profile_page(State(state)).await.unwrap();

        assert_status_ok(&response);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::PUT_PROFILE, "hx-put");
        assert_form_input_with_value(&form, "preferred_currency", "text", "CZK");
        assert_form_optional_input_with_value(&form, "home_country", "text", "New Zealand");
        assert_form_submit_button_with_text(&form, "Update Profile");
    }

    #[tokio::test]
    async fn page_fails_without_user() {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        let state = ProfilePageState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let result = get_profile_page(State(state)).await;

        assert_eq!(result.err(), Some(Error::NotFound));
    }
}

#[cfg(test)]
mod update_profile_endpoint_tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use axum_extra::extract::Form;
    use rusqlite::Connection;

    use crate::{
        auth::{PasswordHash, UserId, create_user, get_user_by_id},
        currency::CurrencyCode,
        db::initialize,
        endpoints,
        test_utils::assert_hx_redirect,
    };

    use super::{ProfileFormData, UpdateProfileEndpointState, update_profile_endpoint};

    fn get_endpoint_state() -> UpdateProfileEndpointState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        create_user(PasswordHash::new_unchecked("hunter2"), &connection)
            .expect("Could not create test user");

        UpdateProfileEndpointState {
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    #[tokio::test]
    async fn update_profile_succeeds() {
        let state = get_endpoint_state();
        let form = ProfileFormData {
            preferred_currency: "czk".to_owned(),
            home_country: Some("New Zealand".to_owned()),
            data_sharing_consent: true,
        };

        let response = update_profile_endpoint(State(state.clone()), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::PROFILE_VIEW);

        let user = get_user_by_id(UserId::new(1), &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(user.preferred_currency, CurrencyCode::new_unchecked("CZK"));
        assert_eq!(user.home_country, Some("New Zealand".to_owned()));
        assert!(user.data_sharing_consent);
    }

    #[tokio::test]
    async fn blank_home_country_is_stored_as_none() {
        let state = get_endpoint_state();
        let form = ProfileFormData {
            preferred_currency: "EUR".to_owned(),
            home_country: Some("   ".to_owned()),
            data_sharing_consent: false,
        };

        let response = update_profile_endpoint(State(state.clone()), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let user = get_user_by_id(UserId::new(1), &state.db_connection.lock().unwrap()).unwrap();
        assert_eq!(user.home_country, None);
        assert!(!user.data_sharing_consent);
    }

    #[tokio::test]
    async fn update_profile_fails_on_invalid_currency() {
        let state = get_endpoint_state();
        let form = ProfileFormData {
            preferred_currency: "KORUNA".to_owned(),
            home_country: None,
            data_sharing_consent: false,
        };

        let response = update_profile_endpoint(State(state), Form(form))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
