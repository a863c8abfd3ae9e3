//! The log-in page and its form handler. The rest of the auth module owns the
//! cookie and token plumbing this builds on.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    app_state::create_cookie_key,
    auth::{
        DEFAULT_COOKIE_DURATION, User, UserId, get_user_by_id, invalidate_auth_cookie,
        normalize_redirect_url, set_auth_cookie,
    },
    endpoints,
    html::{base, loading_spinner, log_in_register, password_input},
    timezone::local_offset,
};

/// How long the auth cookie lasts when "stay logged in" is ticked.
const STAY_LOGGED_IN_COOKIE_DURATION: Duration = Duration::days(7);

const WRONG_PASSWORD_MESSAGE: &str = "Incorrect password.";
const NO_USER_MESSAGE: &str =
    "No password has been set up yet. Head to the registration page first.";
const INTERNAL_ERROR_MESSAGE: &str = "Something went wrong on our end. Please try again.";

fn log_in_form(password: &str, error_message: Option<&str>, redirect_url: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#password, #submit-button"
            class="space-y-4 md:space-y-6"
        {
            @if let Some(redirect_url) = redirect_url {
                input type="hidden" name="redirect_url" value=(redirect_url);
            }

            (password_input(password, 0, error_message))

            div class="flex items-center gap-x-3"
            {
                input
                    type="checkbox"
                    name="remember_me"
                    id="remember_me"
                    tabindex="0"
                    class="rounded-xs";

                label
                    for="remember_me"
                    class="block text-sm font-medium text-gray-900 dark:text-white"
                {
                    "Stay logged in for a week"
                }
            }

            button
                type="submit" id="submit-button" tabindex="0"
                class="w-full px-4 py-2 bg-blue-500 dark:bg-blue-600 disabled:bg-blue-700
                    hover:enabled:bg-blue-600 hover:enabled:dark:bg-blue-700 text-white rounded"
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Log in"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Forgot your password? "

                a
                    href=(endpoints::FORGOT_PASSWORD_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Reset it here"
                }
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "First time here? "
                a
                    href=(endpoints::REGISTER_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Set a password"
                }
            }
        }
    }
}

/// Re-render the log-in form with an error message, keeping the redirect URL.
fn retry_form(error_message: &str, redirect_url: Option<&str>) -> Response {
    log_in_form("", Some(error_message), redirect_url).into_response()
}

/// Validate a client-supplied redirect target, logging rejected values.
fn parse_redirect_url(raw_url: Option<&str>, source: &str) -> Option<String> {
    let redirect_url = raw_url.and_then(normalize_redirect_url);

    if redirect_url.is_none()
        && let Some(rejected_url) = raw_url
    {
        tracing::warn!("Invalid redirect URL from {source}: {rejected_url}");
    }

    redirect_url
}

/// Display the log-in page.
pub async fn get_log_in_page(Query(query): Query<RedirectQuery>) -> Response {
    let redirect_url = parse_redirect_url(query.redirect_url.as_deref(), "log-in query");
    let form = log_in_form("", None, redirect_url.as_deref());

    base("Log In", &[], &log_in_register("Log in to Sojourn", &form)).into_response()
}

/// The state needed to perform a log-in.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// How long the auth cookie lasts without "stay logged in".
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Prague".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl LogInState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(
        cookie_secret: &str,
        local_timezone: &str,
        db_connection: Arc<Mutex<Connection>>,
    ) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            local_timezone: local_timezone.to_owned(),
            db_connection,
        }
    }
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The sole user record, or `None` before registration.
fn fetch_sole_user(db_connection: &Mutex<Connection>) -> Result<Option<User>, Error> {
    let connection = db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    match get_user_by_id(UserId::new(1), &connection) {
        Ok(user) => Ok(Some(user)),
        Err(Error::NotFound) => Ok(None),
        Err(error) => Err(error),
    }
}

/// Handler for log-in requests via the POST method.
///
/// On success the auth cookie is set and the client is redirected to the
/// dashboard, or to the validated `redirect_url` the form carried. On failure
/// the form is re-rendered with an error message explaining the problem.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(form): Form<LogInForm>,
) -> Response {
    let redirect_url = parse_redirect_url(form.redirect_url.as_deref(), "log-in form");
    let redirect_url = redirect_url.as_deref();

    let user = match fetch_sole_user(&state.db_connection) {
        Ok(Some(user)) => user,
        Ok(None) => return retry_form(NO_USER_MESSAGE, redirect_url),
        Err(error) => {
            tracing::error!("Could not load the user record: {error}");
            return retry_form(INTERNAL_ERROR_MESSAGE, redirect_url);
        }
    };

    match user.password_hash.verify(&form.password) {
        Ok(true) => {}
        Ok(false) => return retry_form(WRONG_PASSWORD_MESSAGE, redirect_url),
        Err(error) => {
            tracing::error!("Could not verify the password: {error}");
            return retry_form(INTERNAL_ERROR_MESSAGE, redirect_url);
        }
    }

    let offset = match local_offset(&state.local_timezone) {
        Ok(offset) => offset,
        Err(error) => return error.into_response(),
    };

    let cookie_duration = if form.remember_me.is_some() {
        STAY_LOGGED_IN_COOKIE_DURATION
    } else {
        state.cookie_duration
    };
    let destination = redirect_url.unwrap_or(endpoints::DASHBOARD_VIEW);

    match set_auth_cookie(jar.clone(), user.id, cookie_duration, offset) {
        Ok(updated_jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(destination.to_owned()),
            updated_jar,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("Error setting auth cookie: {error}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                HxRedirect(endpoints::INTERNAL_ERROR_VIEW.to_owned()),
                invalidate_auth_cookie(jar),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// The raw data entered by the user in the log-in form.
///
/// The password stays a plain string here, it is only ever compared against
/// the stored hash.
#[derive(Deserialize)]
pub struct LogInForm {
    pub password: String,

    /// Comes from a checkbox, so it is either some string value (ticked) or
    /// absent (not ticked). The string content itself carries no meaning.
    pub remember_me: Option<String>,

    /// Optional URL to redirect to after logging in.
    pub redirect_url: Option<String>,
}

#[cfg(test)]
mod log_in_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Form,
        extract::{Query, State},
        http::StatusCode,
    };
    use axum_extra::extract::PrivateCookieJar;
    use rusqlite::Connection;
    use scraper::Selector;

    use crate::{
        auth::user::create_user_table,
        endpoints,
        test_utils::{
            assert_content_type, assert_form_error_message, assert_form_input,
            assert_form_optional_input_with_value, assert_form_submit_button, assert_hx_endpoint,
            assert_status_ok, assert_valid_html, must_get_form, parse_html_document,
            parse_html_fragment,
        },
    };

    use super::{LogInForm, LogInState, NO_USER_MESSAGE, RedirectQuery, get_log_in_page, post_log_in};

    fn empty_state() -> LogInState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_user_table(&connection).expect("Could not create user table");

        LogInState::new("foobar", "Etc/UTC", Arc::new(Mutex::new(connection)))
    }

    #[tokio::test]
    async fn renders_password_form() {
        let response = get_log_in_page(Query(RedirectQuery { redirect_url: None })).await;

        assert_status_ok(&response);
        assert_content_type(&response, "text/html; charset=utf-8");

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::LOG_IN_API, "hx-post");
        assert_form_input(&form, "password", "password");
        assert_form_submit_button(&form);
    }

    #[tokio::test]
    async fn links_to_password_reset_and_registration() {
        let response = get_log_in_page(Query(RedirectQuery { redirect_url: None })).await;

        let document = parse_html_document(response).await;
        let form = must_get_form(&document);

        let link_targets: Vec<&str> = form
            .select(&Selector::parse("a[href]").unwrap())
            .filter_map(|link| link.value().attr("href"))
            .collect();

        for endpoint in [endpoints::FORGOT_PASSWORD_VIEW, endpoints::REGISTER_VIEW] {
            assert!(
                link_targets.contains(&endpoint),
                "expected a link to {endpoint}, got {link_targets:?}"
            );
        }
    }

    #[tokio::test]
    async fn keeps_redirect_url_in_hidden_input() {
        let redirect_url = "/recurring?show=inactive";

        let response = get_log_in_page(Query(RedirectQuery {
            redirect_url: Some(redirect_url.to_owned()),
        }))
        .await;

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_form_optional_input_with_value(&form, "redirect_url", "hidden", redirect_url);
    }

    #[tokio::test]
    async fn logging_in_before_registration_points_to_registration() {
        let state = empty_state();
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        let form = LogInForm {
            password: "anything".to_owned(),
            remember_me: None,
            redirect_url: None,
        };

        let response = post_log_in(State(state), jar, Form(form)).await;

        assert_eq!(response.status(), StatusCode::OK);

        let fragment = parse_html_fragment(response).await;
        assert_valid_html(&fragment);
        assert_form_error_message(&must_get_form(&fragment), NO_USER_MESSAGE);
    }
}
