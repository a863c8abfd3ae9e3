//! Middleware that gates routes behind the auth cookie and keeps active
//! sessions alive.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use time::{Duration, UtcOffset};

use crate::{
    AppState,
    auth::{
        build_log_in_redirect_url,
        cookie::{extend_auth_cookie_duration_if_needed, get_token_from_cookies},
        redirect::build_log_in_redirect_url_from_target,
    },
    endpoints,
    timezone::local_offset,
};

/// Sessions with less than this much time left are extended on each
/// authenticated request.
const MIN_REMAINING_COOKIE_DURATION: Duration = Duration::minutes(5);

/// The state needed for the auth middleware.
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The local timezone as a canonical timezone name, e.g. "Europe/Prague".
    pub local_timezone: String,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            local_timezone: state.local_timezone.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

/// The log-in page URL to send an unauthenticated client to, carrying the
/// requested page so it can be returned to after logging in.
fn log_in_redirect_target(request: &Request) -> String {
    build_log_in_redirect_url(request).unwrap_or_else(|| {
        tracing::warn!(
            "No usable redirect target for {}. Falling back to the dashboard.",
            request.uri().path()
        );

        build_log_in_redirect_url_from_target(endpoints::DASHBOARD_VIEW)
            .unwrap_or_else(|| endpoints::LOG_IN_VIEW.to_owned())
    })
}

/// Re-issue the auth cookie on the way out so an active session does not
/// expire mid-use.
fn attach_refreshed_cookie(
    response: Response,
    jar: PrivateCookieJar,
    offset: UtcOffset,
) -> Response {
    let jar =
        match extend_auth_cookie_duration_if_needed(jar.clone(), MIN_REMAINING_COOKIE_DURATION, offset) {
            Ok(updated_jar) => updated_jar,
            Err(error) => {
                tracing::error!(
                    "Error extending cookie duration: {error:?}. Keeping the previous cookie."
                );
                jar
            }
        };

    let (mut parts, body) = response.into_parts();

    for (name, value) in jar.into_response().headers() {
        if name == SET_COOKIE {
            parts.headers.append(name, value.to_owned());
        }
    }

    Response::from_parts(parts, body)
}

/// Let the request through when it carries a valid auth cookie, otherwise
/// answer with the redirect built by `redirect`.
///
/// The user ID from the token is inserted as a request extension, so handlers
/// behind the guard can take `Extension(user_id): Extension<UserId>`.
async fn guard_request(
    state: AuthState,
    request: Request,
    next: Next,
    redirect: impl Fn(&str) -> Response,
) -> Response {
    let redirect_url = log_in_redirect_target(&request);

    let offset = match local_offset(&state.local_timezone) {
        Ok(offset) => offset,
        Err(error) => {
            tracing::error!("Could not resolve the local timezone: {error}");
            return redirect(&redirect_url);
        }
    };

    let (mut parts, body) = request.into_parts();

    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(error) => {
            tracing::error!("Error getting cookie jar: {error:?}");
            return redirect(&redirect_url);
        }
    };

    let user_id = match get_token_from_cookies(&jar) {
        Ok(token) => token.user_id,
        Err(_) => return redirect(&redirect_url),
    };
    parts.extensions.insert(user_id);

    let response = next.run(Request::from_parts(parts, body)).await;

    attach_refreshed_cookie(response, jar, offset)
}

/// Auth middleware for full-page routes. Unauthenticated clients get an HTTP
/// redirect to the log-in page.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    guard_request(state, request, next, |redirect_url| {
        Redirect::to(redirect_url).into_response()
    })
    .await
}

/// Auth middleware for htmx endpoints. Unauthenticated clients get an
/// HX-Redirect header, since htmx ignores HTTP redirects on partial requests.
pub async fn auth_guard_hx(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Response {
    guard_request(state, request, next, |redirect_url| {
        (HxRedirect(redirect_url.to_owned()), StatusCode::OK).into_response()
    })
    .await
}
