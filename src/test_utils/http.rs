//! Assertions on raw response metadata shared by the handler tests.

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::Response,
};

/// Fail the test unless the response status is 200 OK.
#[track_caller]
pub(crate) fn assert_status_ok(response: &Response<Body>) {
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "expected 200 OK, got {}",
        response.status()
    );
}

/// Fail the test unless the content-type header equals `content_type`.
#[track_caller]
pub(crate) fn assert_content_type(response: &Response<Body>, content_type: &str) {
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .expect("response has no content-type header"),
        content_type
    );
}

/// The value of the named header, as a string. Fails the test if the header
/// is absent or not valid UTF-8.
#[track_caller]
pub(crate) fn get_header(response: &Response<Body>, header_name: &str) -> String {
    let value = response
        .headers()
        .get(header_name)
        .unwrap_or_else(|| panic!("response has no {header_name} header"));

    value
        .to_str()
        .unwrap_or_else(|error| panic!("{header_name} header is not valid UTF-8: {error}"))
        .to_owned()
}

/// Fail the test unless the response carries an HX-Redirect to `endpoint`.
#[track_caller]
pub(crate) fn assert_hx_redirect(response: &Response<Body>, endpoint: &str) {
    assert_eq!(get_header(response, "hx-redirect"), endpoint);
}
