//! Alert partials for displaying success and error messages to users.
//!
//! Alerts are rendered as HTML fragments that htmx swaps into the
//! `#alert-container` element of the base layout.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

/// An alert message that can be rendered into the alert container.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success message with extra details.
    Success {
        /// The headline of the alert.
        message: String,
        /// Supporting detail shown under the headline.
        details: String,
    },
    /// A success message with no details.
    SuccessSimple {
        /// The headline of the alert.
        message: String,
    },
    /// An error message with extra details.
    Error {
        /// The headline of the alert.
        message: String,
        /// Supporting detail shown under the headline.
        details: String,
    },
    /// An error message with no details.
    ErrorSimple {
        /// The headline of the alert.
        message: String,
    },
}

impl Alert {
    /// Render the alert as an HTML fragment.
    pub fn into_html(self) -> Markup {
        let (message, details, container_style, text_style) = match self {
            Alert::Success { message, details } => (message, details, SUCCESS_STYLE, SUCCESS_TEXT),
            Alert::SuccessSimple { message } => (message, String::new(), SUCCESS_STYLE, SUCCESS_TEXT),
            Alert::Error { message, details } => (message, details, ERROR_STYLE, ERROR_TEXT),
            Alert::ErrorSimple { message } => (message, String::new(), ERROR_STYLE, ERROR_TEXT),
        };

        html! {
            div class=(container_style) role="alert" {
                div class="flex items-start justify-between gap-4" {
                    div {
                        p class={"font-medium " (text_style)} { (message) }
                        @if !details.is_empty() {
                            p class={"mt-1 text-sm " (text_style)} { (details) }
                        }
                    }
                    button type="button" class={"font-bold " (text_style)}
                        onclick="this.closest('[role=alert]').remove()" {
                        "\u{00d7}"
                    }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}

const SUCCESS_STYLE: &str =
    "mb-4 rounded-lg border border-green-300 bg-green-50 p-4 dark:border-green-800 dark:bg-gray-800";
const SUCCESS_TEXT: &str = "text-green-800 dark:text-green-400";
const ERROR_STYLE: &str =
    "mb-4 rounded-lg border border-red-300 bg-red-50 p-4 dark:border-red-800 dark:bg-gray-800";
const ERROR_TEXT: &str = "text-red-800 dark:text-red-400";

#[cfg(test)]
mod alert_tests {
    use super::Alert;

    #[test]
    fn success_alert_renders_message_and_details() {
        let html = Alert::Success {
            message: "Saved".to_owned(),
            details: "The trip was saved.".to_owned(),
        }
        .into_html()
        .into_string();

        assert!(html.contains("Saved"));
        assert!(html.contains("The trip was saved."));
        assert!(html.contains("green"));
    }

    #[test]
    fn error_alert_renders_message() {
        let html = Alert::ErrorSimple {
            message: "Something went wrong".to_owned(),
        }
        .into_html()
        .into_string();

        assert!(html.contains("Something went wrong"));
        assert!(html.contains("red"));
    }
}
