//! Budget creation page and endpoint.

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
use time::Month;

use crate::{
    AppState, Error,
    alert::Alert,
    budget::{Budget, create_budget},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
};

/// The state needed for creating a budget.
#[derive(Debug, Clone)]
pub struct CreateBudgetEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateBudgetEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for creating or updating a budget.
// Must use axum_extra's Form since that parses an empty string as None
// instead of crashing like axum::Form.
#[derive(Debug, Deserialize)]
pub struct BudgetFormData {
    /// The month the budget applies to, formatted as "YYYY-MM" by the month
    /// picker input.
    pub month: String,
    pub max_spending: f64,
    #[serde(default)]
    pub warning_threshold: Option<f64>,
}

/// Parse the "YYYY-MM" value submitted by a month picker input.
pub(super) fn parse_month_field(raw: &str) -> Option<(i32, Month)> {
    let (year, month) = raw.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    let month = Month::try_from(month).ok()?;

    Some((year, month))
}

/// The alert returned when the submitted month cannot be parsed.
pub(super) fn invalid_month_response(raw: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Alert::Error {
            message: "Invalid month".to_owned(),
            details: format!("\"{raw}\" is not a valid month, expected the format YYYY-MM."),
        }
        .into_html(),
    )
        .into_response()
}

/// Render the budget creation page.
pub async fn get_new_budget_page() -> Response {
    new_budget_view().into_response()
}

/// Handle budget creation form submission.
pub async fn create_budget_endpoint(
    State(state): State<CreateBudgetEndpointState>,
    Form(form_data): Form<BudgetFormData>,
) -> Response {
    let Some((year, month)) = parse_month_field(&form_data.month) else {
        return invalid_month_response(&form_data.month);
    };

    let builder = Budget::build(month, year, form_data.max_spending)
        .warning_threshold(form_data.warning_threshold);

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match create_budget(builder, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::BUDGETS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(error @ (Error::NonPositiveAmount(_) | Error::DuplicateBudgetMonth { .. })) => {
            error.into_alert_response()
        }
        Err(error) => {
            tracing::error!("An unexpected error occurred while creating a budget: {error}");

            error.into_alert_response()
        }
    }
}

fn new_budget_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::NEW_BUDGET_VIEW).into_html();

    let form = html! {
        form
            hx-post=(endpoints::POST_BUDGET)
            hx-target-error="#alert-container"
            class="w-full space-y-4 md:space-y-6"
        {
            div
            {
                label for="month" class=(FORM_LABEL_STYLE) { "Month" }

                input
                    id="month"
                    type="month"
                    name="month"
                    required
                    autofocus
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="max_spending" class=(FORM_LABEL_STYLE) { "Maximum Spending" }

                input
                    id="max_spending"
                    type="number"
                    name="max_spending"
                    min="0.01"
                    step="0.01"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="warning_threshold" class=(FORM_LABEL_STYLE)
                {
                    "Warning Threshold % (optional)"
                }

                input
                    id="warning_threshold"
                    type="number"
                    name="warning_threshold"
                    min="1"
                    max="100"
                    step="1"
                    placeholder="80"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Budget" }
        }
    };

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Create Budget", &[], &content)
}

#[cfg(test)]
mod new_budget_page_tests {
    use axum::http::StatusCode;

    use crate::{
        budget::get_new_budget_page,
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button_with_text, assert_hx_endpoint,
            assert_valid_html, must_get_form, parse_html_document,
        },
    };

    #[tokio::test]
    async fn render_page() {
        let response = get_new_budget_page().await;

        assert_eq!(response.status(), StatusCode::OK);

        let html = parse_html_document(response).await;
        assert_valid_html(&html);

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::POST_BUDGET, "hx-post");
        assert_form_input(&form, "month", "month");
        assert_form_input(&form, "max_spending", "number");
        assert_form_submit_button_with_text(&form, "Create Budget");
    }
}
