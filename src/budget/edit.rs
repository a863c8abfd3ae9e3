//! Budget editing page and endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    budget::{
        Budget, BudgetId,
        create::{BudgetFormData, invalid_month_response, parse_month_field},
        get_budget, update_budget,
    },
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
    },
    navigation::NavBar,
};

/// The state needed for the edit budget page.
#[derive(Debug, Clone)]
pub struct EditBudgetPageState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditBudgetPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The state needed for updating a budget.
#[derive(Debug, Clone)]
pub struct UpdateBudgetEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateBudgetEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render the budget editing page.
pub async fn get_edit_budget_page(
    Path(budget_id): Path<BudgetId>,
    State(state): State<EditBudgetPageState>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let budget = match get_budget(budget_id, &connection) {
        Ok(budget) => budget,
        Err(error) => {
            if error != Error::NotFound {
                tracing::error!("Failed to retrieve budget {budget_id}: {error}");
            }
            return Err(error);
        }
    };

    Ok(edit_budget_view(&budget).into_response())
}

/// Handle budget update form submission.
pub async fn update_budget_endpoint(
    Path(budget_id): Path<BudgetId>,
    State(state): State<UpdateBudgetEndpointState>,
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

    match update_budget(budget_id, builder, &connection) {
        Ok(_) => (
            HxRedirect(endpoints::BUDGETS_VIEW.to_owned()),
            StatusCode::SEE_OTHER,
        )
            .into_response(),
        Err(
            error @ (Error::NonPositiveAmount(_)
            | Error::DuplicateBudgetMonth { .. }
            | Error::UpdateMissingBudget),
        ) => error.into_alert_response(),
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while updating budget {budget_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}

fn edit_budget_view(budget: &Budget) -> Markup {
    let edit_endpoint = endpoints::format_endpoint(endpoints::EDIT_BUDGET_VIEW, budget.id);
    let update_endpoint = endpoints::format_endpoint(endpoints::PUT_BUDGET, budget.id);
    let nav_bar = NavBar::new(&edit_endpoint).into_html();

    let month_value = format!("{:04}-{:02}", budget.year, u8::from(budget.month));

    let form = html! {
        form
            hx-put=(update_endpoint)
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
                    value=(month_value)
                    required
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
                    value=(budget.max_spending)
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
                    value=[budget.warning_threshold]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Update Budget" }
        }
    };

    let content = html! {
        (nav_bar)
        div class=(FORM_CONTAINER_STYLE) { (form) }
    };

    base("Edit Budget", &[], &content)
}
