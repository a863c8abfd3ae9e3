//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    alert::Alert, category::CategoryId, internal_server_error::InternalServerError,
    not_found::NotFoundError, trip::TripId,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid password.
    #[error("invalid password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// There was an error parsing or formatting the date-time stored in the
    /// auth token.
    ///
    /// Callers should pass in the original error as a string and the date
    /// string that caused the error.
    #[error("could not format token expiry date-time string \"{1}\": {0}")]
    InvalidDateFormat(String, String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The category ID used to create a transaction did not match a valid
    /// category.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// The trip ID used to create a transaction did not match a valid trip.
    #[error("the trip ID does not refer to a valid trip")]
    InvalidTrip(Option<TripId>),

    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// A string that is not a three letter ISO 4217 code was used to create a
    /// currency code.
    #[error("\"{0}\" is not a valid three letter currency code")]
    InvalidCurrencyCode(String),

    /// A string that does not name a recurrence pattern was submitted.
    ///
    /// Unknown patterns are rejected instead of defaulting to daily, since a
    /// silently substituted schedule would create transactions the user never
    /// asked for.
    #[error("\"{0}\" is not a valid recurrence pattern")]
    InvalidRecurrencePattern(String),

    /// A string that is neither "expense" nor "income" was submitted as a
    /// transaction kind.
    #[error("\"{0}\" is not a valid transaction kind")]
    InvalidTransactionKind(String),

    /// An amount that is zero or negative was submitted.
    ///
    /// Transactions store their sign in the expense/income kind, so amounts
    /// must be strictly positive.
    #[error("{0} is not a valid amount, amounts must be greater than zero")]
    NonPositiveAmount(f64),

    /// A trip was submitted whose end date precedes its start date.
    #[error("the trip end date {1} is before its start date {0}")]
    TripEndsBeforeStart(time::Date, time::Date),

    /// No exchange rate is stored for a currency pair that a conversion
    /// needs, neither directly, inverted, nor via EUR.
    #[error("no exchange rate is stored for {base}/{quote}")]
    MissingExchangeRate {
        /// The currency converted from.
        base: String,
        /// The currency converted to.
        quote: String,
    },

    /// A budget already exists for the given month.
    #[error("a budget already exists for {month} {year}")]
    DuplicateBudgetMonth {
        /// Month of the existing budget.
        month: time::Month,
        /// Year of the existing budget.
        year: i32,
    },

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Tried to delete a transaction that does not exist
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// Tried to update a transaction that does not exist
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a recurring transaction that does not exist
    #[error("tried to delete a recurring transaction that is not in the database")]
    DeleteMissingRecurringTransaction,

    /// Tried to update a recurring transaction that does not exist
    #[error("tried to update a recurring transaction that is not in the database")]
    UpdateMissingRecurringTransaction,

    /// Tried to update a category that does not exist
    #[error("tried to update a category that is not in the database")]
    UpdateMissingCategory,

    /// Tried to delete a category that does not exist
    #[error("tried to delete a category that is not in the database")]
    DeleteMissingCategory,

    /// Tried to update a budget that does not exist
    #[error("tried to update a budget that is not in the database")]
    UpdateMissingBudget,

    /// Tried to delete a budget that does not exist
    #[error("tried to delete a budget that is not in the database")]
    DeleteMissingBudget,

    /// Tried to update a trip that does not exist
    #[error("tried to update a trip that is not in the database")]
    UpdateMissingTrip,

    /// Tried to delete a trip that does not exist
    #[error("tried to delete a trip that is not in the database")]
    DeleteMissingTrip,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self) -> Response {
        let (status_code, alert) = match self {
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Invalid Timezone Settings".to_owned(),
                    details: format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                    ),
                },
            ),
            Error::NonPositiveAmount(amount) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid amount".to_owned(),
                    details: format!(
                        "{amount} is not a valid amount. Enter an amount greater than zero."
                    ),
                },
            ),
            Error::InvalidCurrencyCode(code) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid currency code".to_owned(),
                    details: format!(
                        "\"{code}\" is not a three letter ISO 4217 currency code such as EUR or NZD."
                    ),
                },
            ),
            Error::InvalidRecurrencePattern(pattern) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid recurrence pattern".to_owned(),
                    details: format!(
                        "\"{pattern}\" is not a recognized recurrence pattern. \
                        Choose one of daily, weekly, monthly or yearly."
                    ),
                },
            ),
            Error::InvalidTransactionKind(kind) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid transaction kind".to_owned(),
                    details: format!(
                        "\"{kind}\" is not a transaction kind. \
                        Choose either expense or income."
                    ),
                },
            ),
            Error::InvalidCategory(category_id) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid category ID".to_owned(),
                    details: format!("Could not find a category with the ID {category_id:?}"),
                },
            ),
            Error::InvalidTrip(trip_id) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid trip ID".to_owned(),
                    details: format!("Could not find a trip with the ID {trip_id:?}"),
                },
            ),
            Error::TripEndsBeforeStart(start, end) => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Invalid trip dates".to_owned(),
                    details: format!(
                        "The trip ends on {end} but starts on {start}. \
                        The end date must not be before the start date."
                    ),
                },
            ),
            Error::MissingExchangeRate { base, quote } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Alert::Error {
                    message: "Missing exchange rate".to_owned(),
                    details: format!(
                        "No exchange rate is stored for {base}/{quote}. \
                        Add a rate for this pair (or rates via EUR) on the exchange rates page."
                    ),
                },
            ),
            Error::DuplicateBudgetMonth { month, year } => (
                StatusCode::BAD_REQUEST,
                Alert::Error {
                    message: "Duplicate budget".to_owned(),
                    details: format!(
                        "A budget already exists for {month} {year}. \
                        Edit or delete the existing budget instead."
                    ),
                },
            ),
            Error::UpdateMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update transaction".to_owned(),
                    details: "The transaction could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingTransaction => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete transaction".to_owned(),
                    details: "The transaction could not be found. \
                    Try refreshing the page to see if the transaction has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingRecurringTransaction => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update recurring transaction".to_owned(),
                    details: "The recurring transaction could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingRecurringTransaction => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete recurring transaction".to_owned(),
                    details: "The recurring transaction could not be found. \
                    Try refreshing the page to see if it has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingCategory => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update category".to_owned(),
                    details: "The category could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingCategory => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete category".to_owned(),
                    details: "The category could not be found. \
                    Try refreshing the page to see if the category has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingBudget => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update budget".to_owned(),
                    details: "The budget could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingBudget => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete budget".to_owned(),
                    details: "The budget could not be found. \
                    Try refreshing the page to see if the budget has already been deleted."
                        .to_owned(),
                },
            ),
            Error::UpdateMissingTrip => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not update trip".to_owned(),
                    details: "The trip could not be found.".to_owned(),
                },
            ),
            Error::DeleteMissingTrip => (
                StatusCode::NOT_FOUND,
                Alert::Error {
                    message: "Could not delete trip".to_owned(),
                    details: "The trip could not be found. \
                    Try refreshing the page to see if the trip has already been deleted."
                        .to_owned(),
                },
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::Error {
                    message: "Something went wrong".to_owned(),
                    details:
                        "An unexpected error occurred, check the server logs for more details."
                            .to_owned(),
                },
            ),
        };

        (status_code, alert.into_html()).into_response()
    }
}
