//! Recurring transaction deletion endpoint.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Path, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    recurring::{RecurringTransactionId, delete_recurring_transaction},
};

/// The state needed for deleting a recurring transaction.
#[derive(Debug, Clone)]
pub struct DeleteRecurringTransactionEndpointState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteRecurringTransactionEndpointState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Handle recurring transaction deletion. Transactions already materialized
/// from the series are kept.
pub async fn delete_recurring_transaction_endpoint(
    Path(recurring_transaction_id): Path<RecurringTransactionId>,
    State(state): State<DeleteRecurringTransactionEndpointState>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match delete_recurring_transaction(recurring_transaction_id, &connection) {
        Ok(_) => Alert::SuccessSimple {
            message: "Recurring transaction deleted successfully".to_owned(),
        }
        .into_response(),
        Err(Error::DeleteMissingRecurringTransaction) => {
            Error::DeleteMissingRecurringTransaction.into_alert_response()
        }
        Err(error) => {
            tracing::error!(
                "An unexpected error occurred while deleting recurring transaction \
                {recurring_transaction_id}: {error}"
            );
            error.into_alert_response()
        }
    }
}
