//! Recurring transactions: the schedule patterns, the pure catch-up
//! computation and the screens for managing series.

mod catch_up;
pub(crate) mod core;
mod delete_endpoint;
mod edit;
mod list;
mod pattern;

pub use catch_up::{PendingOccurrences, pending_occurrences};
pub use core::{
    RecurringTransaction, RecurringTransactionBuilder, RecurringTransactionId,
    backfill_recurring_transaction, create_recurring_transaction,
    create_recurring_transaction_table, delete_recurring_transaction,
    get_all_recurring_transactions, get_recurring_transaction, update_recurring_transaction,
};
pub use delete_endpoint::delete_recurring_transaction_endpoint;
pub use edit::{get_edit_recurring_transaction_page, update_recurring_transaction_endpoint};
pub use list::get_recurring_transactions_page;
pub use pattern::RecurrencePattern;
