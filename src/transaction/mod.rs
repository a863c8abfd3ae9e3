//! Transactions: money events, the pages for managing them and the create
//! flow that handles recurring series and their catch-up confirmation.

pub(crate) mod core;
mod create_endpoint;
mod create_page;
mod delete_endpoint;
mod edit;
mod transactions_page;

pub use core::{
    Transaction, TransactionBuilder, TransactionId, TransactionKind, count_transactions,
    create_transaction, create_transaction_table, delete_transaction, get_transaction,
    get_transactions_for_trip, get_transactions_in_range, update_transaction,
};
pub use create_endpoint::create_transaction_endpoint;
pub use create_page::get_new_transaction_page;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit::{get_edit_transaction_page, update_transaction_endpoint};
pub use transactions_page::get_transactions_page;
pub(crate) use transactions_page::month_bounds;
