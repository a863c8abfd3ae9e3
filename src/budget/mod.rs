//! Monthly budgets: a spending cap per calendar month, tracked against the
//! month's expenses in the preferred currency.

pub(crate) mod core;
mod create;
mod delete_endpoint;
mod edit;
mod list;

pub use core::{
    Budget, BudgetBuilder, BudgetId, create_budget, create_budget_table, delete_budget,
    get_all_budgets, get_budget, get_budget_for_month, update_budget,
};
pub use create::{create_budget_endpoint, get_new_budget_page};
pub use delete_endpoint::delete_budget_endpoint;
pub use edit::{get_edit_budget_page, update_budget_endpoint};
pub use list::get_budgets_page;
